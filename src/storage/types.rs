// 存储模块数据类型定义

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 单个文件超过存储端上限（与界面侧配额无关）
    #[error("文件过大: {size} 字节，上限 {limit} 字节")]
    TooLarge { size: u64, limit: u64 },
    /// 存储容量耗尽
    #[error("存储空间已满")]
    CapacityExhausted,
    /// 记录不存在
    #[error("记录不存在: {0}")]
    NotFound(String),
    /// 传输失败
    #[error("传输失败: {0}")]
    Transport(String),
    /// 读取内容失败
    #[error("读取文件内容失败: {0}")]
    Io(#[from] std::io::Error),
}

/// 已持久化的文件记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    /// 记录ID
    pub id: String,
    /// 文件名（路径最后一段）
    pub name: String,
    /// 文件大小
    pub size: u64,
    /// 标签
    pub tags: Vec<String>,
    /// 文件类别
    pub kind: String,
    /// 完整相对路径
    pub path: String,
    /// 所属用户ID
    pub owner_id: String,
    /// 创建时间 (Unix timestamp)
    pub created_at: i64,
}
