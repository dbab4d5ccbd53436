// 上传模块数据类型定义

use thiserror::Error;

use super::quota::QuotaState;
use crate::storage::{PersistedRecord, StorageError};

/// 提交错误
///
/// 除 Storage 外的错误都在提交开始前产生，不改变任何状态
#[derive(Debug, Error)]
pub enum CommitError {
    /// 队列为空
    #[error("上传队列为空")]
    EmptyQueue,
    /// 未登录
    #[error("用户未登录")]
    Unauthenticated,
    /// 超出配额
    #[error(
        "存储空间不足: 已用 {} + 待上传 {} 超过上限 {}",
        .0.current_usage,
        .0.queue_size,
        .0.ceiling
    )]
    QuotaExceeded(QuotaState),
    /// 已有提交在进行
    #[error("已有上传正在进行")]
    AlreadyRunning,
    /// 存储失败，index 之前的条目已持久化
    #[error("上传失败 (第 {index} 项, {name}): {source}")]
    Storage {
        index: usize,
        name: String,
        #[source]
        source: StorageError,
    },
}

impl CommitError {
    /// 是否为提交前的拒绝
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Storage { .. })
    }

    /// 失败条目的下标
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            Self::Storage { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// 成功提交的结果
#[derive(Debug, Clone)]
pub struct CommitReport {
    /// 按队列顺序的持久化记录
    pub records: Vec<PersistedRecord>,
    /// 已完成数量
    pub completed_count: usize,
    /// 总数
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CommitError::QuotaExceeded(QuotaState::evaluate(90, 11, 100));
        assert_eq!(err.to_string(), "存储空间不足: 已用 90 + 待上传 11 超过上限 100");
        assert!(err.is_rejection());

        let err = CommitError::Storage {
            index: 1,
            name: "root/b.txt".to_string(),
            source: StorageError::CapacityExhausted,
        };
        assert_eq!(err.to_string(), "上传失败 (第 1 项, root/b.txt): 存储空间已满");
        assert_eq!(err.failed_index(), Some(1));
        assert!(!err.is_rejection());
    }
}
