// 拖放收集模块数据类型定义

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// 收集过程中的错误
///
/// 收集阶段的错误不会中断整体收集：出错的条目被跳过，其余条目继续处理
#[derive(Debug, Error)]
pub enum CollectError {
    /// 文件内容无法解析
    #[error("读取文件失败: {name}: {reason}")]
    Resolve { name: String, reason: String },
    /// 目录无法打开
    #[error("打开目录失败: {name}: {reason}")]
    OpenDirectory { name: String, reason: String },
    /// 目录条目批量读取失败
    #[error("读取目录条目失败: {name}: {reason}")]
    ReadBatch { name: String, reason: String },
    /// 底层 I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 文件内容来源
#[derive(Debug, Clone)]
pub enum BlobSource {
    /// 内存中的数据（共享，克隆开销低）
    Memory(Arc<[u8]>),
    /// 本地文件路径，读取时才打开
    File(PathBuf),
}

/// 二进制内容句柄
#[derive(Debug, Clone)]
pub struct Blob {
    /// 文件名（提交时会被替换为相对路径）
    pub name: String,
    /// 声明的 MIME 类型，未知时为空串
    pub content_type: String,
    /// 大小（字节）
    pub size: u64,
    source: BlobSource,
}

impl Blob {
    /// 从内存数据创建
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        let data: Vec<u8> = data.into();
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size: data.len() as u64,
            source: BlobSource::Memory(Arc::from(data)),
        }
    }

    /// 从本地文件创建（大小由调用方通过元数据提供）
    pub fn from_path(
        name: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
        path: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size,
            source: BlobSource::File(path),
        }
    }

    /// 以新名称包装同一份内容
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn source(&self) -> &BlobSource {
        &self.source
    }

    /// 读取全部内容
    pub async fn read_all(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            BlobSource::Memory(data) => Ok(data.to_vec()),
            BlobSource::File(path) => tokio::fs::read(path).await,
        }
    }
}

/// 待上传条目：内容 + 相对路径
#[derive(Debug, Clone)]
pub struct IncomingItem {
    pub blob: Blob,
    /// 斜杠分隔的相对路径；为空时使用 blob 自身的名称
    pub relative_path: String,
}

impl IncomingItem {
    pub fn new(blob: Blob, relative_path: impl Into<String>) -> Self {
        Self {
            blob,
            relative_path: relative_path.into(),
        }
    }

    /// 提交时使用的名称
    pub fn display_name(&self) -> &str {
        if self.relative_path.is_empty() {
            &self.blob.name
        } else {
            &self.relative_path
        }
    }

    pub fn size(&self) -> u64 {
        self.blob.size
    }
}

/// 宿主提供的文件条目
#[async_trait]
pub trait FileEntry: Send + Sync {
    fn name(&self) -> &str;

    /// 解析文件内容
    async fn resolve(&self) -> Result<Blob, CollectError>;
}

/// 宿主提供的目录条目
#[async_trait]
pub trait DirectoryEntry: Send + Sync {
    fn name(&self) -> &str;

    /// 打开目录读取器
    async fn open_reader(&self) -> Result<Box<dyn DirectoryReader>, CollectError>;
}

/// 目录读取器
///
/// 每次调用返回一批子条目，返回空批次表示已读完。
/// 单个批次不保证包含全部子条目
#[async_trait]
pub trait DirectoryReader: Send {
    async fn read_batch(&mut self) -> Result<Vec<DropEntry>, CollectError>;
}

/// 拖放条目：文件或目录
pub enum DropEntry {
    File(Box<dyn FileEntry>),
    Directory(Box<dyn DirectoryEntry>),
}

impl DropEntry {
    pub fn file(entry: impl FileEntry + 'static) -> Self {
        Self::File(Box::new(entry))
    }

    pub fn directory(entry: impl DirectoryEntry + 'static) -> Self {
        Self::Directory(Box::new(entry))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::File(file) => file.name(),
            Self::Directory(dir) => dir.name(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

impl fmt::Debug for DropEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(file) => f.debug_tuple("File").field(&file.name()).finish(),
            Self::Directory(dir) => f.debug_tuple("Directory").field(&dir.name()).finish(),
        }
    }
}

/// 文件选择器选中的文件（无目录语义）
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub blob: Blob,
    /// 文件夹选择器提供的相对路径，如 "photos/2024/a.jpg"
    pub relative_path_hint: Option<String>,
}

impl PickedFile {
    pub fn new(blob: Blob) -> Self {
        Self {
            blob,
            relative_path_hint: None,
        }
    }

    pub fn with_hint(blob: Blob, hint: impl Into<String>) -> Self {
        Self {
            blob,
            relative_path_hint: Some(hint.into()),
        }
    }

    pub fn into_item(self) -> IncomingItem {
        let relative_path = match self.relative_path_hint {
            Some(hint) if !hint.is_empty() => hint,
            _ => self.blob.name.clone(),
        };
        IncomingItem::new(self.blob, relative_path)
    }
}

/// 一次拖放/选择操作的载荷
#[derive(Debug)]
pub enum DropPayload {
    /// 带文件系统条目能力的拖放
    Entries(Vec<DropEntry>),
    /// 仅平铺文件（多选文件或文件夹选择器）
    Files(Vec<PickedFile>),
}

impl DropPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Entries(entries) => entries.is_empty(),
            Self::Files(files) => files.is_empty(),
        }
    }
}
