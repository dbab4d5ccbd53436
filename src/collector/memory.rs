//! 内存宿主
//!
//! 以内存树模拟宿主的条目读取接口：目录按固定批次大小分页返回子条目，
//! 可注入文件解析失败、目录打开失败以及批次读取失败

use async_trait::async_trait;
use std::collections::VecDeque;

use super::types::{Blob, CollectError, DirectoryEntry, DirectoryReader, DropEntry, FileEntry};

/// 内存文件
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    content_type: String,
    data: Vec<u8>,
    unreadable: bool,
}

impl MemoryFile {
    /// 创建文件，MIME 类型按扩展名推断
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_raw()
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            content_type,
            data,
            unreadable: false,
        }
    }

    /// 解析时必定失败的文件
    pub fn unreadable(name: impl Into<String>) -> Self {
        Self {
            unreadable: true,
            ..Self::new(name, Vec::new())
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn into_entry(self) -> DropEntry {
        DropEntry::file(self)
    }
}

#[async_trait]
impl FileEntry for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self) -> Result<Blob, CollectError> {
        tokio::task::yield_now().await;
        if self.unreadable {
            return Err(CollectError::Resolve {
                name: self.name.clone(),
                reason: "文件不可读".to_string(),
            });
        }
        Ok(Blob::from_bytes(
            self.name.clone(),
            self.content_type.clone(),
            self.data.clone(),
        ))
    }
}

#[derive(Debug, Clone)]
enum MemoryNode {
    File(MemoryFile),
    Dir(MemoryDir),
}

impl MemoryNode {
    fn into_entry(self) -> DropEntry {
        match self {
            Self::File(file) => file.into_entry(),
            Self::Dir(dir) => dir.into_entry(),
        }
    }
}

/// 内存目录
#[derive(Debug, Clone)]
pub struct MemoryDir {
    name: String,
    children: Vec<MemoryNode>,
    batch_size: usize,
    unreadable: bool,
    fail_after_batches: Option<usize>,
}

impl MemoryDir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            batch_size: 100,
            unreadable: false,
            fail_after_batches: None,
        }
    }

    pub fn file(mut self, file: MemoryFile) -> Self {
        self.children.push(MemoryNode::File(file));
        self
    }

    pub fn dir(mut self, dir: MemoryDir) -> Self {
        self.children.push(MemoryNode::Dir(dir));
        self
    }

    /// 每批返回的最大条目数（最小为 1）
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// 打开读取器时失败
    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    /// 成功返回指定数量的批次后，下一次读取失败
    pub fn fail_after_batches(mut self, batches: usize) -> Self {
        self.fail_after_batches = Some(batches);
        self
    }

    pub fn into_entry(self) -> DropEntry {
        DropEntry::directory(self)
    }
}

#[async_trait]
impl DirectoryEntry for MemoryDir {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open_reader(&self) -> Result<Box<dyn DirectoryReader>, CollectError> {
        if self.unreadable {
            return Err(CollectError::OpenDirectory {
                name: self.name.clone(),
                reason: "权限不足".to_string(),
            });
        }
        Ok(Box::new(MemoryDirReader {
            name: self.name.clone(),
            pending: self.children.iter().cloned().collect(),
            batch_size: self.batch_size,
            served: 0,
            fail_after_batches: self.fail_after_batches,
        }))
    }
}

struct MemoryDirReader {
    name: String,
    pending: VecDeque<MemoryNode>,
    batch_size: usize,
    served: usize,
    fail_after_batches: Option<usize>,
}

#[async_trait]
impl DirectoryReader for MemoryDirReader {
    async fn read_batch(&mut self) -> Result<Vec<DropEntry>, CollectError> {
        // 模拟宿主的异步回调
        tokio::task::yield_now().await;

        if self.fail_after_batches == Some(self.served) {
            return Err(CollectError::ReadBatch {
                name: self.name.clone(),
                reason: "读取中断".to_string(),
            });
        }

        let take = self.batch_size.min(self.pending.len());
        let batch: Vec<DropEntry> = self
            .pending
            .drain(..take)
            .map(MemoryNode::into_entry)
            .collect();
        if !batch.is_empty() {
            self.served += 1;
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reader_pages_until_empty() {
        let dir = MemoryDir::new("d")
            .batch_size(2)
            .file(MemoryFile::new("1", Vec::new()))
            .file(MemoryFile::new("2", Vec::new()))
            .file(MemoryFile::new("3", Vec::new()));

        let mut reader = dir.open_reader().await.unwrap();
        assert_eq!(reader.read_batch().await.unwrap().len(), 2);
        assert_eq!(reader.read_batch().await.unwrap().len(), 1);
        assert!(reader.read_batch().await.unwrap().is_empty());
        assert!(reader.read_batch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_content_type_guessed_from_name() {
        let blob = MemoryFile::new("photo.PNG", vec![0; 4]).resolve().await.unwrap();
        assert_eq!(blob.content_type, "image/png");

        let blob = MemoryFile::new("noext", Vec::new()).resolve().await.unwrap();
        assert_eq!(blob.content_type, "");
    }

    #[tokio::test]
    async fn test_failure_injection() {
        assert!(MemoryFile::unreadable("x").resolve().await.is_err());
        assert!(MemoryDir::new("d").unreadable().open_reader().await.is_err());

        let dir = MemoryDir::new("d")
            .batch_size(1)
            .fail_after_batches(1)
            .file(MemoryFile::new("1", Vec::new()))
            .file(MemoryFile::new("2", Vec::new()));
        let mut reader = dir.open_reader().await.unwrap();
        assert_eq!(reader.read_batch().await.unwrap().len(), 1);
        assert!(matches!(
            reader.read_batch().await,
            Err(CollectError::ReadBatch { .. })
        ));
    }
}
