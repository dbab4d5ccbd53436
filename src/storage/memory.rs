//! 内存存储后端
//!
//! 记录与内容都保存在内存中，支持单文件大小上限、总容量上限，
//! 以及按名称注入失败

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use super::types::{PersistedRecord, StorageError};
use super::StorageBackend;
use crate::collector::Blob;
use crate::uploader::DEFAULT_KIND;

struct StoredObject {
    record: PersistedRecord,
    content: Vec<u8>,
}

#[derive(Default)]
struct MemoryInner {
    objects: Vec<StoredObject>,
    used: u64,
    failing_names: HashSet<String>,
}

/// 内存存储
#[derive(Default)]
pub struct MemoryStorage {
    max_item_size: Option<u64>,
    capacity: Option<u64>,
    inner: RwLock<MemoryInner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 单个文件大小上限
    pub fn with_max_item_size(mut self, limit: u64) -> Self {
        self.max_item_size = Some(limit);
        self
    }

    /// 总容量上限
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// 之后对该名称的持久化请求都返回传输失败
    pub fn fail_on(&self, name: impl Into<String>) {
        self.inner.write().failing_names.insert(name.into());
    }

    /// 取消失败注入
    pub fn clear_failures(&self) {
        self.inner.write().failing_names.clear();
    }

    /// 已用空间
    pub fn used_bytes(&self) -> u64 {
        self.inner.read().used
    }

    /// 全部记录数
    pub fn record_count(&self) -> usize {
        self.inner.read().objects.len()
    }

    /// 读取记录内容
    pub fn content(&self, record_id: &str) -> Option<Vec<u8>> {
        self.inner
            .read()
            .objects
            .iter()
            .find(|obj| obj.record.id == record_id)
            .map(|obj| obj.content.clone())
    }

    fn check_capacity(&self, used: u64, size: u64) -> Result<(), StorageError> {
        match self.capacity {
            Some(capacity) if used.saturating_add(size) > capacity => {
                Err(StorageError::CapacityExhausted)
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn persist(
        &self,
        blob: Blob,
        owner_id: &str,
        tags: &[String],
    ) -> Result<PersistedRecord, StorageError> {
        {
            let inner = self.inner.read();
            if inner.failing_names.contains(&blob.name) {
                return Err(StorageError::Transport(format!("连接被重置: {}", blob.name)));
            }
            if let Some(limit) = self.max_item_size {
                if blob.size > limit {
                    return Err(StorageError::TooLarge {
                        size: blob.size,
                        limit,
                    });
                }
            }
            self.check_capacity(inner.used, blob.size)?;
        }

        let content = blob.read_all().await?;
        let size = content.len() as u64;

        let name = blob
            .name
            .rsplit('/')
            .next()
            .unwrap_or(&blob.name)
            .to_string();
        let record = PersistedRecord {
            id: Uuid::new_v4().to_string(),
            name,
            size,
            tags: tags.to_vec(),
            kind: tags
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_KIND.to_string()),
            path: blob.name.clone(),
            owner_id: owner_id.to_string(),
            created_at: chrono::Utc::now().timestamp(),
        };

        let mut inner = self.inner.write();
        // 读取内容期间其他请求可能已占用空间
        self.check_capacity(inner.used, size)?;
        inner.used += size;
        inner.objects.push(StoredObject {
            record: record.clone(),
            content,
        });

        debug!("已保存: {} ({} 字节, owner={})", record.path, size, owner_id);
        Ok(record)
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<PersistedRecord>, StorageError> {
        Ok(self
            .inner
            .read()
            .objects
            .iter()
            .filter(|obj| obj.record.owner_id == owner_id)
            .map(|obj| obj.record.clone())
            .collect())
    }

    async fn remove(&self, record_id: &str, owner_id: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        let position = inner
            .objects
            .iter()
            .position(|obj| obj.record.id == record_id && obj.record.owner_id == owner_id)
            .ok_or_else(|| StorageError::NotFound(record_id.to_string()))?;

        let removed = inner.objects.remove(position);
        inner.used -= removed.record.size;
        Ok(())
    }
}
