// 存储协作方
//
// 上传管线只依赖单文件持久化接口；列表与删除供外部使用

mod memory;
mod types;

use async_trait::async_trait;

use crate::collector::Blob;

pub use memory::MemoryStorage;
pub use types::*;

/// 存储后端
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// 持久化单个文件，`blob.name` 为带相对路径的名称
    async fn persist(
        &self,
        blob: Blob,
        owner_id: &str,
        tags: &[String],
    ) -> Result<PersistedRecord, StorageError>;

    /// 列出用户的全部记录
    async fn list(&self, owner_id: &str) -> Result<Vec<PersistedRecord>, StorageError>;

    /// 删除记录
    async fn remove(&self, record_id: &str, owner_id: &str) -> Result<(), StorageError>;
}
