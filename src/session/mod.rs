// 上传会话
//
// 对应一次"选择并上传"的交互过程：
// - 创建时队列为空
// - 收集 / 移除 / 配额查询在提交开始前随时可用
// - 提交进行中禁止新的收集和关闭
// - 关闭时丢弃队列并清零进度

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::auth::IdentityProvider;
use crate::collector::{DropPayload, EntryCollector, IncomingItem, PickedFile};
use crate::config::UploadConfig;
use crate::storage::StorageBackend;
use crate::uploader::{
    CommitError, CommitProgress, CommitReport, CommitState, QuotaState, UploadPipeline,
    UploadQueue,
};

/// 会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 提交进行中，操作被拒绝
    #[error("上传进行中，暂不能{0}")]
    CommitRunning(&'static str),
}

/// 上传会话
///
/// 队列和管线（提交状态、进度）都归会话独占，存储后端可以共享
pub struct UploadSession {
    queue: Mutex<UploadQueue>,
    pipeline: UploadPipeline,
    collector: EntryCollector,
}

impl UploadSession {
    pub fn new(storage: Arc<dyn StorageBackend>, ceiling: u64) -> Self {
        Self::with_pipeline(UploadPipeline::new(storage, ceiling))
    }

    /// 从上传配置创建
    pub fn from_config(storage: Arc<dyn StorageBackend>, config: &UploadConfig) -> Self {
        Self::with_pipeline(UploadPipeline::from_config(storage, config))
    }

    /// 使用自定义管线（如替换类别推断）
    pub fn with_pipeline(pipeline: UploadPipeline) -> Self {
        Self {
            queue: Mutex::new(UploadQueue::new()),
            pipeline,
            collector: EntryCollector::new(),
        }
    }

    pub fn pipeline(&self) -> &UploadPipeline {
        &self.pipeline
    }

    async fn lock_queue(&self) -> MutexGuard<'_, UploadQueue> {
        let mut queue = self.queue.lock().await;
        self.pipeline.release_stale_freeze(&mut queue);
        queue
    }

    /// 收集拖放载荷并追加到队列
    ///
    /// 返回追加的数量
    pub async fn collect(&self, payload: DropPayload) -> Result<usize, SessionError> {
        if self.pipeline.is_running() {
            return Err(SessionError::CommitRunning("添加文件"));
        }

        let items = self.collector.collect(payload).await;

        let mut queue = self.lock_queue().await;
        if queue.is_frozen() {
            warn!("收集期间提交已开始，丢弃 {} 个新文件", items.len());
            return Err(SessionError::CommitRunning("添加文件"));
        }
        Ok(queue.append(items))
    }

    /// 追加文件选择器选中的文件
    pub async fn add_files(&self, files: Vec<PickedFile>) -> Result<usize, SessionError> {
        self.collect(DropPayload::Files(files)).await
    }

    /// 按下标移除，越界或提交进行中时返回 None
    pub async fn remove_at(&self, index: usize) -> Option<IncomingItem> {
        self.lock_queue().await.remove_at(index)
    }

    /// 队列快照
    pub async fn items(&self) -> Vec<IncomingItem> {
        self.queue.lock().await.items().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    pub async fn aggregate_size(&self) -> u64 {
        self.queue.lock().await.aggregate_size()
    }

    /// 按当前队列计算配额
    pub async fn quota(&self, current_usage: u64) -> QuotaState {
        let queue_size = self.aggregate_size().await;
        self.pipeline.quota(current_usage, queue_size)
    }

    /// 提交队列
    pub async fn commit(
        &self,
        identity: &dyn IdentityProvider,
        current_usage: u64,
    ) -> Result<CommitReport, CommitError> {
        self.pipeline
            .commit(&self.queue, identity, current_usage)
            .await
    }

    pub fn state(&self) -> CommitState {
        self.pipeline.state()
    }

    pub fn progress(&self) -> watch::Receiver<CommitProgress> {
        self.pipeline.subscribe()
    }

    /// 关闭会话：丢弃队列并清零进度
    pub async fn close(&self) -> Result<(), SessionError> {
        let mut queue = self.lock_queue().await;
        if queue.is_frozen() || !self.pipeline.reset() {
            return Err(SessionError::CommitRunning("关闭"));
        }
        let discarded = queue.len();
        queue.clear();
        info!("上传会话已关闭，丢弃 {} 个未提交文件", discarded);
        Ok(())
    }
}
