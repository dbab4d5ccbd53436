// 上传管线
//
// 负责按队列顺序逐个提交文件：
// - 提交前检查登录状态、队列非空以及配额
// - 每次只有一个文件在传输
// - 第一个失败即中止，队列原样保留以便重试或移除
// - 全部成功后清空队列

use parking_lot::Mutex as SyncMutex;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use super::progress::{CommitProgress, CommitState};
use super::queue::UploadQueue;
use super::quota::QuotaState;
use super::tags::{derive_tags, KindInference, MimeKindInference};
use super::types::{CommitError, CommitReport};
use crate::auth::{IdentityProvider, UserIdentity};
use crate::collector::IncomingItem;
use crate::common::format_bytes;
use crate::config::UploadConfig;
use crate::storage::{PersistedRecord, StorageBackend, StorageError};

/// 提交被取消时记录的失败原因
pub const COMMIT_CANCELLED: &str = "提交已取消";

/// 提交 future 被中途丢弃时恢复状态
struct CancelGuard<'a> {
    pipeline: &'a UploadPipeline,
    queue: &'a Mutex<UploadQueue>,
    armed: bool,
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pipeline.mark_cancelled(self.queue);
        }
    }
}

/// 上传管线
pub struct UploadPipeline {
    /// 存储后端
    storage: Arc<dyn StorageBackend>,
    /// 类别推断
    kinds: Arc<dyn KindInference>,
    /// 配额上限（字节）
    ceiling: u64,
    /// 状态机
    state: SyncMutex<CommitState>,
    /// 进度广播
    progress: watch::Sender<CommitProgress>,
}

impl UploadPipeline {
    pub fn new(storage: Arc<dyn StorageBackend>, ceiling: u64) -> Self {
        let (progress, _) = watch::channel(CommitProgress::default());
        Self {
            storage,
            kinds: Arc::new(MimeKindInference),
            ceiling,
            state: SyncMutex::new(CommitState::Idle),
            progress,
        }
    }

    /// 从上传配置创建
    pub fn from_config(storage: Arc<dyn StorageBackend>, config: &UploadConfig) -> Self {
        Self::new(storage, config.quota_ceiling_bytes)
    }

    /// 替换类别推断
    pub fn with_kind_inference(mut self, kinds: Arc<dyn KindInference>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    pub fn state(&self) -> CommitState {
        self.state.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().is_running()
    }

    /// 当前进度快照
    pub fn progress(&self) -> CommitProgress {
        self.progress.borrow().clone()
    }

    /// 订阅进度变化
    pub fn subscribe(&self) -> watch::Receiver<CommitProgress> {
        self.progress.subscribe()
    }

    /// 配额检查
    pub fn quota(&self, current_usage: u64, queue_size: u64) -> QuotaState {
        QuotaState::evaluate(current_usage, queue_size, self.ceiling)
    }

    /// 回到空闲状态并清零进度
    ///
    /// 提交进行中时返回 false 且不做任何修改
    pub fn reset(&self) -> bool {
        let mut state = self.state.lock();
        if state.is_running() {
            return false;
        }
        *state = CommitState::Idle;
        self.progress.send_replace(CommitProgress::default());
        true
    }

    /// 解除已取消提交遗留的冻结
    ///
    /// 持有队列锁时冻结意味着正在提交；取消时若队列锁被占用，
    /// 冻结标记会留到下一次加锁时在这里清除
    pub(crate) fn release_stale_freeze(&self, queue: &mut UploadQueue) {
        if queue.is_frozen() && !self.is_running() {
            debug!("解除已取消提交遗留的队列冻结");
            queue.unfreeze();
        }
    }

    /// 提交队列
    ///
    /// 拒绝（未登录、队列为空、超出配额、已在提交）不会修改任何状态，
    /// 也不会调用存储后端。future 在中途被丢弃时提交记为失败，
    /// 队列保留并解除冻结
    pub async fn commit(
        &self,
        queue: &Mutex<UploadQueue>,
        identity: &dyn IdentityProvider,
        current_usage: u64,
    ) -> Result<CommitReport, CommitError> {
        let owner = identity.current_user().ok_or(CommitError::Unauthenticated)?;

        let items = {
            let mut queue = queue.lock().await;
            self.release_stale_freeze(&mut queue);
            if queue.is_empty() {
                return Err(CommitError::EmptyQueue);
            }

            let quota = self.quota(current_usage, queue.aggregate_size());
            if quota.exceeds {
                warn!(
                    "配额不足，拒绝提交: 已用 {} + 待上传 {} > 上限 {}",
                    format_bytes(quota.current_usage),
                    format_bytes(quota.queue_size),
                    format_bytes(quota.ceiling)
                );
                return Err(CommitError::QuotaExceeded(quota));
            }

            {
                let mut state = self.state.lock();
                if state.is_running() {
                    return Err(CommitError::AlreadyRunning);
                }
                *state = CommitState::Running;
            }

            queue.freeze();
            queue.items().to_vec()
        };
        let mut guard = CancelGuard {
            pipeline: self,
            queue,
            armed: true,
        };

        let total = items.len();
        self.progress.send_replace(CommitProgress::started(total));
        info!(
            "开始提交: {} 个文件, 总大小 {}, 用户 {}",
            total,
            format_bytes(items.iter().map(IncomingItem::size).sum()),
            owner.id
        );

        let result = self.persist_all(&owner, &items).await;

        let mut queue = queue.lock().await;
        guard.armed = false;
        queue.unfreeze();

        match result {
            Ok(records) => {
                queue.clear();
                *self.state.lock() = CommitState::Succeeded;
                info!("提交完成: {} 个文件", total);
                Ok(CommitReport {
                    records,
                    completed_count: total,
                    total,
                })
            }
            Err((index, source)) => {
                let name = items[index].display_name().to_string();
                let message = source.to_string();
                error!("提交中止于第 {} 项 ({}): {}", index, name, message);

                *self.state.lock() = CommitState::Failed {
                    index,
                    message: message.clone(),
                };
                self.progress
                    .send_modify(|progress| progress.failed = Some(message));

                Err(CommitError::Storage {
                    index,
                    name,
                    source,
                })
            }
        }
    }

    fn mark_cancelled(&self, queue: &Mutex<UploadQueue>) {
        let index = self.progress.borrow().completed_count;
        warn!("提交在第 {} 项被取消，队列保留", index);

        *self.state.lock() = CommitState::Failed {
            index,
            message: COMMIT_CANCELLED.to_string(),
        };
        self.progress
            .send_modify(|progress| progress.failed = Some(COMMIT_CANCELLED.to_string()));

        match queue.try_lock() {
            Ok(mut queue) => queue.unfreeze(),
            Err(_) => debug!("队列锁被占用，冻结将在下次加锁时解除"),
        }
    }

    /// 逐个持久化，返回第一个失败的下标和原因
    async fn persist_all(
        &self,
        owner: &UserIdentity,
        items: &[IncomingItem],
    ) -> Result<Vec<PersistedRecord>, (usize, StorageError)> {
        let mut records = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let tags = derive_tags(self.kinds.as_ref(), &item.blob);
            let named = item.blob.renamed(item.display_name());
            debug!(
                "[{}/{}] 上传 {} ({}), 标签 {:?}",
                index + 1,
                items.len(),
                named.name,
                format_bytes(named.size),
                tags
            );

            let record = self
                .storage
                .persist(named, &owner.id, &tags)
                .await
                .map_err(|e| (index, e))?;
            records.push(record);
            self.progress
                .send_modify(|progress| progress.completed_count += 1);
        }

        Ok(records)
    }
}
