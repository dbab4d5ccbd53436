// 上传模块
//
// - 有序上传队列（追加 / 按下标移除 / 实时总大小）
// - 配额检查
// - 标签与类别推断
// - 逐个提交的上传管线及其状态机、进度

mod pipeline;
mod progress;
mod queue;
mod quota;
mod tags;
mod types;

pub use pipeline::{UploadPipeline, COMMIT_CANCELLED};
pub use progress::{CommitProgress, CommitState, ItemPhase};
pub use queue::UploadQueue;
pub use quota::{QuotaState, DEFAULT_QUOTA_CEILING};
pub use tags::{derive_tags, file_extension, KindInference, MimeKindInference, DEFAULT_KIND};
pub use types::{CommitError, CommitReport};
