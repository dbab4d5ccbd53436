// Drop Upload
// 拖放收集与配额受限的逐个上传核心库

// 身份模块
pub mod auth;

// 拖放收集模块
pub mod collector;

// 公共工具
pub mod common;

// 配置管理模块
pub mod config;

// 日志系统
pub mod logging;

// 上传会话
pub mod session;

// 存储协作方
pub mod storage;

// 上传模块
pub mod uploader;

// 导出常用类型
pub use auth::{IdentityProvider, StaticIdentity, UserIdentity};
pub use collector::{
    Blob, CollectError, DropEntry, DropPayload, EntryCollector, IncomingItem, LocalEntries,
    PickedFile, ScanOptions,
};
pub use config::{AppConfig, LogConfig, UploadConfig};
pub use session::{SessionError, UploadSession};
pub use storage::{MemoryStorage, PersistedRecord, StorageBackend, StorageError};
pub use uploader::{
    CommitError, CommitProgress, CommitReport, CommitState, ItemPhase, QuotaState,
    UploadPipeline, UploadQueue,
};
