// 拖放收集模块
//
// 负责:
// - 抽象宿主的条目读取接口（文件 / 目录 / 分批读取器）
// - 递归展开目录树，保留相对路径结构
// - 提供内存宿主和本地文件系统宿主

pub mod local;
pub mod memory;
mod types;
mod walker;

pub use local::{LocalEntries, ScanOptions};
pub use types::*;
pub use walker::EntryCollector;
