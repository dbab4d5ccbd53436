//! 日志系统配置
//!
//! 控制台输出始终开启；启用文件日志时按大小滚动写入，并清理过期日志

use crate::config::LogConfig;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// 日志文件名前缀
const LOG_FILE_PREFIX: &str = "drop-upload.";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// 按大小滚动的日志文件
struct RollingFile {
    log_dir: PathBuf,
    /// 启动时间戳，同一次运行的文件共享
    started_at: String,
    index: u32,
    max_file_size: u64,
    written: u64,
    file: File,
}

impl RollingFile {
    fn open(log_dir: PathBuf, max_file_size: u64) -> io::Result<Self> {
        let started_at = Local::now().format("%Y-%m-%d-%H%M%S").to_string();
        let file = Self::open_index(&log_dir, &started_at, 0)?;
        Ok(Self {
            log_dir,
            started_at,
            index: 0,
            max_file_size,
            written: 0,
            file,
        })
    }

    fn file_path(log_dir: &Path, started_at: &str, index: u32) -> PathBuf {
        if index == 0 {
            log_dir.join(format!("{}{}.log", LOG_FILE_PREFIX, started_at))
        } else {
            log_dir.join(format!("{}{}_{}.log", LOG_FILE_PREFIX, started_at, index))
        }
    }

    fn open_index(log_dir: &Path, started_at: &str, index: u32) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(Self::file_path(log_dir, started_at, index))
    }

    fn write_record(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_file_size {
            self.file.flush()?;
            self.index += 1;
            self.file = Self::open_index(&self.log_dir, &self.started_at, self.index)?;
            self.written = 0;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }
}

/// 可跨线程共享的日志文件写入器
#[derive(Clone)]
pub struct LogFileWriter {
    inner: Arc<Mutex<RollingFile>>,
}

impl LogFileWriter {
    pub fn new(log_dir: PathBuf, max_file_size: u64) -> io::Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(RollingFile::open(log_dir, max_file_size)?)),
        })
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut RollingFile) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "日志文件锁已损坏"))?;
        f(&mut guard)
    }
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write_record(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.file.flush())
    }
}

/// 日志系统守卫
/// 必须保持存活，否则日志写入线程会终止
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// 初始化日志系统
///
/// 环境变量 RUST_LOG 优先于配置中的级别
pub fn init_logging(config: &LogConfig) -> LogGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()));

    let writer = if config.enabled {
        fs::create_dir_all(&config.log_dir)
            .and_then(|_| LogFileWriter::new(config.log_dir.clone(), config.max_file_size))
            .map_err(|e| eprintln!("创建日志文件失败: {:?}: {}，仅输出到控制台", config.log_dir, e))
            .ok()
    } else {
        None
    };

    let Some(writer) = writer else {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init();
        return LogGuard { _file_guard: None };
    };

    let (non_blocking, file_guard) = tracing_appender::non_blocking(writer);
    let file_layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_ansi(false)
        .with_writer(non_blocking);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    info!(
        "日志系统初始化完成: 目录={:?}, 保留天数={}, 级别={}",
        config.log_dir, config.retention_days, config.level
    );
    cleanup_old_logs(&config.log_dir, config.retention_days);

    LogGuard {
        _file_guard: Some(file_guard),
    }
}

/// 清理过期日志文件
fn cleanup_old_logs(log_dir: &Path, retention_days: u32) {
    let today = Local::now().date_naive();
    let retention = chrono::Duration::days(retention_days as i64);

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("读取日志目录失败: {:?}, 错误: {}", log_dir, e);
            return;
        }
    };

    let mut deleted = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(date) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(log_file_date)
        else {
            continue;
        };

        if today.signed_duration_since(date) > retention {
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(e) => tracing::warn!("删除过期日志文件失败: {:?}, 错误: {}", path, e),
            }
        }
    }

    if deleted > 0 {
        info!("已清理 {} 个过期日志文件", deleted);
    }
}

/// 从日志文件名中提取日期
///
/// drop-upload.YYYY-MM-DD-HHMMSS.log / drop-upload.YYYY-MM-DD-HHMMSS_N.log
fn log_file_date(filename: &str) -> Option<chrono::NaiveDate> {
    let stem = filename
        .strip_prefix(LOG_FILE_PREFIX)?
        .strip_suffix(".log")?;
    let date = stem.get(..10)?;
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
