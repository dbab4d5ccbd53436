//! 本地文件系统宿主
//!
//! 把本地路径包装成拖放条目：目录通过 `tokio::fs::read_dir` 分批读取，
//! 支持跳过隐藏文件、是否跟随符号链接

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, ReadDir};
use tracing::{debug, warn};

use super::types::{
    Blob, CollectError, DirectoryEntry, DirectoryReader, DropEntry, DropPayload, FileEntry,
    PickedFile,
};
use crate::config::UploadConfig;

/// 本地扫描配置
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// 每批读取的目录条目数
    pub read_batch_size: usize,
    /// 跳过隐藏文件（以.开头的文件和文件夹）
    pub skip_hidden: bool,
    /// 是否跟随符号链接
    pub follow_symlinks: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            read_batch_size: 100,
            skip_hidden: false,
            follow_symlinks: false,
        }
    }
}

impl From<&UploadConfig> for ScanOptions {
    fn from(config: &UploadConfig) -> Self {
        Self {
            read_batch_size: config.read_batch_size,
            skip_hidden: config.skip_hidden,
            follow_symlinks: config.follow_symlinks,
        }
    }
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn local_blob(path: &Path, name: &str) -> Result<Blob, CollectError> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| CollectError::Resolve {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();
    Ok(Blob::from_path(
        name,
        content_type,
        metadata.len(),
        path.to_path_buf(),
    ))
}

/// 本地文件条目
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
}

impl LocalFile {
    pub fn new(path: PathBuf) -> Self {
        let name = entry_name(&path);
        Self { path, name }
    }
}

#[async_trait]
impl FileEntry for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self) -> Result<Blob, CollectError> {
        local_blob(&self.path, &self.name).await
    }
}

/// 本地目录条目
#[derive(Debug, Clone)]
pub struct LocalDir {
    path: PathBuf,
    name: String,
    options: Arc<ScanOptions>,
    /// 祖先目录的规范路径，仅在跟随符号链接时记录
    ancestors: Arc<Vec<PathBuf>>,
}

impl LocalDir {
    pub fn new(path: PathBuf, options: Arc<ScanOptions>) -> Self {
        Self::with_ancestors(path, options, Arc::new(Vec::new()))
    }

    fn with_ancestors(
        path: PathBuf,
        options: Arc<ScanOptions>,
        ancestors: Arc<Vec<PathBuf>>,
    ) -> Self {
        let name = entry_name(&path);
        Self {
            path,
            name,
            options,
            ancestors,
        }
    }
}

#[async_trait]
impl DirectoryEntry for LocalDir {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open_reader(&self) -> Result<Box<dyn DirectoryReader>, CollectError> {
        let read_dir = fs::read_dir(&self.path)
            .await
            .map_err(|e| CollectError::OpenDirectory {
                name: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let lineage = if self.options.follow_symlinks {
            let canonical = fs::canonicalize(&self.path).await.map_err(|e| {
                CollectError::OpenDirectory {
                    name: self.path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            let mut lineage = Vec::with_capacity(self.ancestors.len() + 1);
            lineage.extend(self.ancestors.iter().cloned());
            lineage.push(canonical);
            Arc::new(lineage)
        } else {
            Arc::clone(&self.ancestors)
        };

        Ok(Box::new(LocalDirReader {
            path: self.path.clone(),
            read_dir: Some(read_dir),
            options: Arc::clone(&self.options),
            lineage,
        }))
    }
}

struct LocalDirReader {
    path: PathBuf,
    /// 读完后置为 None
    read_dir: Option<ReadDir>,
    options: Arc<ScanOptions>,
    /// 当前目录及其祖先的规范路径
    lineage: Arc<Vec<PathBuf>>,
}

impl LocalDirReader {
    /// 子目录是否指回当前目录或其祖先
    async fn is_cycle(&self, path: &Path) -> bool {
        if !self.options.follow_symlinks {
            return false;
        }
        match fs::canonicalize(path).await {
            Ok(canonical) => self.lineage.contains(&canonical),
            Err(e) => {
                warn!("解析目录真实路径失败: {}: {}", path.display(), e);
                false
            }
        }
    }
}

#[async_trait]
impl DirectoryReader for LocalDirReader {
    async fn read_batch(&mut self) -> Result<Vec<DropEntry>, CollectError> {
        let batch_size = self.options.read_batch_size.max(1);
        let mut batch = Vec::new();

        while batch.len() < batch_size {
            let Some(read_dir) = self.read_dir.as_mut() else {
                break;
            };
            let entry = read_dir
                .next_entry()
                .await
                .map_err(|e| CollectError::ReadBatch {
                    name: self.path.display().to_string(),
                    reason: e.to_string(),
                })?;
            let Some(entry) = entry else {
                self.read_dir = None;
                break;
            };

            let path = entry.path();
            if self.options.skip_hidden && entry.file_name().to_string_lossy().starts_with('.') {
                debug!("跳过隐藏文件: {}", path.display());
                continue;
            }

            let metadata = if self.options.follow_symlinks {
                fs::metadata(&path).await
            } else {
                fs::symlink_metadata(&path).await
            };
            let metadata = match metadata {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("读取文件元数据失败，跳过: {}: {}", path.display(), e);
                    continue;
                }
            };

            if metadata.is_dir() {
                if self.is_cycle(&path).await {
                    warn!("符号链接指向上级目录，跳过以避免循环: {}", path.display());
                    continue;
                }
                batch.push(DropEntry::directory(LocalDir::with_ancestors(
                    path,
                    Arc::clone(&self.options),
                    Arc::clone(&self.lineage),
                )));
            } else if metadata.is_file() {
                batch.push(DropEntry::file(LocalFile::new(path)));
            } else {
                debug!("跳过非常规文件: {}", path.display());
            }
        }

        Ok(batch)
    }
}

/// 本地路径到载荷的转换
pub struct LocalEntries;

impl LocalEntries {
    /// 以拖放方式包装一组本地路径（目录保留结构）
    ///
    /// 不存在的路径记录警告后跳过
    pub async fn from_paths<I, P>(paths: I, options: ScanOptions) -> DropPayload
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let options = Arc::new(options);
        let mut entries = Vec::new();

        for path in paths {
            let path = path.as_ref();
            match fs::metadata(path).await {
                Ok(metadata) if metadata.is_dir() => entries.push(DropEntry::directory(
                    LocalDir::new(path.to_path_buf(), Arc::clone(&options)),
                )),
                Ok(metadata) if metadata.is_file() => {
                    entries.push(DropEntry::file(LocalFile::new(path.to_path_buf())))
                }
                Ok(_) => debug!("跳过非常规文件: {}", path.display()),
                Err(e) => warn!("跳过不存在的路径: {}: {}", path.display(), e),
            }
        }

        DropPayload::Entries(entries)
    }

    /// 以文件选择器方式包装本地文件（可附带相对路径提示）
    pub async fn picked<I>(files: I) -> DropPayload
    where
        I: IntoIterator<Item = (PathBuf, Option<String>)>,
    {
        let mut picked = Vec::new();

        for (path, hint) in files {
            let name = entry_name(&path);
            match local_blob(&path, &name).await {
                Ok(blob) => picked.push(PickedFile {
                    blob,
                    relative_path_hint: hint,
                }),
                Err(e) => warn!("跳过无法读取的文件: {}", e),
            }
        }

        DropPayload::Files(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::EntryCollector;
    use std::fs as std_fs;
    use tempfile::TempDir;

    /// 创建测试目录结构
    fn create_test_folder() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("root");

        // root/
        // ├── a.txt
        // ├── .hidden
        // ├── empty/
        // └── sub/
        //     └── b.txt
        std_fs::create_dir(&root).unwrap();
        std_fs::write(root.join("a.txt"), "aaaa").unwrap();
        std_fs::write(root.join(".hidden"), "h").unwrap();
        std_fs::create_dir(root.join("empty")).unwrap();
        std_fs::create_dir(root.join("sub")).unwrap();
        std_fs::write(root.join("sub/b.txt"), "bb").unwrap();

        temp_dir
    }

    fn sorted_paths(items: &[crate::collector::IncomingItem]) -> Vec<String> {
        let mut paths: Vec<String> = items.iter().map(|i| i.relative_path.clone()).collect();
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn test_local_tree_relative_paths() {
        let temp_dir = create_test_folder();
        let options = ScanOptions {
            read_batch_size: 1,
            ..Default::default()
        };

        let payload = LocalEntries::from_paths([temp_dir.path().join("root")], options).await;
        let items = EntryCollector::new().collect(payload).await;

        assert_eq!(
            sorted_paths(&items),
            vec!["root/.hidden", "root/a.txt", "root/sub/b.txt"]
        );
        let a = items.iter().find(|i| i.relative_path == "root/a.txt").unwrap();
        assert_eq!(a.blob.size, 4);
        assert_eq!(a.blob.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_skip_hidden() {
        let temp_dir = create_test_folder();
        let options = ScanOptions {
            skip_hidden: true,
            ..Default::default()
        };

        let payload = LocalEntries::from_paths([temp_dir.path().join("root")], options).await;
        let items = EntryCollector::new().collect(payload).await;

        assert_eq!(sorted_paths(&items), vec!["root/a.txt", "root/sub/b.txt"]);
    }

    #[tokio::test]
    async fn test_missing_path_is_skipped() {
        let temp_dir = create_test_folder();
        let payload = LocalEntries::from_paths(
            [
                temp_dir.path().join("does-not-exist"),
                temp_dir.path().join("root/a.txt"),
            ],
            ScanOptions::default(),
        )
        .await;

        let items = EntryCollector::new().collect(payload).await;
        assert_eq!(sorted_paths(&items), vec!["a.txt"]);
        assert_eq!(items[0].blob.read_all().await.unwrap(), b"aaaa");
    }

    #[tokio::test]
    async fn test_picked_files_with_hints() {
        let temp_dir = create_test_folder();
        let root = temp_dir.path().join("root");

        let payload = LocalEntries::picked(vec![
            (root.join("sub/b.txt"), Some("root/sub/b.txt".to_string())),
            (root.join("a.txt"), None),
            (root.join("missing.txt"), None),
        ])
        .await;

        let items = EntryCollector::new().collect(payload).await;
        let paths: Vec<&str> = items.iter().map(|i| i.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["root/sub/b.txt", "a.txt"]);
    }

    #[tokio::test]
    async fn test_reader_signals_exhaustion_with_empty_batch() {
        let temp_dir = create_test_folder();
        let dir = LocalDir::new(
            temp_dir.path().join("root/empty"),
            Arc::new(ScanOptions::default()),
        );

        let mut reader = dir.open_reader().await.unwrap();
        assert!(reader.read_batch().await.unwrap().is_empty());
        assert!(reader.read_batch().await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_follow_symlinks_skips_cycles() {
        let temp_dir = create_test_folder();
        let root = temp_dir.path().join("root");
        std::os::unix::fs::symlink(&root, root.join("loop")).unwrap();
        std::os::unix::fs::symlink(root.join("sub"), root.join("sub/up")).unwrap();
        std::os::unix::fs::symlink(root.join("sub"), root.join("alias")).unwrap();

        let options = ScanOptions {
            follow_symlinks: true,
            skip_hidden: true,
            read_batch_size: 2,
        };
        let payload = LocalEntries::from_paths([&root], options).await;
        let items = EntryCollector::new().collect(payload).await;

        // alias 指向同级目录而不是祖先，按普通目录收集
        assert_eq!(
            sorted_paths(&items),
            vec!["root/a.txt", "root/alias/b.txt", "root/sub/b.txt"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_dir_not_followed_by_default() {
        let temp_dir = create_test_folder();
        let root = temp_dir.path().join("root");
        std::os::unix::fs::symlink(&root, root.join("loop")).unwrap();

        let payload = LocalEntries::from_paths([&root], ScanOptions::default()).await;
        let items = EntryCollector::new().collect(payload).await;

        assert_eq!(
            sorted_paths(&items),
            vec!["root/.hidden", "root/a.txt", "root/sub/b.txt"]
        );
    }
}
