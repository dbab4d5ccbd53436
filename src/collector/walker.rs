//! 拖放载荷遍历
//!
//! 将文件、目录混合的拖放载荷展开为有序的 (内容, 相对路径) 列表：
//! - 深度优先，子条目保持宿主返回的顺序（不排序）
//! - 目录读取会持续请求批次，直到宿主返回空批次
//! - 无法读取的条目记录警告后跳过，不影响其余条目

use async_recursion::async_recursion;
use tracing::{debug, info, warn};

use super::types::{DirectoryEntry, DropEntry, DropPayload, IncomingItem};
use crate::common::format_bytes;

/// 单次遍历的累积状态
#[derive(Debug, Default)]
struct WalkState {
    items: Vec<IncomingItem>,
    skipped: usize,
    directories: usize,
}

/// 拖放条目收集器
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryCollector;

impl EntryCollector {
    pub fn new() -> Self {
        Self
    }

    /// 收集载荷中的全部文件
    ///
    /// 返回前会等待所有文件内容解析完成，不会返回部分结果
    pub async fn collect(&self, payload: DropPayload) -> Vec<IncomingItem> {
        let mut walk = WalkState::default();

        match payload {
            DropPayload::Entries(entries) => {
                for entry in entries {
                    self.walk_entry(entry, "", &mut walk).await;
                }
            }
            DropPayload::Files(files) => {
                walk.items.extend(files.into_iter().map(|file| file.into_item()));
            }
        }

        info!(
            "拖放收集完成: {} 个文件, {} 个目录, 跳过 {} 项, 总大小 {}",
            walk.items.len(),
            walk.directories,
            walk.skipped,
            format_bytes(walk.items.iter().map(IncomingItem::size).sum())
        );

        walk.items
    }

    #[async_recursion]
    async fn walk_entry(&self, entry: DropEntry, prefix: &str, walk: &mut WalkState) {
        match entry {
            DropEntry::File(file) => match file.resolve().await {
                Ok(blob) => {
                    let relative_path = join_path(prefix, file.name());
                    debug!(
                        "收集到文件: {} ({})",
                        relative_path,
                        format_bytes(blob.size)
                    );
                    walk.items.push(IncomingItem::new(blob, relative_path));
                }
                Err(e) => {
                    warn!("跳过无法读取的文件: {}", e);
                    walk.skipped += 1;
                }
            },
            DropEntry::Directory(dir) => {
                let dir_path = join_path(prefix, dir.name());
                walk.directories += 1;

                let children = match self.read_children(dir.as_ref(), &dir_path).await {
                    Some(children) => children,
                    None => {
                        walk.skipped += 1;
                        return;
                    }
                };

                for child in children {
                    self.walk_entry(child, &dir_path, walk).await;
                }
            }
        }
    }

    /// 读取目录的全部子条目
    ///
    /// 读取器在递归前释放。批次读取中途失败时保留已读到的条目
    async fn read_children(
        &self,
        dir: &dyn DirectoryEntry,
        dir_path: &str,
    ) -> Option<Vec<DropEntry>> {
        let mut reader = match dir.open_reader().await {
            Ok(reader) => reader,
            Err(e) => {
                warn!("跳过无法打开的目录: {}", e);
                return None;
            }
        };

        let mut children = Vec::new();
        let mut batches = 0usize;
        loop {
            match reader.read_batch().await {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => {
                    batches += 1;
                    children.extend(batch);
                }
                Err(e) => {
                    warn!(
                        "目录读取中断，保留已读取的 {} 个条目: {}",
                        children.len(),
                        e
                    );
                    break;
                }
            }
        }

        debug!(
            "目录 {} 读取完成: {} 个子条目, {} 个批次",
            dir_path,
            children.len(),
            batches
        );
        Some(children)
    }
}

/// 拼接相对路径，前缀为空时直接返回名称
fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::memory::{MemoryDir, MemoryFile};
    use crate::collector::types::{Blob, PickedFile};

    fn paths(items: &[IncomingItem]) -> Vec<&str> {
        items.iter().map(|item| item.relative_path.as_str()).collect()
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "a.txt"), "a.txt");
        assert_eq!(join_path("root", "a.txt"), "root/a.txt");
        assert_eq!(join_path("root/sub", "b"), "root/sub/b");
    }

    #[tokio::test]
    async fn test_nested_relative_paths() {
        let root = MemoryDir::new("root")
            .file(MemoryFile::new("a.txt", b"a".to_vec()))
            .dir(MemoryDir::new("sub").file(MemoryFile::new("b.txt", b"bb".to_vec())));

        let items = EntryCollector::new()
            .collect(DropPayload::Entries(vec![root.into_entry()]))
            .await;

        assert_eq!(paths(&items), vec!["root/a.txt", "root/sub/b.txt"]);
        assert_eq!(items[1].blob.size, 2);
    }

    #[tokio::test]
    async fn test_empty_directories_yield_nothing() {
        let payload = DropPayload::Entries(vec![
            MemoryDir::new("empty").into_entry(),
            MemoryDir::new("outer")
                .dir(MemoryDir::new("inner"))
                .dir(MemoryDir::new("inner2").dir(MemoryDir::new("deeper")))
                .into_entry(),
        ]);

        let items = EntryCollector::new().collect(payload).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_children_split_across_batches() {
        // 批次为 1, 1, 空
        let root = MemoryDir::new("root")
            .batch_size(1)
            .file(MemoryFile::new("first.txt", b"1".to_vec()))
            .file(MemoryFile::new("second.txt", b"2".to_vec()));

        let items = EntryCollector::new()
            .collect(DropPayload::Entries(vec![root.into_entry()]))
            .await;

        assert_eq!(paths(&items), vec!["root/first.txt", "root/second.txt"]);
    }

    #[tokio::test]
    async fn test_depth_first_discovery_order() {
        let root = MemoryDir::new("r")
            .batch_size(2)
            .dir(
                MemoryDir::new("x")
                    .file(MemoryFile::new("2.txt", Vec::new()))
                    .file(MemoryFile::new("1.txt", Vec::new())),
            )
            .file(MemoryFile::new("z.txt", Vec::new()))
            .file(MemoryFile::new("a.txt", Vec::new()));

        let items = EntryCollector::new()
            .collect(DropPayload::Entries(vec![
                root.into_entry(),
                MemoryFile::new("loose.txt", Vec::new()).into_entry(),
            ]))
            .await;

        // 不排序，保持宿主返回顺序
        assert_eq!(
            paths(&items),
            vec!["r/x/2.txt", "r/x/1.txt", "r/z.txt", "r/a.txt", "loose.txt"]
        );
    }

    #[tokio::test]
    async fn test_deep_tree_is_fully_walked() {
        let mut dir = MemoryDir::new("d63").file(MemoryFile::new("leaf.txt", b"x".to_vec()));
        for depth in (0..63).rev() {
            dir = MemoryDir::new(format!("d{}", depth)).dir(dir);
        }

        let items = EntryCollector::new()
            .collect(DropPayload::Entries(vec![dir.into_entry()]))
            .await;

        assert_eq!(items.len(), 1);
        assert!(items[0].relative_path.starts_with("d0/d1/d2/"));
        assert!(items[0].relative_path.ends_with("/d63/leaf.txt"));
    }

    #[tokio::test]
    async fn test_duplicates_are_preserved() {
        let payload = DropPayload::Entries(vec![
            MemoryFile::new("same.txt", b"1".to_vec()).into_entry(),
            MemoryFile::new("same.txt", b"2".to_vec()).into_entry(),
        ]);

        let items = EntryCollector::new().collect(payload).await;
        assert_eq!(paths(&items), vec!["same.txt", "same.txt"]);
    }

    #[tokio::test]
    async fn test_unreadable_entries_are_skipped() {
        let root = MemoryDir::new("root")
            .file(MemoryFile::unreadable("broken.bin"))
            .dir(MemoryDir::new("locked").unreadable())
            .file(MemoryFile::new("ok.txt", b"ok".to_vec()));

        let items = EntryCollector::new()
            .collect(DropPayload::Entries(vec![root.into_entry()]))
            .await;

        assert_eq!(paths(&items), vec!["root/ok.txt"]);
    }

    #[tokio::test]
    async fn test_batch_failure_keeps_earlier_children() {
        let root = MemoryDir::new("root")
            .batch_size(1)
            .fail_after_batches(1)
            .file(MemoryFile::new("kept.txt", Vec::new()))
            .file(MemoryFile::new("lost.txt", Vec::new()));

        let items = EntryCollector::new()
            .collect(DropPayload::Entries(vec![
                root.into_entry(),
                MemoryFile::new("after.txt", Vec::new()).into_entry(),
            ]))
            .await;

        assert_eq!(paths(&items), vec!["root/kept.txt", "after.txt"]);
    }

    #[tokio::test]
    async fn test_flat_files_fallback() {
        let payload = DropPayload::Files(vec![
            PickedFile::with_hint(Blob::from_bytes("a.jpg", "image/jpeg", vec![1]), "pics/a.jpg"),
            PickedFile::new(Blob::from_bytes("b.txt", "text/plain", vec![2])),
        ]);

        let items = EntryCollector::new().collect(payload).await;
        assert_eq!(paths(&items), vec!["pics/a.jpg", "b.txt"]);
    }
}
