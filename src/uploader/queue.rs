// 上传队列
//
// 插入顺序即显示和提交顺序，任何操作都不会重排已有条目

use tracing::{debug, warn};

use crate::collector::IncomingItem;

/// 待提交的有序队列
#[derive(Debug, Default)]
pub struct UploadQueue {
    items: Vec<IncomingItem>,
    /// 提交进行中时冻结，拒绝增删
    frozen: bool,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加到队尾，保持参数内部顺序
    ///
    /// 返回实际追加的数量；冻结时不追加
    pub fn append<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = IncomingItem>,
    {
        if self.frozen {
            warn!("上传进行中，忽略追加请求");
            return 0;
        }
        let before = self.items.len();
        self.items.extend(items);
        let added = self.items.len() - before;
        debug!("队列追加 {} 项，当前 {} 项", added, self.items.len());
        added
    }

    /// 按下标移除
    ///
    /// 下标越界或队列冻结时静默忽略
    pub fn remove_at(&mut self, index: usize) -> Option<IncomingItem> {
        if self.frozen || index >= self.items.len() {
            return None;
        }
        Some(self.items.remove(index))
    }

    /// 全部条目大小之和（每次实时计算）
    pub fn aggregate_size(&self) -> u64 {
        self.items.iter().map(IncomingItem::size).sum()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&IncomingItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[IncomingItem] {
        &self.items
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    pub(crate) fn unfreeze(&mut self) {
        self.frozen = false;
    }
}
