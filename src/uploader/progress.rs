// 提交状态与进度

use serde::Serialize;

/// 提交状态机：Idle → Running → {Succeeded, Failed}
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum CommitState {
    /// 空闲
    Idle,
    /// 提交中
    Running,
    /// 全部成功
    Succeeded,
    /// 在第 index 项失败
    Failed { index: usize, message: String },
}

impl CommitState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// 单个条目在提交中的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPhase {
    /// 已完成
    Done,
    /// 上传中
    InFlight,
    /// 上传失败（提交已中止）
    Failed,
    /// 等待中
    Pending,
}

/// 提交进度
///
/// completed_count 从 0 单调递增到 total；每次提交开始时重置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitProgress {
    /// 已完成数量
    pub completed_count: usize,
    /// 总数
    pub total: usize,
    /// 失败信息
    pub failed: Option<String>,
}

impl CommitProgress {
    pub(crate) fn started(total: usize) -> Self {
        Self {
            completed_count: 0,
            total,
            failed: None,
        }
    }

    /// 全部完成
    pub fn is_complete(&self) -> bool {
        self.failed.is_none() && self.total > 0 && self.completed_count == self.total
    }

    /// 仍在推进（未完成且未失败）
    pub fn is_active(&self) -> bool {
        self.failed.is_none() && self.completed_count < self.total
    }

    /// 计算进度百分比
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed_count as f64 / self.total as f64) * 100.0
    }

    /// 下标为 index 的条目所处阶段
    pub fn item_phase(&self, index: usize) -> ItemPhase {
        if index < self.completed_count {
            ItemPhase::Done
        } else if index == self.completed_count && self.failed.is_some() {
            ItemPhase::Failed
        } else if index == self.completed_count && self.is_active() {
            ItemPhase::InFlight
        } else {
            ItemPhase::Pending
        }
    }
}
