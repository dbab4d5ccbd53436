// 配额检查
//
// 纯函数：已用空间 + 队列大小 与上限比较，不保存任何状态

use serde::Serialize;

/// 默认配额上限：100MB
pub const DEFAULT_QUOTA_CEILING: u64 = 100 * 1024 * 1024;

/// 配额计算结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuotaState {
    /// 已用空间（外部提供）
    pub current_usage: u64,
    /// 队列总大小
    pub queue_size: u64,
    /// 上限
    pub ceiling: u64,
    /// 是否超出上限
    pub exceeds: bool,
    /// 用于显示的占用比例，范围 [0, 1]
    pub ratio: f64,
}

impl QuotaState {
    pub fn evaluate(current_usage: u64, queue_size: u64, ceiling: u64) -> Self {
        let projected = current_usage.saturating_add(queue_size);
        let ratio = if ceiling == 0 {
            if projected > 0 {
                1.0
            } else {
                0.0
            }
        } else {
            (projected as f64 / ceiling as f64).min(1.0)
        };

        Self {
            current_usage,
            queue_size,
            ceiling,
            exceeds: projected > ceiling,
            ratio,
        }
    }

    /// 提交后预计占用
    pub fn projected_usage(&self) -> u64 {
        self.current_usage.saturating_add(self.queue_size)
    }

    /// 提交后剩余空间
    pub fn remaining(&self) -> u64 {
        self.ceiling.saturating_sub(self.projected_usage())
    }

    /// 百分比（0-100）
    pub fn percent(&self) -> f64 {
        self.ratio * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundary() {
        let state = QuotaState::evaluate(90, 10, 100);
        assert!(!state.exceeds);
        assert_eq!(state.ratio, 1.0);
        assert_eq!(state.remaining(), 0);

        let state = QuotaState::evaluate(90, 11, 100);
        assert!(state.exceeds);
        assert_eq!(state.ratio, 1.0);
    }

    #[test]
    fn test_ratio() {
        let state = QuotaState::evaluate(20, 30, 200);
        assert!(!state.exceeds);
        assert_eq!(state.ratio, 0.25);
        assert_eq!(state.percent(), 25.0);
        assert_eq!(state.remaining(), 150);
    }

    #[test]
    fn test_zero_ceiling() {
        assert_eq!(QuotaState::evaluate(0, 0, 0).ratio, 0.0);
        assert!(!QuotaState::evaluate(0, 0, 0).exceeds);

        let state = QuotaState::evaluate(0, 1, 0);
        assert!(state.exceeds);
        assert_eq!(state.ratio, 1.0);
    }

    #[test]
    fn test_overflow_saturates() {
        let state = QuotaState::evaluate(u64::MAX, 10, DEFAULT_QUOTA_CEILING);
        assert!(state.exceeds);
        assert_eq!(state.projected_usage(), u64::MAX);
    }

    proptest! {
        #[test]
        fn prop_exceeds_matches_sum(used in 0u64..1_000_000, queued in 0u64..1_000_000, ceiling in 1u64..2_000_000) {
            let state = QuotaState::evaluate(used, queued, ceiling);
            prop_assert_eq!(state.exceeds, used + queued > ceiling);
            prop_assert!(state.ratio >= 0.0 && state.ratio <= 1.0);
        }
    }
}
