//! 会话统计
//!
//! 仅编排器写入；外部展示方只读快照。
//! `correct` 没有核心内的反馈通道，留给外部协作方累计，
//! 因此 `accuracy` 只是尽力而为的参考值。

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// 最近一轮扫描发现的候选题数
    pub found: u64,
    /// 本会话累计作答数
    pub answered: u64,
    /// 外部反馈的答对数
    pub correct: u64,
    /// 四舍五入的百分比
    pub accuracy: u64,
}

impl Stats {
    /// 每轮扫描后记录发现数（覆盖而非累加，与展示语义一致）
    pub fn record_scan(&mut self, found: usize) {
        self.found = found as u64;
    }

    pub fn record_answered(&mut self) {
        self.answered += 1;
        self.recompute();
    }

    /// 由外部协作方在拿到判分结果时调用
    #[allow(dead_code)]
    pub fn record_correct(&mut self) {
        self.correct += 1;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.accuracy = if self.answered == 0 {
            0
        } else {
            ((self.correct as f64 / self.answered as f64) * 100.0).round() as u64
        };
    }
}
