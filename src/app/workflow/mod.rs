pub mod pipeline;
pub mod process_single;

use crate::app::scan::McqKind;

/// 单道题的处理上下文
pub struct McqCtx {
    /// 页面标识（快照文件名或外部传入的页面 id）
    pub page_id: String,
    /// 页面序号（仅用于日志显示）
    pub page_index: usize,
    /// 题目在本轮扫描中的序号（从 1 开始）
    pub mcq_index: usize,
    pub kind: McqKind,
}

impl McqCtx {
    /// 生成日志前缀
    pub fn log_prefix(&self) -> String {
        format!(
            "[页面#{} 题目#{} {}]",
            self.page_index,
            self.mcq_index,
            self.kind.as_str()
        )
    }
}
