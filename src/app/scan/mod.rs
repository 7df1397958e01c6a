//! MCQ 结构扫描器族
//!
//! 每个扫描器是对当前快照的纯函数：输入一个作用域与已认领控件集合，
//! 输出零个或多个候选题。扫描器彼此独立、不依赖执行顺序；
//! 聚合去重由 [`aggregate`] 统一完成。

pub mod aggregate;
pub mod checkbox;
pub mod image;
pub mod list;
pub mod math;
pub mod option_text;
pub mod patterns;
pub mod question;
pub mod radio;
pub mod select;

use std::collections::HashSet;

use scraper::Selector;

use crate::app::dom::ElementHandle;
use crate::app::text::normalize_for_key;

/// 已被更专门的扫描器认领的控件句柄集合
pub type ClaimedSet = HashSet<ElementHandle>;

/// 候选题来源类型，决定下游的作答方式（点击 / 设置下拉索引）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McqKind {
    Radio,
    Checkbox,
    Select,
    List,
    Image,
    Ocr,
    Custom,
}

impl McqKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            McqKind::Radio => "radio",
            McqKind::Checkbox => "checkbox",
            McqKind::Select => "select",
            McqKind::List => "list",
            McqKind::Image => "image",
            McqKind::Ocr => "ocr",
            McqKind::Custom => "custom",
        }
    }
}

/// 一个可选项
#[derive(Debug, Clone)]
pub struct McqOption {
    /// 清洗后的选项文本；图片选项为派生说明（alt / 文件名）
    pub text: String,
    /// 指向活动控件的句柄；OCR 等纯视觉来源可能没有
    pub handle: Option<ElementHandle>,
    pub is_image: bool,
}

impl McqOption {
    pub fn new(text: impl Into<String>, handle: Option<ElementHandle>) -> Self {
        McqOption {
            text: text.into(),
            handle,
            is_image: false,
        }
    }

    pub fn image(text: impl Into<String>, handle: Option<ElementHandle>) -> Self {
        McqOption {
            text: text.into(),
            handle,
            is_image: true,
        }
    }
}

/// 一道检测出的候选题
///
/// 每轮扫描新建，轮间无持久身份；轮内按检测键去重。
#[derive(Debug, Clone)]
pub struct Mcq {
    pub question: String,
    /// 按 DOM / 视觉顺序排列，有效题至少 2 个非空选项
    pub options: Vec<McqOption>,
    pub kind: McqKind,
    /// 尽力而为：底层控件是否已体现选中态
    pub answered: bool,
    /// 题干图片 URL（图片题）
    pub question_image: Option<String>,
    /// LLM 往返成功后由编排器回填
    pub resolved_answer: Option<String>,
}

impl Mcq {
    pub fn new(
        question: impl Into<String>,
        options: Vec<McqOption>,
        kind: McqKind,
        answered: bool,
    ) -> Self {
        Mcq {
            question: question.into(),
            options,
            kind,
            answered,
            question_image: None,
            resolved_answer: None,
        }
    }

    /// 去重键：归一化题干 + "|" + 各归一化选项
    pub fn detection_key(&self) -> String {
        let mut key = normalize_for_key(&self.question);
        for opt in &self.options {
            key.push('|');
            key.push_str(&normalize_for_key(&opt.text));
        }
        key
    }

    pub fn option_texts(&self) -> Vec<String> {
        self.options.iter().map(|o| o.text.clone()).collect()
    }
}

/// 解析写死的内部选择器；失败（不应发生）时返回 None 让扫描器静默退出
pub(crate) fn sel(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

/// 分组用的语义容器
pub(crate) const GROUP_CONTAINER_SELECTOR: &str =
    "form, fieldset, div.question, div.mcq, div.quiz-question";

/// 控件分组键：name 属性 → 语义容器 → 虚拟容器（共同父元素）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Name(String),
    Container(ego_tree::NodeId),
}

/// 把同类控件按逻辑键分组，保持首见顺序
///
/// 无 name 的控件落到最近的语义容器；再没有就按共同父元素
/// 做"虚拟容器"分组。不足 2 个成员的组由调用方丢弃。
pub(crate) fn group_controls<'a>(controls: Vec<scraper::ElementRef<'a>>) -> Vec<Vec<scraper::ElementRef<'a>>> {
    use crate::app::dom::closest;

    let container_sel = sel(GROUP_CONTAINER_SELECTOR);

    let mut order: Vec<GroupKey> = Vec::new();
    let mut groups: std::collections::HashMap<GroupKey, Vec<scraper::ElementRef<'a>>> =
        std::collections::HashMap::new();

    for control in controls {
        let key = match control.value().attr("name").filter(|n| !n.trim().is_empty()) {
            Some(name) => GroupKey::Name(name.to_string()),
            None => {
                let container = container_sel
                    .as_ref()
                    .and_then(|s| closest(control, s))
                    .or_else(|| control.parent().and_then(scraper::ElementRef::wrap));
                match container {
                    Some(c) => GroupKey::Container(c.id()),
                    None => continue,
                }
            }
        };

        let entry = groups.entry(key.clone()).or_default();
        if entry.is_empty() {
            order.push(key);
        }
        entry.push(control);
    }

    order
        .into_iter()
        .filter_map(|k| groups.remove(&k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_key_normalizes() {
        let a = Mcq::new(
            "What is 2+2?",
            vec![McqOption::new("3", None), McqOption::new("4", None)],
            McqKind::Radio,
            false,
        );
        let b = Mcq::new(
            "  what is 2+2?",
            vec![McqOption::new("3!", None), McqOption::new("4.", None)],
            McqKind::Ocr,
            true,
        );
        assert_eq!(a.detection_key(), b.detection_key());
    }

    #[test]
    fn test_detection_key_distinguishes_option_sets() {
        let a = Mcq::new(
            "Pick one",
            vec![McqOption::new("x", None), McqOption::new("y", None)],
            McqKind::Radio,
            false,
        );
        let b = Mcq::new(
            "Pick one",
            vec![McqOption::new("x", None), McqOption::new("z", None)],
            McqKind::Radio,
            false,
        );
        assert_ne!(a.detection_key(), b.detection_key());
    }
}
