//! 题干文本解析
//!
//! 题干缺失不是致命错误：按优先级逐个尝试候选策略，
//! 取第一个非空结果。策略顺序即兜底链：
//! 显式 data 属性 → aria 属性 → 关联 label → 含问号的标题/段落祖先
//! → fieldset legend → 题干类容器 → 前置同级文本 → 选项合成 → 自身前导文本。

use scraper::{ElementRef, Html};

use crate::app::dom::{self, PageDom};
use crate::app::scan::sel;
use crate::app::text::{collapse_ws, leading_text};

/// 标题/段落祖先策略要求的最小题干长度（码点数）
pub const MIN_QUESTION_LEN: usize = 10;

/// 自身前导文本兜底的最大长度
pub const LEADING_TEXT_LIMIT: usize = 100;

/// 解析一道题的题干文本（完整链，含 label 策略）；全部策略落空时返回空串
///
/// 适用于 select、自定义容器等"控件即题目"的场景。
pub fn resolve_question_text(
    dom: &PageDom,
    scope: usize,
    anchor: ElementRef<'_>,
    option_texts: &[String],
) -> String {
    let doc = match dom.scope(scope) {
        Some(doc) => doc,
        None => return String::new(),
    };

    run_strategies(&[
        &|| data_question_attr(anchor),
        &|| aria_label(doc, anchor),
        &|| associated_label(doc, anchor),
        &|| ancestor_heading(anchor),
        &|| fieldset_legend(anchor),
        &|| question_class_container(doc),
        &|| dom::nearest_preceding_text(anchor, MIN_QUESTION_LEN),
        &|| synthesized_from_options(option_texts),
        &|| own_leading_text(anchor),
    ])
}

/// 控件组（radio/checkbox）的题干链
///
/// 与完整链的区别：跳过 label 策略——组内控件各自的 label 是
/// 选项文本，不是题干。
pub fn resolve_group_question_text(
    dom: &PageDom,
    scope: usize,
    anchor: ElementRef<'_>,
    option_texts: &[String],
) -> String {
    let doc = match dom.scope(scope) {
        Some(doc) => doc,
        None => return String::new(),
    };

    run_strategies(&[
        &|| data_question_attr(anchor),
        &|| aria_label(doc, anchor),
        &|| ancestor_heading(anchor),
        &|| fieldset_legend(anchor),
        &|| question_class_container(doc),
        &|| dom::nearest_preceding_text(anchor, MIN_QUESTION_LEN),
        &|| synthesized_from_options(option_texts),
    ])
}

fn run_strategies(strategies: &[&dyn Fn() -> Option<String>]) -> String {
    for strategy in strategies {
        if let Some(text) = strategy() {
            let text = collapse_ws(&text);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// 显式 `data-question` 属性，自身或祖先均可
fn data_question_attr(anchor: ElementRef<'_>) -> Option<String> {
    if let Some(v) = anchor.value().attr("data-question") {
        return non_empty(v);
    }
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|a| a.value().attr("data-question").and_then(non_empty))
}

/// `aria-label` 或 `aria-labelledby` 指向的元素文本
fn aria_label(doc: &Html, anchor: ElementRef<'_>) -> Option<String> {
    if let Some(v) = anchor.value().attr("aria-label") {
        if let Some(v) = non_empty(v) {
            return Some(v);
        }
    }

    let ids = anchor.value().attr("aria-labelledby")?;
    let mut parts = Vec::new();
    for id in ids.split_whitespace() {
        if let Some(el) = find_by_id(doc, id) {
            let text = dom::element_text(el);
            if !text.is_empty() {
                parts.push(text);
            }
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// `label[for]` 关联，或包裹控件的 label（剔除控件自身文本）
fn associated_label(doc: &Html, anchor: ElementRef<'_>) -> Option<String> {
    if let Some(id) = anchor.value().attr("id") {
        let label_sel = sel("label")?;
        if let Some(label) = doc
            .select(&label_sel)
            .find(|l| l.value().attr("for") == Some(id))
        {
            if let Some(text) = non_empty(&dom::element_text(label)) {
                return Some(text);
            }
        }
    }

    let label_sel = sel("label")?;
    let wrapping = dom::closest(anchor, &label_sel)?;
    let label_text = dom::element_text(wrapping);
    let own_text = dom::element_text(anchor);
    let stripped = if own_text.is_empty() {
        label_text
    } else {
        label_text.replace(&own_text, "")
    };
    non_empty(&stripped)
}

/// 从锚点自身开始沿祖先链找标题/段落后代：长度达标且含问号的第一个
fn ancestor_heading(anchor: ElementRef<'_>) -> Option<String> {
    let heading_sel = sel("h1, h2, h3, h4, h5, h6, p, legend")?;

    let chain = std::iter::once(anchor).chain(anchor.ancestors().filter_map(ElementRef::wrap));
    for ancestor in chain {
        for heading in ancestor.select(&heading_sel) {
            let text = dom::element_text(heading);
            if text.chars().count() > MIN_QUESTION_LEN && text.contains('?') {
                return Some(text);
            }
        }
        if ancestor.value().name() == "body" {
            break;
        }
    }
    None
}

/// 最近 fieldset 的 legend
fn fieldset_legend(anchor: ElementRef<'_>) -> Option<String> {
    let fieldset_sel = sel("fieldset")?;
    let legend_sel = sel("legend")?;

    let fieldset = dom::closest(anchor, &fieldset_sel)?;
    let legend = fieldset.select(&legend_sel).next()?;
    non_empty(&dom::element_text(legend))
}

/// 作用域内第一个题干类容器
fn question_class_container(doc: &Html) -> Option<String> {
    let container_sel = sel(".question, .question-text, .quiz-question, .mcq-question")?;
    let container = doc.select(&container_sel).next()?;
    non_empty(&dom::element_text(container))
}

/// 由选项文本合成的兜底题干
fn synthesized_from_options(option_texts: &[String]) -> Option<String> {
    let joined = option_texts
        .iter()
        .filter(|t| !t.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        None
    } else {
        Some(format!("Question for options: {}", joined))
    }
}

/// 最后兜底：元素自身文本截断
fn own_leading_text(anchor: ElementRef<'_>) -> Option<String> {
    non_empty(&leading_text(&dom::element_text(anchor), LEADING_TEXT_LIMIT))
}

fn find_by_id<'a>(doc: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().attr("id") == Some(id))
}

fn non_empty(s: &str) -> Option<String> {
    let collapsed = collapse_ws(s);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::dom::PageDom;
    use scraper::Selector;

    fn first<'a>(dom: &'a PageDom, css: &str) -> ElementRef<'a> {
        let sel = Selector::parse(css).unwrap();
        dom.scope(0).unwrap().select(&sel).next().unwrap()
    }

    #[test]
    fn test_data_attribute_wins() {
        let dom = PageDom::parse(
            r#"<div data-question="Which planet is red?">
                 <h3>Some unrelated heading here?</h3>
                 <input type="radio" name="q" id="r1">
               </div>"#,
        );
        let input = first(&dom, "input");
        let q = resolve_question_text(&dom, 0, input, &[]);
        assert_eq!(q, "Which planet is red?");
    }

    #[test]
    fn test_aria_label() {
        let dom = PageDom::parse(r#"<select aria-label="Pick the capital"></select>"#);
        let select = first(&dom, "select");
        assert_eq!(
            resolve_question_text(&dom, 0, select, &[]),
            "Pick the capital"
        );
    }

    #[test]
    fn test_aria_labelledby() {
        let dom = PageDom::parse(
            r#"<span id="t1">Which</span><span id="t2">city?</span>
               <select aria-labelledby="t1 t2"></select>"#,
        );
        let select = first(&dom, "select");
        assert_eq!(resolve_question_text(&dom, 0, select, &[]), "Which city?");
    }

    #[test]
    fn test_ancestor_heading_needs_question_mark() {
        let dom = PageDom::parse(
            r#"<div>
                 <p>This statement has no question mark at all</p>
                 <p>What is the largest ocean on Earth?</p>
                 <input type="radio" name="q">
               </div>"#,
        );
        let input = first(&dom, "input");
        assert_eq!(
            resolve_question_text(&dom, 0, input, &[]),
            "What is the largest ocean on Earth?"
        );
    }

    #[test]
    fn test_fieldset_legend_fallback() {
        let dom = PageDom::parse(
            r#"<fieldset>
                 <legend>Best answer</legend>
                 <input type="radio" name="q">
               </fieldset>"#,
        );
        let input = first(&dom, "input");
        assert_eq!(resolve_question_text(&dom, 0, input, &[]), "Best answer");
    }

    #[test]
    fn test_synthesized_from_options_as_last_resort() {
        let dom = PageDom::parse(r#"<span><input type="radio" name="q"></span>"#);
        let input = first(&dom, "input");
        let q = resolve_question_text(
            &dom,
            0,
            input,
            &["Paris".to_string(), "Lisbon".to_string()],
        );
        assert_eq!(q, "Question for options: Paris, Lisbon");
    }
}
