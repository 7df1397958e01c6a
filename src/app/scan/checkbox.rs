//! 复选框组扫描器
//!
//! 分组规则与 radio 相同（name → 语义容器 → 虚拟容器），
//! 多选题允许多个选项同时命中。

use tracing::debug;

use crate::app::dom::{closest, PageDom};
use crate::app::scan::option_text::option_text_for_control;
use crate::app::scan::question::resolve_group_question_text;
use crate::app::scan::{group_controls, sel, ClaimedSet, Mcq, McqKind, McqOption, GROUP_CONTAINER_SELECTOR};
use crate::app::text::clean_text;

pub fn scan(dom: &PageDom, scope: usize, claimed: &mut ClaimedSet) -> Vec<Mcq> {
    let mut mcqs = Vec::new();

    let doc = match dom.scope(scope) {
        Some(doc) => doc,
        None => return mcqs,
    };
    let Some(checkbox_sel) = sel("input[type='checkbox']") else {
        return mcqs;
    };

    let checkboxes: Vec<_> = doc
        .select(&checkbox_sel)
        .filter(|c| !claimed.contains(&dom.handle_of(scope, *c)))
        .collect();

    for group in group_controls(checkboxes) {
        if group.len() < 2 {
            continue;
        }

        let mut options = Vec::new();
        for checkbox in &group {
            let text = clean_text(&option_text_for_control(dom, scope, *checkbox));
            if text.is_empty() {
                continue;
            }
            options.push(McqOption::new(text, Some(dom.handle_of(scope, *checkbox))));
        }

        if options.len() < 2 {
            debug!("checkbox 组有效选项不足 2 个，丢弃");
            continue;
        }

        let anchor = sel(GROUP_CONTAINER_SELECTOR)
            .and_then(|s| closest(group[0], &s))
            .or_else(|| group[0].parent().and_then(scraper::ElementRef::wrap))
            .unwrap_or(group[0]);

        let option_texts: Vec<String> = options.iter().map(|o| o.text.clone()).collect();
        let question = resolve_group_question_text(dom, scope, anchor, &option_texts);
        if question.is_empty() {
            continue;
        }

        let answered = group.iter().any(|c| c.value().attr("checked").is_some());

        for checkbox in &group {
            claimed.insert(dom.handle_of(scope, *checkbox));
        }

        mcqs.push(Mcq::new(question, options, McqKind::Checkbox, answered));
    }

    mcqs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::dom::PageDom;

    #[test]
    fn test_container_grouping() {
        let dom = PageDom::parse(
            r#"<fieldset>
                 <legend>Which of these are prime numbers?</legend>
                 <label><input type="checkbox" value="2">Two</label>
                 <label><input type="checkbox" value="4">Four</label>
                 <label><input type="checkbox" value="5">Five</label>
               </fieldset>"#,
        );
        let mut claimed = ClaimedSet::new();
        let mcqs = scan(&dom, 0, &mut claimed);

        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].kind, McqKind::Checkbox);
        assert_eq!(mcqs[0].question, "Which of these are prime numbers?");
        assert_eq!(mcqs[0].option_texts(), vec!["Two", "Four", "Five"]);
    }

    #[test]
    fn test_single_checkbox_is_not_an_mcq() {
        let dom = PageDom::parse(
            r#"<form><label><input type="checkbox">I agree to the terms</label></form>"#,
        );
        let mut claimed = ClaimedSet::new();
        assert!(scan(&dom, 0, &mut claimed).is_empty());
    }

    #[test]
    fn test_checked_marks_answered() {
        let dom = PageDom::parse(
            r#"<div class="question">
                 <p>Select all even numbers shown below?</p>
                 <label><input type="checkbox" checked>Two</label>
                 <label><input type="checkbox">Three</label>
               </div>"#,
        );
        let mut claimed = ClaimedSet::new();
        let mcqs = scan(&dom, 0, &mut claimed);
        assert_eq!(mcqs.len(), 1);
        assert!(mcqs[0].answered);
    }
}
