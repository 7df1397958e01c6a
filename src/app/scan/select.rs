//! 下拉框扫描器

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

use crate::app::dom::{self, PageDom};
use crate::app::scan::question::resolve_question_text;
use crate::app::scan::{sel, ClaimedSet, Mcq, McqKind, McqOption};
use crate::app::text::clean_text;

/// 占位项判定：整词匹配，避免误伤 "Selection sort" 这类真实选项
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(Select|Choose)\b").expect("占位项正则非法"));

fn is_placeholder(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}

pub fn scan(dom: &PageDom, scope: usize, claimed: &mut ClaimedSet) -> Vec<Mcq> {
    let mut mcqs = Vec::new();

    let doc = match dom.scope(scope) {
        Some(doc) => doc,
        None => return mcqs,
    };
    let Some(select_sel) = sel("select") else {
        return mcqs;
    };

    for select in doc.select(&select_sel) {
        let handle = dom.handle_of(scope, select);
        if claimed.contains(&handle) {
            continue;
        }

        let all_options: Vec<ElementRef<'_>> = select
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|d| d.value().name() == "option")
            .collect();

        // 连占位项都不足 2 个，不是题
        if all_options.len() < 2 {
            continue;
        }

        let mut options = Vec::new();
        for option_el in &all_options {
            let raw = dom::element_text(*option_el);
            if raw.is_empty() || is_placeholder(&raw) {
                continue;
            }
            let text = clean_text(&raw);
            if text.is_empty() {
                continue;
            }
            options.push(McqOption::new(text, Some(dom.handle_of(scope, *option_el))));
        }

        if options.len() < 2 {
            continue;
        }

        let option_texts: Vec<String> = options.iter().map(|o| o.text.clone()).collect();
        let question = resolve_question_text(dom, scope, select, &option_texts);
        if question.is_empty() {
            continue;
        }

        // 选中了占位项之外的条目才算已作答
        let answered = all_options
            .iter()
            .enumerate()
            .any(|(i, o)| i > 0 && o.value().attr("selected").is_some());

        claimed.insert(handle);
        mcqs.push(Mcq::new(question, options, McqKind::Select, answered));
    }

    mcqs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::dom::PageDom;

    #[test]
    fn test_select_with_label_and_placeholder() {
        let dom = PageDom::parse(
            r#"<label for="cap">What is the capital of Portugal?</label>
               <select id="cap">
                 <option>Select an answer</option>
                 <option>Paris</option>
                 <option>Lisbon</option>
               </select>"#,
        );
        let mut claimed = ClaimedSet::new();
        let mcqs = scan(&dom, 0, &mut claimed);

        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].kind, McqKind::Select);
        assert_eq!(mcqs[0].question, "What is the capital of Portugal?");
        assert_eq!(mcqs[0].option_texts(), vec!["Paris", "Lisbon"]);
        assert!(!mcqs[0].answered);
    }

    #[test]
    fn test_selected_entry_marks_answered() {
        let dom = PageDom::parse(
            r#"<label for="s">Pick the even number here?</label>
               <select id="s">
                 <option>Choose one</option>
                 <option selected>Two</option>
                 <option>Three</option>
               </select>"#,
        );
        let mut claimed = ClaimedSet::new();
        let mcqs = scan(&dom, 0, &mut claimed);
        assert_eq!(mcqs.len(), 1);
        assert!(mcqs[0].answered);
    }

    #[test]
    fn test_too_few_real_options() {
        let dom = PageDom::parse(
            r#"<select><option>Select one</option><option>Only</option></select>"#,
        );
        let mut claimed = ClaimedSet::new();
        assert!(scan(&dom, 0, &mut claimed).is_empty());
    }

    #[test]
    fn test_selection_sort_is_not_a_placeholder() {
        let dom = PageDom::parse(
            r#"<label for="a">Which algorithm is O(n^2) in the worst case?</label>
               <select id="a">
                 <option>Selection sort</option>
                 <option>Merge sort</option>
               </select>"#,
        );
        let mut claimed = ClaimedSet::new();
        let mcqs = scan(&dom, 0, &mut claimed);
        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].option_texts(), vec!["Selection sort", "Merge sort"]);
    }
}
