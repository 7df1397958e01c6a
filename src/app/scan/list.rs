//! 列表结构扫描器
//!
//! `ul`/`ol` 作选项、紧邻前文作题干的松散写法。
//! 没有可依赖的控件状态，一律视为未作答。

use scraper::ElementRef;

use crate::app::dom::{self, PageDom};
use crate::app::scan::question::MIN_QUESTION_LEN;
use crate::app::scan::{sel, ClaimedSet, Mcq, McqKind, McqOption};
use crate::app::text::clean_text;

pub fn scan(dom: &PageDom, scope: usize, claimed: &mut ClaimedSet) -> Vec<Mcq> {
    let mut mcqs = Vec::new();

    let doc = match dom.scope(scope) {
        Some(doc) => doc,
        None => return mcqs,
    };
    let Some(list_sel) = sel("ul, ol") else {
        return mcqs;
    };
    let Some(li_sel) = sel("li") else {
        return mcqs;
    };

    for list in doc.select(&list_sel) {
        // 题干必须来自列表前最近的实质文本，找不到就放弃该列表
        let Some(question) = dom::nearest_preceding_text(list, MIN_QUESTION_LEN) else {
            continue;
        };

        let mut options = Vec::new();
        for li in list.select(&li_sel) {
            let handle = dom.handle_of(scope, li);
            if claimed.contains(&handle) || contains_claimed_control(dom, scope, claimed, li) {
                continue;
            }
            let text = clean_text(&dom::element_text(li));
            if text.is_empty() {
                continue;
            }
            options.push(McqOption::new(text, Some(handle)));
        }

        if options.len() < 2 {
            continue;
        }

        for opt in &options {
            if let Some(handle) = opt.handle {
                claimed.insert(handle);
            }
        }

        mcqs.push(Mcq::new(question, options, McqKind::List, false));
    }

    mcqs
}

/// 列表项内是否有已被其他扫描器认领的控件
fn contains_claimed_control(
    dom: &PageDom,
    scope: usize,
    claimed: &ClaimedSet,
    li: ElementRef<'_>,
) -> bool {
    li.descendants()
        .filter_map(ElementRef::wrap)
        .any(|d| claimed.contains(&dom.handle_of(scope, d)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::dom::PageDom;

    #[test]
    fn test_question_from_preceding_sibling() {
        let dom = PageDom::parse(
            r#"<p>Which of these animals is a mammal?</p>
               <ul>
                 <li>A) Shark</li>
                 <li>B) Dolphin</li>
                 <li>C) Trout</li>
               </ul>"#,
        );
        let mut claimed = ClaimedSet::new();
        let mcqs = scan(&dom, 0, &mut claimed);

        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].kind, McqKind::List);
        assert_eq!(mcqs[0].question, "Which of these animals is a mammal?");
        // 行首枚举符在清洗时剥掉
        assert_eq!(mcqs[0].option_texts(), vec!["Shark", "Dolphin", "Trout"]);
        assert!(!mcqs[0].answered);
    }

    #[test]
    fn test_list_without_preceding_text_is_skipped() {
        let dom = PageDom::parse(r#"<ul><li>Home</li><li>About</li></ul>"#);
        let mut claimed = ClaimedSet::new();
        assert!(scan(&dom, 0, &mut claimed).is_empty());
    }

    #[test]
    fn test_claimed_items_do_not_recount() {
        let dom = PageDom::parse(
            r#"<p>Still a question about these two items?</p>
               <ul id="l"><li>One</li><li>Two</li></ul>"#,
        );
        let mut claimed = ClaimedSet::new();
        let first = scan(&dom, 0, &mut claimed);
        assert_eq!(first.len(), 1);
        assert!(scan(&dom, 0, &mut claimed).is_empty());
    }
}
