//! 单选按钮组扫描器

use tracing::debug;

use crate::app::dom::{closest, PageDom};
use crate::app::scan::option_text::option_text_for_control;
use crate::app::scan::question::resolve_group_question_text;
use crate::app::scan::{group_controls, sel, ClaimedSet, Mcq, McqKind, McqOption, GROUP_CONTAINER_SELECTOR};
use crate::app::text::clean_text;

/// 扫描作用域内的 radio 组；每个 name 组构成一道候选题
pub fn scan(dom: &PageDom, scope: usize, claimed: &mut ClaimedSet) -> Vec<Mcq> {
    let mut mcqs = Vec::new();

    let doc = match dom.scope(scope) {
        Some(doc) => doc,
        None => return mcqs,
    };
    let Some(radio_sel) = sel("input[type='radio']") else {
        return mcqs;
    };

    let radios: Vec<_> = doc
        .select(&radio_sel)
        .filter(|r| !claimed.contains(&dom.handle_of(scope, *r)))
        .collect();

    for group in group_controls(radios) {
        // 单个孤立 radio 不构成选择题
        if group.len() < 2 {
            continue;
        }

        let mut options = Vec::new();
        for radio in &group {
            let text = clean_text(&option_text_for_control(dom, scope, *radio));
            if text.is_empty() {
                continue;
            }
            options.push(McqOption::new(text, Some(dom.handle_of(scope, *radio))));
        }

        if options.len() < 2 {
            debug!("radio 组有效选项不足 2 个，丢弃");
            continue;
        }

        // 题干锚定在组容器上：组内控件自己的 label 是选项而非题干
        let anchor = sel(GROUP_CONTAINER_SELECTOR)
            .and_then(|s| closest(group[0], &s))
            .or_else(|| group[0].parent().and_then(scraper::ElementRef::wrap))
            .unwrap_or(group[0]);

        let option_texts: Vec<String> = options.iter().map(|o| o.text.clone()).collect();
        let question = resolve_group_question_text(dom, scope, anchor, &option_texts);
        if question.is_empty() {
            continue;
        }

        let answered = group.iter().any(|r| r.value().attr("checked").is_some());

        for radio in &group {
            claimed.insert(dom.handle_of(scope, *radio));
        }

        mcqs.push(Mcq::new(question, options, McqKind::Radio, answered));
    }

    mcqs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::dom::PageDom;

    #[test]
    fn test_grouping_by_name() {
        let dom = PageDom::parse(
            r#"<div>
                 <p>What is the capital of France today?</p>
                 <input type="radio" name="q1" id="a"><label for="a">Paris</label>
                 <input type="radio" name="q1" id="b"><label for="b">Lisbon</label>
               </div>"#,
        );
        let mut claimed = ClaimedSet::new();
        let mcqs = scan(&dom, 0, &mut claimed);

        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].kind, McqKind::Radio);
        assert_eq!(mcqs[0].question, "What is the capital of France today?");
        assert_eq!(
            mcqs[0].option_texts(),
            vec!["Paris".to_string(), "Lisbon".to_string()]
        );
        assert!(!mcqs[0].answered);
        // 两个控件都被认领
        assert_eq!(claimed.len(), 2);
    }

    #[test]
    fn test_lone_radio_is_not_an_mcq() {
        let dom = PageDom::parse(
            r#"<input type="radio" name="only" id="x"><label for="x">Just one</label>"#,
        );
        let mut claimed = ClaimedSet::new();
        assert!(scan(&dom, 0, &mut claimed).is_empty());
        assert!(claimed.is_empty());
    }

    #[test]
    fn test_checked_marks_answered() {
        let dom = PageDom::parse(
            r#"<p>Which of these numbers is even?</p>
               <input type="radio" name="q" id="a" checked><label for="a">Two</label>
               <input type="radio" name="q" id="b"><label for="b">Three</label>"#,
        );
        let mut claimed = ClaimedSet::new();
        let mcqs = scan(&dom, 0, &mut claimed);
        assert_eq!(mcqs.len(), 1);
        assert!(mcqs[0].answered);
    }

    #[test]
    fn test_unnamed_radios_group_by_container() {
        let dom = PageDom::parse(
            r#"<fieldset>
                 <legend>Pick the best option?</legend>
                 <input type="radio" id="a"><label for="a">Alpha</label>
                 <input type="radio" id="b"><label for="b">Beta</label>
               </fieldset>"#,
        );
        let mut claimed = ClaimedSet::new();
        let mcqs = scan(&dom, 0, &mut claimed);
        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].option_texts(), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_claimed_controls_are_skipped() {
        let dom = PageDom::parse(
            r#"<p>Claimed controls must not regroup here?</p>
               <input type="radio" name="q" id="a"><label for="a">One</label>
               <input type="radio" name="q" id="b"><label for="b">Two</label>"#,
        );
        let mut claimed = ClaimedSet::new();
        let first_pass = scan(&dom, 0, &mut claimed);
        assert_eq!(first_pass.len(), 1);

        // 同一认领集合再跑一遍，不应再产出
        assert!(scan(&dom, 0, &mut claimed).is_empty());
    }
}
