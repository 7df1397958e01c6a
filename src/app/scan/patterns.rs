//! 容器模式扫描器
//!
//! 把"某类容器里装着一道题"的各种页面形态统一成一条代码路径：
//! 表单平台的专有类名、常见的题目容器类、以及用户自定义选择器，
//! 都只是不同的容器选择器，容器内部的抽取逻辑完全一致。

use scraper::{ElementRef, Selector};
use tracing::warn;

use crate::app::dom::{self, PageDom};
use crate::app::scan::option_text::option_text_for_control;
use crate::app::scan::question::resolve_question_text;
use crate::app::scan::{sel, ClaimedSet, Mcq, McqKind, McqOption};
use crate::app::text::{clean_text, leading_text};

/// 一种容器形态：容器选择器 + 可选的题干选择器
struct ContainerPattern {
    container: &'static str,
    title: Option<&'static str>,
}

/// 内置容器形态，含表单平台专有类名与通用题目类
const VENDOR_PATTERNS: &[ContainerPattern] = &[
    ContainerPattern {
        container: ".freebirdFormviewerComponentsQuestionBaseRoot",
        title: Some(".freebirdFormviewerComponentsQuestionBaseTitle"),
    },
    ContainerPattern {
        container: ".question, .mcq, .multiple-choice, .quiz-question",
        title: Some(".question-text, .stem, h3, h4, p"),
    },
];

/// 扫描内置容器形态
pub fn scan(dom: &PageDom, scope: usize, claimed: &mut ClaimedSet) -> Vec<Mcq> {
    let mut mcqs = Vec::new();

    for pattern in VENDOR_PATTERNS {
        let Some(container_sel) = sel(pattern.container) else {
            continue;
        };
        let title_sel = pattern.title.and_then(sel);

        mcqs.extend(scan_with_selector(
            dom,
            scope,
            claimed,
            &container_sel,
            title_sel.as_ref(),
        ));
    }

    mcqs
}

/// 扫描用户自定义选择器；非法选择器记录告警后跳过
pub fn scan_custom(
    dom: &PageDom,
    scope: usize,
    claimed: &mut ClaimedSet,
    selectors: &[&str],
) -> Vec<Mcq> {
    let mut mcqs = Vec::new();

    for raw in selectors {
        let container_sel = match Selector::parse(raw) {
            Ok(s) => s,
            Err(e) => {
                warn!("自定义选择器非法，已跳过: {:?} ({:?})", raw, e);
                continue;
            }
        };

        mcqs.extend(scan_with_selector(dom, scope, claimed, &container_sel, None));
    }

    mcqs
}

fn scan_with_selector(
    dom: &PageDom,
    scope: usize,
    claimed: &mut ClaimedSet,
    container_sel: &Selector,
    title_sel: Option<&Selector>,
) -> Vec<Mcq> {
    let mut mcqs = Vec::new();

    let doc = match dom.scope(scope) {
        Some(doc) => doc,
        None => return mcqs,
    };

    let containers: Vec<ElementRef<'_>> = doc.select(container_sel).collect();
    for container in containers {
        mcqs.extend(scan_container(dom, scope, claimed, container, title_sel));
    }

    mcqs
}

/// 抽取一个容器内的候选题
///
/// 同一容器里 radio 组与 checkbox 组可各出一题（表单平台两种控件
/// 并存的写法）；都没有时退回通用选项元素。数学扫描器也复用此路径。
pub(crate) fn scan_container(
    dom: &PageDom,
    scope: usize,
    claimed: &mut ClaimedSet,
    container: ElementRef<'_>,
    title_sel: Option<&Selector>,
) -> Vec<Mcq> {
    let mut mcqs = Vec::new();

    if let Some(mcq) = native_input_mcq(dom, scope, claimed, container, title_sel, "radio") {
        mcqs.push(mcq);
    }
    if let Some(mcq) = native_input_mcq(dom, scope, claimed, container, title_sel, "checkbox") {
        mcqs.push(mcq);
    }
    if mcqs.is_empty() {
        if let Some(mcq) = generic_option_mcq(dom, scope, claimed, container, title_sel) {
            mcqs.push(mcq);
        }
    }

    mcqs
}

/// 容器内的原生控件（radio / checkbox）构题
fn native_input_mcq(
    dom: &PageDom,
    scope: usize,
    claimed: &mut ClaimedSet,
    container: ElementRef<'_>,
    title_sel: Option<&Selector>,
    input_type: &str,
) -> Option<Mcq> {
    let input_sel = sel(&format!("input[type='{}']", input_type))?;

    let inputs: Vec<ElementRef<'_>> = container
        .select(&input_sel)
        .filter(|i| !claimed.contains(&dom.handle_of(scope, *i)))
        .collect();
    if inputs.len() < 2 {
        return None;
    }

    let mut options = Vec::new();
    for input in &inputs {
        let text = clean_text(&option_text_for_control(dom, scope, *input));
        if text.is_empty() {
            continue;
        }
        options.push(McqOption::new(text, Some(dom.handle_of(scope, *input))));
    }
    if options.len() < 2 {
        return None;
    }

    let question = container_question(dom, scope, container, title_sel, &options)?;
    let answered = inputs.iter().any(|i| i.value().attr("checked").is_some());

    for input in &inputs {
        claimed.insert(dom.handle_of(scope, *input));
    }

    let kind = if input_type == "radio" {
        McqKind::Radio
    } else {
        McqKind::Checkbox
    };
    Some(Mcq::new(question, options, kind, answered))
}

/// 无原生控件时的通用选项元素构题
fn generic_option_mcq(
    dom: &PageDom,
    scope: usize,
    claimed: &mut ClaimedSet,
    container: ElementRef<'_>,
    title_sel: Option<&Selector>,
) -> Option<Mcq> {
    let option_sel = sel(".option, .answer, .choice, li, label")?;

    let mut options = Vec::new();
    for opt_el in container.select(&option_sel) {
        let handle = dom.handle_of(scope, opt_el);
        if claimed.contains(&handle) {
            continue;
        }
        let text = clean_text(&dom::element_text(opt_el));
        if text.is_empty() {
            continue;
        }
        options.push((opt_el, McqOption::new(text, Some(handle))));
    }
    if options.len() < 2 {
        return None;
    }

    let opts: Vec<McqOption> = options.iter().map(|(_, o)| o.clone()).collect();
    let question = container_question(dom, scope, container, title_sel, &opts)?;

    for (el, _) in &options {
        claimed.insert(dom.handle_of(scope, *el));
    }

    // 无法可靠判断此类结构是否已作答，默认未答
    Some(Mcq::new(question, opts, McqKind::Custom, false))
}

/// 容器题干：题干选择器优先，链式兜底，最后截取容器前导文本
fn container_question(
    dom: &PageDom,
    scope: usize,
    container: ElementRef<'_>,
    title_sel: Option<&Selector>,
    options: &[McqOption],
) -> Option<String> {
    if let Some(title_sel) = title_sel {
        if let Some(title_el) = container.select(title_sel).next() {
            let text = dom::element_text(title_el);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    let option_texts: Vec<String> = options.iter().map(|o| o.text.clone()).collect();
    let question = resolve_question_text(dom, scope, container, &option_texts);
    if !question.is_empty() {
        return Some(question);
    }

    let leading = leading_text(&dom::element_text(container), 100);
    if leading.is_empty() {
        None
    } else {
        Some(leading)
    }
}
