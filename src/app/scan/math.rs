//! 数学题扫描器
//!
//! 两条线索：公式渲染库的容器类名（MathJax / KaTeX 等），
//! 以及题干文本里的算式模式。命中的容器按通用容器路径抽取，
//! 题干加 `[Math Question]` 前缀提示下游这是数学题。

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use ego_tree::NodeId;
use scraper::ElementRef;

use crate::app::dom::{self, closest, PageDom};
use crate::app::scan::{patterns, sel, ClaimedSet, Mcq};
use crate::app::text::leading_text;

/// 公式渲染容器类名
const MATH_CONTAINER_SELECTOR: &str =
    ".math, .equation, .MathJax, .katex, [class*='math'], [class*='equation']";

/// 数学题所在的题目容器
const QUESTION_CONTAINER_SELECTOR: &str = ".question, .mcq, .quiz-question, form, fieldset";

/// 算式模式：四则运算、分数、乘方、开方
static MATH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d+\s*[+\-×÷=<>]\s*\d+",
        r"\d+\s*/\s*\d+",
        r"\d+\s*\^\s*\d+",
        r"sqrt\s*\(\s*\d+\s*\)",
        r"\d+\s*\*\s*\d+",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// 非 ASCII 数学符号；常见 ASCII 运算符单独出现太普遍，不作为线索
const MATH_SYMBOLS: &[char] = &[
    '×', '÷', '≤', '≥', '≠', '∫', '∑', '∏', '√', '∞', 'π', 'θ', 'α', 'β', 'γ', 'δ',
];

pub fn scan(dom: &PageDom, scope: usize, claimed: &mut ClaimedSet) -> Vec<Mcq> {
    let mut mcqs = Vec::new();
    let mut seen_containers: HashSet<NodeId> = HashSet::new();

    let doc = match dom.scope(scope) {
        Some(doc) => doc,
        None => return mcqs,
    };

    let Some(question_container_sel) = sel(QUESTION_CONTAINER_SELECTOR) else {
        return mcqs;
    };

    // 线索一：公式渲染容器
    if let Some(math_sel) = sel(MATH_CONTAINER_SELECTOR) {
        let math_els: Vec<ElementRef<'_>> = doc.select(&math_sel).collect();
        for math_el in math_els {
            let Some(container) = closest(math_el, &question_container_sel) else {
                continue;
            };
            if !seen_containers.insert(container.id()) {
                continue;
            }
            mcqs.extend(extract_math_container(dom, scope, claimed, container));
        }
    }

    // 线索二：题干文本里的算式
    let containers: Vec<ElementRef<'_>> = doc.select(&question_container_sel).collect();
    for container in containers {
        if seen_containers.contains(&container.id()) {
            continue;
        }
        let text = dom::element_text(container);
        if !looks_mathy(&text) {
            continue;
        }
        seen_containers.insert(container.id());
        mcqs.extend(extract_math_container(dom, scope, claimed, container));
    }

    mcqs
}

fn extract_math_container(
    dom: &PageDom,
    scope: usize,
    claimed: &mut ClaimedSet,
    container: ElementRef<'_>,
) -> Vec<Mcq> {
    let title_sel = sel(".question-text, .stem, h3, h4, p");
    let mut found = patterns::scan_container(dom, scope, claimed, container, title_sel.as_ref());

    for mcq in &mut found {
        mcq.question = format!("[Math Question] {}", leading_text(&mcq.question, 100));
    }
    found
}

/// 文本是否带有数学特征
fn looks_mathy(text: &str) -> bool {
    if text.chars().any(|c| MATH_SYMBOLS.contains(&c)) {
        return true;
    }
    MATH_PATTERNS.iter().any(|p| p.is_match(text))
}
