//! 图片题扫描器
//!
//! 两种形态：选项本身是图片（取 alt / 文件名作派生说明），
//! 以及题干带图、选项为文本（记下图片地址供预测时携带）。

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::ElementRef;

use crate::app::dom::{closest, PageDom};
use crate::app::scan::option_text::image_option_text;
use crate::app::scan::question::resolve_group_question_text;
use crate::app::scan::{patterns, sel, ClaimedSet, Mcq, McqKind, McqOption};
use crate::app::text::clean_text;

const QUESTION_CONTAINER_SELECTOR: &str = ".question, .mcq, .quiz-question, form, fieldset";

pub fn scan(dom: &PageDom, scope: usize, claimed: &mut ClaimedSet) -> Vec<Mcq> {
    let mut mcqs = Vec::new();
    let mut seen_containers: HashSet<NodeId> = HashSet::new();

    let doc = match dom.scope(scope) {
        Some(doc) => doc,
        None => return mcqs,
    };
    let Some(container_sel) = sel(QUESTION_CONTAINER_SELECTOR) else {
        return mcqs;
    };

    // 形态一：图片作选项
    if let Some(option_img_sel) = sel(".option img, .choice img, li img, label img") {
        let imgs: Vec<ElementRef<'_>> = doc.select(&option_img_sel).collect();
        for img in imgs {
            let Some(container) = closest(img, &container_sel) else {
                continue;
            };
            if !seen_containers.insert(container.id()) {
                continue;
            }
            if let Some(mcq) = image_option_mcq(dom, scope, claimed, container) {
                mcqs.push(mcq);
            }
        }
    }

    // 形态二：题干带图
    if let Some(question_img_sel) = sel(".question img, .quiz-question img, .stem img") {
        let imgs: Vec<ElementRef<'_>> = doc.select(&question_img_sel).collect();
        for img in imgs {
            if claimed.contains(&dom.handle_of(scope, img)) {
                continue;
            }
            let Some(container) = closest(img, &container_sel) else {
                continue;
            };
            if !seen_containers.insert(container.id()) {
                continue;
            }
            mcqs.extend(image_question_mcqs(dom, scope, claimed, container, img));
        }
    }

    mcqs
}

/// 容器内 >= 2 张图片，每张图是一个选项
fn image_option_mcq(
    dom: &PageDom,
    scope: usize,
    claimed: &mut ClaimedSet,
    container: ElementRef<'_>,
) -> Option<Mcq> {
    let img_sel = sel("img")?;

    let imgs: Vec<ElementRef<'_>> = container
        .select(&img_sel)
        .filter(|i| !claimed.contains(&dom.handle_of(scope, *i)))
        .collect();
    if imgs.len() < 2 {
        return None;
    }

    let mut options = Vec::new();
    for img in &imgs {
        let text = clean_text(&image_option_text(*img));
        options.push(McqOption::image(text, Some(dom.handle_of(scope, *img))));
    }
    // 派生说明全空的图片组没法交给模型判断
    if options.iter().filter(|o| !o.text.is_empty()).count() < 2 {
        return None;
    }
    options.retain(|o| !o.text.is_empty());

    let mut question = resolve_group_question_text(dom, scope, container, &[]);
    if question.is_empty() {
        question = "Question with image options".to_string();
    }

    for img in &imgs {
        claimed.insert(dom.handle_of(scope, *img));
    }

    Some(Mcq::new(question, options, McqKind::Image, false))
}

/// 题干带图：文本选项照常抽取，图片地址挂到题上随预测请求携带
fn image_question_mcqs(
    dom: &PageDom,
    scope: usize,
    claimed: &mut ClaimedSet,
    container: ElementRef<'_>,
    img: ElementRef<'_>,
) -> Vec<Mcq> {
    let title_sel = sel(".question-text, .stem, h3, h4, p");
    let mut found = patterns::scan_container(dom, scope, claimed, container, title_sel.as_ref());

    let src = img.value().attr("src").map(str::to_string);
    for mcq in &mut found {
        if mcq.question.is_empty() {
            mcq.question = img
                .value()
                .attr("alt")
                .map(str::to_string)
                .unwrap_or_else(|| "Question with image".to_string());
        }
        mcq.question = format!("[Image Question] {}", mcq.question);
        mcq.question_image = src.clone();
    }
    found
}
