//! 聚合与去重
//!
//! 按固定优先级跑所有启用的扫描器（原生控件在前，结构/shadow/自定义
//! 次之，列表、图片随后，OCR 垫底），同一轮内按检测键去重：
//! 结构上更可靠的来源先产出，赢下去重。
//! 对未变化的 DOM 重复执行是幂等的（answered 反映调用时的控件状态）。

use std::collections::HashSet;

use tracing::debug;

use crate::api::ocr::OcrOutcome;
use crate::app::dom::PageDom;
use crate::app::driver::PointLocator;
use crate::app::ocr_extract;
use crate::app::scan::{checkbox, image, list, math, patterns, radio, select};
use crate::app::scan::{ClaimedSet, Mcq};
use crate::app::text::is_answer_key_artifact;
use crate::config::AppConfig;

/// 跑一轮完整检测，产出去重后的候选题列表
pub fn aggregate(
    dom: &PageDom,
    cfg: &AppConfig,
    ocr: Option<&OcrOutcome>,
    locator: Option<&dyn PointLocator>,
) -> Vec<Mcq> {
    let mut raw = Vec::new();
    let mut claimed = ClaimedSet::new();

    let scope_limit = if cfg.shadow_dom_detection {
        dom.scope_count()
    } else {
        1
    };

    if cfg.dom_detection {
        // 原生表单控件优先
        for scope in 0..scope_limit {
            raw.extend(radio::scan(dom, scope, &mut claimed));
        }
        for scope in 0..scope_limit {
            raw.extend(checkbox::scan(dom, scope, &mut claimed));
        }
        for scope in 0..scope_limit {
            raw.extend(select::scan(dom, scope, &mut claimed));
        }

        // 结构容器与自定义选择器
        for scope in 0..scope_limit {
            raw.extend(patterns::scan(dom, scope, &mut claimed));
        }
        let custom = cfg.custom_selector_list();
        if !custom.is_empty() {
            for scope in 0..scope_limit {
                raw.extend(patterns::scan_custom(dom, scope, &mut claimed, &custom));
            }
        }
        if cfg.math_detection {
            for scope in 0..scope_limit {
                raw.extend(math::scan(dom, scope, &mut claimed));
            }
        }

        // 列表与图片
        for scope in 0..scope_limit {
            raw.extend(list::scan(dom, scope, &mut claimed));
        }
        if cfg.image_detection {
            for scope in 0..scope_limit {
                raw.extend(image::scan(dom, scope, &mut claimed));
            }
        }
    }

    // OCR 兜底，最后参与去重
    if cfg.ocr_enabled {
        if let Some(outcome) = ocr {
            raw.extend(ocr_extract::extract_from_text(
                &outcome.text,
                cfg.ocr_lookahead_lines,
            ));
            if let Some(words) = &outcome.words {
                raw.extend(ocr_extract::extract_from_words(
                    words,
                    cfg.ocr_lookahead_lines,
                    locator,
                ));
            }
        }
    }

    finalize(raw)
}

/// 答案键残留过滤 + 有效性复核 + 检测键去重
fn finalize(raw: Vec<Mcq>) -> Vec<Mcq> {
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut mcqs = Vec::new();

    for mut mcq in raw {
        // 先剔除答案键残留，再做数量判定：残留不能拖垮一道本来有效的题
        mcq.options
            .retain(|o| !is_answer_key_artifact(&o.text));

        if mcq.options.len() < 2 {
            debug!(
                "剔除残留后有效选项不足 2 个，丢弃: {:?} {}",
                mcq.kind, mcq.question
            );
            continue;
        }

        let key = mcq.detection_key();
        if !seen_keys.insert(key) {
            debug!("重复检测键，保留先到者，丢弃 {:?} 来源", mcq.kind);
            continue;
        }

        mcqs.push(mcq);
    }

    mcqs
}
