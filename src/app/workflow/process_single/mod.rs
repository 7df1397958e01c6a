//! 单题处理流程
//!
//! 完整流程：题图获取（按需）→ LLM 预测（带重试）→ 答案匹配
//! → 人性化随机延迟 → 按题型触发作答动作。
//! 任何一步失败只影响本题，绝不波及同轮的其他题。

pub(crate) mod result;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::api::fetch_img::fetch_image_as_data_uri;
use crate::api::llm::{AnswerPredictor, PredictRequest};
use crate::app::dom::PageDom;
use crate::app::driver::PageDriver;
use crate::app::matcher::find_matching_options;
use crate::app::scan::{Mcq, McqKind};
use crate::app::workflow::McqCtx;
use crate::app::workflow::process_single::result::{McqOutcome, StepError};
use crate::config::AppConfig;

/// 单题处理主流程
pub async fn process_single_mcq<D: PageDriver>(
    mcq: &mut Mcq,
    ctx: &McqCtx,
    cfg: &AppConfig,
    dom: &PageDom,
    llm: &dyn AnswerPredictor,
    driver: &mut D,
) -> Result<McqOutcome, StepError> {
    let prefix = ctx.log_prefix();
    info!("{} ========== 开始处理题目 ==========", prefix);
    debug!("{} 题干: {}", prefix, mcq.question);

    // === 1. 题图获取（仅图片题） ===
    let image = match &mcq.question_image {
        Some(url) => {
            info!("{} [步骤 1/3] 获取题图", prefix);
            match fetch_image_as_data_uri(url).await {
                Ok(data_uri) => Some(data_uri),
                Err(e) => {
                    warn!("{} 题图获取失败，本轮跳过该题: {:?}", prefix, e);
                    return Err(StepError::ImageFetchFailed(e));
                }
            }
        }
        None => None,
    };

    // === 2. LLM 预测（带重试） ===
    info!("{} [步骤 2/3] 请求答案预测", prefix);
    let image_options = mcq.options.iter().filter(|o| o.is_image).count();
    if image_options > 0 {
        debug!("{} 含 {} 个图片选项，文本为派生说明", prefix, image_options);
    }
    let request = PredictRequest {
        question: mcq.question.clone(),
        options: mcq.option_texts(),
        image,
    };

    let answer = predict_with_retry(llm, &request, cfg.max_retries, &prefix).await?;
    mcq.resolved_answer = Some(answer.clone());

    // === 3. 匹配与作答 ===
    info!("{} [步骤 3/3] 匹配答案: {}", prefix, answer);
    let Some(outcome) = find_matching_options(&mcq.options, &answer, cfg.fuzzy_threshold) else {
        warn!(
            target: "failed_mcqs",
            "{} 答案无法对齐到选项 | page_id={} | idx={} | question={} | answer={}",
            prefix, ctx.page_id, ctx.mcq_index, mcq.question, answer
        );
        return Err(StepError::NoMatch { answer });
    };

    debug!(
        "{} 匹配层: {}，命中 {} 项",
        prefix,
        outcome.tier.as_str(),
        outcome.indices.len()
    );

    if !cfg.auto_answer {
        info!("{} auto_answer 关闭，止于匹配", prefix);
        return Ok(McqOutcome::Matched {
            answer,
            tier: outcome.tier,
            matched: outcome.indices.len(),
        });
    }

    // 人性化随机延迟：必须保持为可配置区间
    let (lo, hi) = cfg.answer_delay_range();
    let delay_secs = {
        let mut rng = rand::thread_rng();
        rng.gen_range(lo..=hi)
    };
    debug!("{} 作答前延迟 {:.2} 秒", prefix, delay_secs);
    tokio::time::sleep(tokio::time::Duration::from_secs_f64(delay_secs)).await;

    let selected = select_options(mcq, &outcome.indices, dom, driver, &prefix)?;

    Ok(McqOutcome::Selected {
        answer,
        tier: outcome.tier,
        selected,
    })
}

/// 预测重试循环；空答案由服务层拦截，这里只管次数
async fn predict_with_retry(
    llm: &dyn AnswerPredictor,
    request: &PredictRequest,
    max_retries: usize,
    prefix: &str,
) -> Result<String, StepError> {
    let attempts = max_retries.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        debug!("{} 预测尝试第 {}/{} 次", prefix, attempt, attempts);
        match llm.predict(request).await {
            Ok(answer) => return Ok(answer),
            Err(e) => {
                warn!("{} 预测失败 (第 {} 次): {}", prefix, attempt, e);
                last_error = e.to_string();
            }
        }
    }

    warn!("{} 重试耗尽，预测失败", prefix);
    Err(StepError::PredictionFailed(last_error))
}

/// 按题型触发作答动作，返回实际动作数
///
/// select 题设置索引并由驱动派发 change 通知，绝不能用点击语义；
/// checkbox 题把命中的选项全部点上；其余题型点第一个有句柄的命中项。
/// OCR 等来源可能没有句柄，此时只能尽力而为，不产生页面动作。
fn select_options<D: PageDriver>(
    mcq: &Mcq,
    indices: &[usize],
    dom: &PageDom,
    driver: &mut D,
    prefix: &str,
) -> Result<usize, StepError> {
    let mut acted = 0usize;

    match mcq.kind {
        McqKind::Select => {
            let Some((select_handle, dom_index)) = indices
                .iter()
                .filter_map(|&i| mcq.options.get(i))
                .filter_map(|o| o.handle)
                .find_map(|h| dom.option_position(h))
            else {
                warn!("{} select 题缺少可定位的选项句柄，放弃作答", prefix);
                return Ok(0);
            };

            driver
                .select_index(select_handle, dom_index)
                .map_err(StepError::SelectionFailed)?;
            acted = 1;
        }
        McqKind::Checkbox => {
            for &i in indices {
                let Some(handle) = mcq.options.get(i).and_then(|o| o.handle) else {
                    continue;
                };
                driver.click(handle).map_err(StepError::SelectionFailed)?;
                acted += 1;
            }
        }
        _ => {
            // 单选语义：只点第一个有句柄的命中项
            if let Some(handle) = indices
                .iter()
                .filter_map(|&i| mcq.options.get(i))
                .find_map(|o| o.handle)
            {
                driver.click(handle).map_err(StepError::SelectionFailed)?;
                acted = 1;
            } else {
                info!("{} 命中项均无控件句柄，仅记录不作答", prefix);
            }
        }
    }

    Ok(acted)
}
