//! 扫描-作答总编排
//!
//! 两种驱动方式：
//! - `run`：离线模式，逐个处理快照目录下的页面文件；
//! - `run_loop`：在线模式，由 DOM 变更/手动触发事件驱动重扫，
//!   触发会被合并——一轮扫描进行中绝不重入，期间攒下的触发
//!   合并成下一轮。
//!
//! 同一轮内的题目串行处理并按序号递增加间隔，尊重宿主平台的
//! 截图/请求配额。

use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::fetch_img::encode_data_uri;
use crate::api::llm::AnswerPredictor;
use crate::api::llm::service::LlmService;
use crate::api::ocr::{OcrEngine, OcrOutcome, OcrRequest};
use crate::api::ocr::remote::RemoteOcrService;
use crate::app::dom::PageDom;
use crate::app::driver::{LogDriver, PageDriver, PointLocator};
use crate::app::scan::aggregate::aggregate;
use crate::app::stats::Stats;
use crate::app::workflow::McqCtx;
use crate::app::workflow::process_single::process_single_mcq;
use crate::app::workflow::process_single::result::{McqOutcome, StepError};
use crate::config::AppConfig;

/// 重扫触发来源
#[allow(dead_code)] // 在线模式供宿主集成方使用，离线二进制不触达
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTrigger {
    /// 宿主页面的 DOM 变更通知
    Mutation,
    /// 用户显式触发
    Manual,
}

/// 在线模式每轮拿到的页面快照
#[allow(dead_code)]
pub struct PageSnapshot {
    pub html: String,
    /// 可选的整页截图（data URI），有它才走 OCR 路径
    pub screenshot: Option<String>,
}

/// 离线模式：处理快照目录下的所有 .html 文件
pub async fn run(config: &AppConfig) -> Result<()> {
    let entries = std::fs::read_dir(&config.pages_dir)
        .with_context(|| format!("读取页面目录失败: {}", config.pages_dir))?;

    let llm_service = LlmService::new(config);
    let ocr_service = RemoteOcrService::new(&config.ocr_backend_url);
    let mut driver = LogDriver;
    let mut stats = Stats::default();

    let mut page_index = 0usize;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("html") {
            continue;
        }

        page_index += 1;
        info!("开始处理页面: {:?}", path);

        if let Err(e) = process_page(
            config,
            &path,
            page_index,
            &llm_service,
            Some(&ocr_service),
            &mut driver,
            &mut stats,
        )
        .await
        {
            error!("页面 {:?} 处理失败，跳过。错误: {:?}", path, e);
        }
    }

    info!(
        "全部页面处理完成 - 页面: {}, 最近发现: {}, 已作答: {}, 参考正确率: {}%",
        page_index, stats.found, stats.answered, stats.accuracy
    );

    Ok(())
}

/// 处理单个页面快照文件
async fn process_page<D: PageDriver>(
    config: &AppConfig,
    path: &Path,
    page_index: usize,
    llm: &dyn AnswerPredictor,
    ocr: Option<&dyn OcrEngine>,
    driver: &mut D,
    stats: &mut Stats,
) -> Result<()> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("读取页面快照失败: {:?}", path))?;

    let page_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    // 同名 .png 是该页面的截图，存在才有 OCR 可做
    let screenshot = {
        let png_path = path.with_extension("png");
        if png_path.exists() {
            match std::fs::read(&png_path) {
                Ok(bytes) => Some(encode_data_uri(&bytes, "image/png")),
                Err(e) => {
                    warn!("读取截图失败，OCR 路径跳过: {:?} ({})", png_path, e);
                    None
                }
            }
        } else {
            None
        }
    };

    let dom = PageDom::parse(&html);
    let ocr_outcome = recognize_screenshot(config, ocr, screenshot.as_deref()).await;

    scan_pass(
        config,
        &dom,
        ocr_outcome.as_ref(),
        &page_id,
        page_index,
        llm,
        driver,
        stats,
    )
    .await;

    Ok(())
}

/// 在线模式：事件驱动的重扫循环
///
/// 触发合并语义：进入一轮扫描前先把积压的触发全部吸掉，
/// 扫描进行中到达的触发会留在通道里，变成紧随其后的下一轮。
#[allow(dead_code)]
pub async fn run_loop<D, F>(
    config: &AppConfig,
    llm: &dyn AnswerPredictor,
    ocr: Option<&dyn OcrEngine>,
    driver: &mut D,
    stats: &mut Stats,
    mut triggers: mpsc::Receiver<ScanTrigger>,
    snapshot: F,
) -> Result<()>
where
    D: PageDriver,
    F: Fn() -> Result<PageSnapshot>,
{
    let mut pass_index = 0usize;

    while let Some(trigger) = triggers.recv().await {
        let coalesced = drain_pending(&mut triggers);
        if coalesced > 0 {
            debug!("合并了 {} 个积压触发", coalesced);
        }

        pass_index += 1;
        debug!("第 {} 轮扫描，触发: {:?}", pass_index, trigger);

        let page = match snapshot() {
            Ok(page) => page,
            Err(e) => {
                warn!("获取页面快照失败，本轮跳过: {:?}", e);
                continue;
            }
        };

        let dom = PageDom::parse(&page.html);
        let ocr_outcome = recognize_screenshot(config, ocr, page.screenshot.as_deref()).await;

        scan_pass(
            config,
            &dom,
            ocr_outcome.as_ref(),
            "live",
            pass_index,
            llm,
            driver,
            stats,
        )
        .await;
    }

    Ok(())
}

/// 吸干通道里积压的触发，返回吸掉的数量
#[allow(dead_code)]
fn drain_pending(triggers: &mut mpsc::Receiver<ScanTrigger>) -> usize {
    let mut n = 0;
    while triggers.try_recv().is_ok() {
        n += 1;
    }
    n
}

/// 截图 → OCR 结果；OCR 失败只断送 OCR 路径，结构化检测照常
async fn recognize_screenshot(
    config: &AppConfig,
    ocr: Option<&dyn OcrEngine>,
    screenshot: Option<&str>,
) -> Option<OcrOutcome> {
    if !config.ocr_enabled {
        return None;
    }
    let engine = ocr?;
    let image = screenshot?;

    let request = OcrRequest {
        image: image.to_string(),
        language: config.ocr_language.clone(),
        want_bounding_boxes: true,
    };

    match engine.recognize(&request).await {
        Ok(outcome) => {
            debug!(
                "OCR 完成: {} 字符, 置信度 {:.2}",
                outcome.text.len(),
                outcome.confidence
            );
            Some(outcome)
        }
        Err(e) => {
            warn!("OCR 识别失败，仅走结构化检测: {:?}", e);
            None
        }
    }
}

/// 一轮完整的"检测 → 逐题处理"
#[allow(clippy::too_many_arguments)]
async fn scan_pass<D: PageDriver>(
    config: &AppConfig,
    dom: &PageDom,
    ocr_outcome: Option<&OcrOutcome>,
    page_id: &str,
    page_index: usize,
    llm: &dyn AnswerPredictor,
    driver: &mut D,
    stats: &mut Stats,
) {
    let locator: &dyn PointLocator = &*driver;
    let mut mcqs = aggregate(dom, config, ocr_outcome, Some(locator));

    stats.record_scan(mcqs.len());
    info!("页面 {} 发现 {} 道候选题", page_id, mcqs.len());

    let mut processed = 0usize;
    for (index, mcq) in mcqs.iter_mut().enumerate() {
        if mcq.answered {
            debug!("第 {} 题已有选中态，跳过", index + 1);
            continue;
        }

        // 串行错峰：按序号递增间隔，不要一口气打满宿主配额
        if processed > 0 && config.process_stagger_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(config.process_stagger_ms))
                .await;
        }
        processed += 1;

        let ctx = McqCtx {
            page_id: page_id.to_string(),
            page_index,
            mcq_index: index + 1,
            kind: mcq.kind,
        };
        let prefix = ctx.log_prefix();

        match process_single_mcq(mcq, &ctx, config, dom, llm, driver).await {
            Ok(McqOutcome::Selected {
                answer,
                tier,
                selected,
            }) => {
                stats.record_answered();
                info!(
                    "{} 作答完成 | answer={} | tier={} | 动作数={}",
                    prefix,
                    answer,
                    tier.as_str(),
                    selected
                );
            }
            Ok(McqOutcome::Matched {
                answer,
                tier,
                matched,
            }) => {
                info!(
                    "{} 匹配完成（未作答）| answer={} | tier={} | 命中={}",
                    prefix,
                    answer,
                    tier.as_str(),
                    matched
                );
            }
            Err(StepError::NoMatch { answer }) => {
                // 已写入 failed_mcqs 通道，这里只留观测日志
                info!("{} 放弃：答案无法对齐 | answer={}", prefix, answer);
            }
            Err(e) => {
                warn!("{} 处理失败: {:?}", prefix, e);
            }
        }
    }

    let resolved = mcqs.iter().filter(|m| m.resolved_answer.is_some()).count();
    info!(
        "本轮处理完成 - 发现: {}, 本轮回填答案: {}, 累计作答: {}, 参考正确率: {}%",
        stats.found, resolved, stats.answered, stats.accuracy
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::llm::PredictRequest;
    use crate::app::driver::{DriverAction, RecordingDriver};
    use crate::config;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPredictor(String);

    #[async_trait]
    impl AnswerPredictor for FixedPredictor {
        async fn predict(&self, _req: &PredictRequest) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn test_cfg() -> AppConfig {
        let mut cfg = config::tests::minimal();
        cfg.answer_delay = 0.0;
        cfg.max_answer_delay = 0.0;
        cfg.process_stagger_ms = 0;
        cfg
    }

    #[tokio::test]
    async fn test_scan_pass_answers_and_updates_stats() {
        let dom = PageDom::parse(
            r#"<p>Which city is the capital of France?</p>
               <input type="radio" name="q" id="a"><label for="a">Paris</label>
               <input type="radio" name="q" id="b"><label for="b">Lisbon</label>"#,
        );
        let cfg = test_cfg();
        let llm = FixedPredictor("Paris".to_string());
        let mut driver = RecordingDriver::default();
        let mut stats = Stats::default();

        scan_pass(&cfg, &dom, None, "p1", 1, &llm, &mut driver, &mut stats).await;

        assert_eq!(stats.found, 1);
        assert_eq!(stats.answered, 1);
        assert_eq!(driver.actions.len(), 1);
        assert!(matches!(driver.actions[0], DriverAction::Click(_)));
    }

    #[tokio::test]
    async fn test_scan_pass_skips_answered_mcqs() {
        let dom = PageDom::parse(
            r#"<p>Which option was already chosen here?</p>
               <input type="radio" name="q" id="a" checked><label for="a">Done</label>
               <input type="radio" name="q" id="b"><label for="b">Other</label>"#,
        );
        let cfg = test_cfg();
        let llm = FixedPredictor("Done".to_string());
        let mut driver = RecordingDriver::default();
        let mut stats = Stats::default();

        scan_pass(&cfg, &dom, None, "p1", 1, &llm, &mut driver, &mut stats).await;

        assert_eq!(stats.found, 1);
        assert_eq!(stats.answered, 0);
        assert!(driver.actions.is_empty());
    }

    #[tokio::test]
    async fn test_run_loop_coalesces_pending_triggers() {
        let cfg = test_cfg();
        let llm = FixedPredictor("whatever".to_string());
        let mut driver = RecordingDriver::default();
        let mut stats = Stats::default();

        let (tx, rx) = mpsc::channel(8);
        // 循环启动前塞进 3 个触发：应合并成一轮
        tx.send(ScanTrigger::Manual).await.unwrap();
        tx.send(ScanTrigger::Mutation).await.unwrap();
        tx.send(ScanTrigger::Mutation).await.unwrap();
        drop(tx);

        let snapshots = AtomicUsize::new(0);
        run_loop(
            &cfg,
            &llm,
            None,
            &mut driver,
            &mut stats,
            rx,
            || {
                snapshots.fetch_add(1, Ordering::SeqCst);
                Ok(PageSnapshot {
                    html: "<p>nothing here</p>".to_string(),
                    screenshot: None,
                })
            },
        )
        .await
        .unwrap();

        assert_eq!(snapshots.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_loop_survives_snapshot_failure() {
        let cfg = test_cfg();
        let llm = FixedPredictor("x".to_string());
        let mut driver = RecordingDriver::default();
        let mut stats = Stats::default();

        let (tx, rx) = mpsc::channel(4);
        tx.send(ScanTrigger::Manual).await.unwrap();
        drop(tx);

        run_loop(
            &cfg,
            &llm,
            None,
            &mut driver,
            &mut stats,
            rx,
            || anyhow::bail!("页面不可达"),
        )
        .await
        .unwrap();

        assert_eq!(stats.answered, 0);
    }
}
