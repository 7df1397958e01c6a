use anyhow::Context;
use config::{Config, FileFormat};
use serde::Deserialize;

/// 应用配置
///
/// 一次性加载为不可变值，由 main 显式传入各组件。
/// 扫描过程中不允许就地修改；重新配置 = 重新加载 + 重新传入。
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    // --- LLM 服务（OpenAI 兼容接口） ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,

    // --- OCR 后端服务 ---
    #[serde(default = "default_ocr_backend_url")]
    pub ocr_backend_url: String,

    // --- 页面快照来源 ---
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    // --- 检测开关 ---
    #[serde(default = "default_true")]
    pub dom_detection: bool,
    #[serde(default = "default_true")]
    pub ocr_enabled: bool,
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    #[serde(default = "default_true")]
    pub shadow_dom_detection: bool,
    #[serde(default = "default_true")]
    pub image_detection: bool,
    #[serde(default = "default_true")]
    pub math_detection: bool,

    /// 自定义容器选择器，按行分隔
    #[serde(default)]
    pub custom_selectors: String,

    // --- 作答行为 ---
    /// false 时流程止于匹配，不触发任何 DOM 动作
    #[serde(default = "default_true")]
    pub auto_answer: bool,
    /// 作答前随机延迟下界（秒）
    #[serde(default = "default_answer_delay")]
    pub answer_delay: f64,
    /// 作答前随机延迟上界（秒）
    #[serde(default = "default_max_answer_delay")]
    pub max_answer_delay: f64,
    /// LLM 预测的最大重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// 同一轮扫描内相邻题目的处理间隔（毫秒）
    #[serde(default = "default_process_stagger_ms")]
    pub process_stagger_ms: u64,

    // --- 启发式阈值 ---
    /// 模糊匹配相似度下限，须严格大于该值才接受
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// OCR 文本中题目行之后向前扫描的最大行数
    #[serde(default = "default_ocr_lookahead_lines")]
    pub ocr_lookahead_lines: usize,
}

fn default_ocr_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_pages_dir() -> String {
    "pages".to_string()
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_true() -> bool {
    true
}

fn default_answer_delay() -> f64 {
    3.0
}

fn default_max_answer_delay() -> f64 {
    6.0
}

fn default_max_retries() -> usize {
    3
}

fn default_process_stagger_ms() -> u64 {
    1000
}

fn default_fuzzy_threshold() -> f64 {
    crate::app::matcher::DEFAULT_FUZZY_THRESHOLD
}

fn default_ocr_lookahead_lines() -> usize {
    crate::app::ocr_extract::DEFAULT_LOOKAHEAD_LINES
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config: AppConfig = Config::builder()
            .add_source(
                config::File::with_name("application")
                    .format(FileFormat::Yaml)
                    .required(true),
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .try_parsing(true)
                    .separator("_")
                    .list_separator(","),
            )
            .build()
            .with_context(|| anyhow::anyhow!("Failed to load config"))?
            .try_deserialize()
            .with_context(|| anyhow::anyhow!("Failed to deserialize config"))?;

        Ok(config)
    }

    /// 解析用户提供的自定义选择器列表（去空行、去首尾空白）
    pub fn custom_selector_list(&self) -> Vec<&str> {
        self.custom_selectors
            .lines()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// 作答延迟区间，保证上界不小于下界
    pub fn answer_delay_range(&self) -> (f64, f64) {
        let lo = self.answer_delay.max(0.0);
        let hi = self.max_answer_delay.max(lo);
        (lo, hi)
    }
}
