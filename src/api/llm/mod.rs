//! LLM 预测适配器边界
//!
//! 核心只关心契约：「题干 + 选项（+ 可选题图）进，自由文本答案出」。
//! 答案不做任何格式约束，对齐到选项集是匹配器的事。

pub mod service;

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;

/// 预测请求
#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub question: String,
    pub options: Vec<String>,
    /// 题干图片，data URI；仅图片题携带
    pub image: Option<String>,
}

/// 答案预测契约；失败统一走 Err
#[async_trait]
pub trait AnswerPredictor: Send + Sync {
    async fn predict(&self, req: &PredictRequest) -> Result<String>;
}
