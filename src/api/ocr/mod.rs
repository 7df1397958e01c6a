//! OCR 适配器边界
//!
//! 核心只定义契约：「图片进、文本（可带词级包围盒）出」。
//! 具体供应商实现在各自子模块，对失败统一返回 Err。

pub mod remote;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 识别请求
#[derive(Debug, Clone, Serialize)]
pub struct OcrRequest {
    /// data URI 形式的图片
    pub image: String,
    /// 识别语言（如 "eng"）
    pub language: String,
    /// 是否需要词级包围盒
    pub want_bounding_boxes: bool,
}

/// 词级包围盒，页面视口坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    /// 盒中心点
    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }
}

/// 单个识别出的词
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    pub bbox: BoundingBox,
}

/// 识别结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrOutcome {
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
    /// 仅在请求了包围盒时出现
    #[serde(default)]
    pub words: Option<Vec<OcrWord>>,
}

/// OCR 引擎契约
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, req: &OcrRequest) -> Result<OcrOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_deserializes_without_words() {
        let outcome: OcrOutcome =
            serde_json::from_str(r#"{"text":"hello","confidence":0.9}"#).unwrap();
        assert_eq!(outcome.text, "hello");
        assert!(outcome.words.is_none());
    }

    #[test]
    fn test_outcome_deserializes_with_words() {
        let outcome: OcrOutcome = serde_json::from_str(
            r#"{"text":"hi","confidence":0.8,
                "words":[{"text":"hi","bbox":{"x0":1.0,"y0":2.0,"x1":11.0,"y1":12.0}}]}"#,
        )
        .unwrap();
        let words = outcome.words.unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].bbox.center(), (6.0, 7.0));
    }
}
