//! 本地识别后端的 OCR 适配器
//!
//! 对着识别服务器的 HTTP 接口：请求带 data URI 图片与语言，
//! 响应为 `{success, text, confidence, words?, error?}`。

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{OcrEngine, OcrOutcome, OcrRequest, OcrWord};
use async_trait::async_trait;

const MAX_RETRIES: usize = 3;

/// 识别服务器响应
#[derive(Debug, Deserialize)]
struct OcrResponse {
    success: bool,
    #[serde(default)]
    text: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    words: Option<Vec<OcrWord>>,
    #[serde(default)]
    error: Option<String>,
}

pub struct RemoteOcrService {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteOcrService {
    pub fn new(base_url: &str) -> Self {
        RemoteOcrService {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/ocr", self.base_url)
    }

    fn parse_response(resp: OcrResponse) -> Result<OcrOutcome> {
        if !resp.success {
            anyhow::bail!(
                "OCR 服务返回失败: {}",
                resp.error.unwrap_or_else(|| "未知错误".to_string())
            );
        }
        Ok(OcrOutcome {
            text: resp.text,
            confidence: resp.confidence,
            words: resp.words,
        })
    }
}

#[async_trait]
impl OcrEngine for RemoteOcrService {
    async fn recognize(&self, req: &OcrRequest) -> Result<OcrOutcome> {
        let payload = json!({
            "image": req.image,
            "language": req.language,
            "detect_bounds": req.want_bounding_boxes,
        });

        let mut last_error = None;
        for attempt in 1..=MAX_RETRIES {
            info!(
                "发送 OCR 识别请求 (尝试 {}/{}): language={}, bounds={}",
                attempt, MAX_RETRIES, req.language, req.want_bounding_boxes
            );

            let result = self
                .client
                .post(self.endpoint())
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: OcrResponse = resp.json().await?;
                    return Self::parse_response(parsed);
                }
                Ok(resp) => {
                    warn!("OCR 服务 HTTP 错误: {}", resp.status());
                    last_error = Some(anyhow::anyhow!("OCR 服务 HTTP 错误: {}", resp.status()));
                }
                Err(e) => {
                    warn!("OCR 请求失败 (第 {}/{} 次): {}", attempt, MAX_RETRIES, e);
                    last_error = Some(e.into());
                }
            }

            if attempt < MAX_RETRIES {
                tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("OCR 识别失败: 重试耗尽")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        let service = RemoteOcrService::new("http://localhost:5000/");
        assert_eq!(service.endpoint(), "http://localhost:5000/api/ocr");
    }

    #[test]
    fn test_parse_success_response() {
        let resp: OcrResponse = serde_json::from_str(
            r#"{"success":true,"text":"What is 2+2?","confidence":0.93}"#,
        )
        .unwrap();
        let outcome = RemoteOcrService::parse_response(resp).unwrap();
        assert_eq!(outcome.text, "What is 2+2?");
        assert!(outcome.words.is_none());
    }

    #[test]
    fn test_parse_failure_response() {
        let resp: OcrResponse =
            serde_json::from_str(r#"{"success":false,"error":"capture not permitted"}"#).unwrap();
        let err = RemoteOcrService::parse_response(resp).unwrap_err();
        assert!(err.to_string().contains("capture not permitted"));
    }

    /// 需要本地识别服务器
    #[tokio::test]
    #[ignore]
    async fn test_recognize_roundtrip() {
        let service = RemoteOcrService::new("http://localhost:5000");
        let req = OcrRequest {
            image: "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==".to_string(),
            language: "eng".to_string(),
            want_bounding_boxes: true,
        };
        let outcome = service.recognize(&req).await.expect("识别失败");
        println!("OCR 文本: {}", outcome.text);
    }
}
