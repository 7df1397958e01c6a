//! 题图获取与编码
//!
//! 把题干图片下载下来、压到模型友好的尺寸，再编成 data URI
//! 随预测请求一起携带。下载失败只影响当前这道题。

use std::io::Cursor;

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose};
use image::ImageFormat;
use tracing::{debug, warn};

/// 送入视觉模型前的最大宽度，超过就等比缩小
const MAX_IMAGE_WIDTH: u32 = 1024;

const MAX_RETRIES: usize = 3;

/// 下载图片并编码为 data URI
///
/// 已经是 data URI 的地址原样返回；能解码的图片统一重编为 JPEG
/// （顺带压尺寸），解码不了的按原始字节 + 响应声明的 MIME 兜底。
pub async fn fetch_image_as_data_uri(url: &str) -> Result<String> {
    if url.starts_with("data:") {
        // 原样透传前先确认负载可解码，坏 URI 早失败
        decode_data_uri(url)?;
        return Ok(url.to_string());
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let mut last_error = None;
    for attempt in 1..=MAX_RETRIES {
        match download(&client, url).await {
            Ok((bytes, mime)) => return encode(&bytes, &mime),
            Err(e) => {
                warn!("下载题图失败 (第 {}/{} 次): {}", attempt, MAX_RETRIES, e);
                last_error = Some(e);
                if attempt < MAX_RETRIES {
                    tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("下载题图失败: {}", url)))
}

async fn download(client: &reqwest::Client, url: &str) -> Result<(Vec<u8>, String)> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("请求图片失败: {}", url))?;

    if !resp.status().is_success() {
        anyhow::bail!("HTTP 错误: {}", resp.status());
    }

    let mime = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/png")
        .split(';')
        .next()
        .unwrap_or("image/png")
        .to_string();

    let bytes = resp.bytes().await?.to_vec();
    Ok((bytes, mime))
}

/// 解码成功则压尺寸重编 JPEG；失败则按原始字节兜底
fn encode(bytes: &[u8], fallback_mime: &str) -> Result<String> {
    match image::load_from_memory(bytes) {
        Ok(img) => {
            let img = if img.width() > MAX_IMAGE_WIDTH {
                let scale = MAX_IMAGE_WIDTH as f64 / img.width() as f64;
                let height = (img.height() as f64 * scale) as u32;
                debug!("题图过宽，缩至 {}x{}", MAX_IMAGE_WIDTH, height);
                img.resize(
                    MAX_IMAGE_WIDTH,
                    height,
                    image::imageops::FilterType::Triangle,
                )
            } else {
                img
            };

            let mut buf = Vec::new();
            // JPEG 压体积；透明通道在这一步被丢弃，对题图无碍
            img.to_rgb8()
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)?;
            Ok(encode_data_uri(&buf, "image/jpeg"))
        }
        Err(e) => {
            warn!("图片解码失败，按原始字节编码: {}", e);
            Ok(encode_data_uri(bytes, fallback_mime))
        }
    }
}

/// 字节 → data URI
pub fn encode_data_uri(bytes: &[u8], mime: &str) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// 从 data URI 中取出原始字节（OCR 入口用）
pub fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>> {
    let payload = if data_uri.starts_with("data:") {
        data_uri
            .find("base64,")
            .map(|pos| &data_uri[pos + 7..])
            .ok_or_else(|| anyhow::anyhow!("data URI 缺少 base64 负载"))?
    } else {
        data_uri
    };

    general_purpose::STANDARD
        .decode(payload.trim())
        .context("Base64 解码失败")
}
