//! LLM 服务核心实现

use anyhow::Result;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, FinishReason,
        ImageDetail, ImageUrl,
    },
};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{AnswerPredictor, PredictRequest};
use crate::config::AppConfig;

/// LLM 服务
///
/// 职责：
/// - 调用 OpenAI 兼容 API 预测单道题的答案
/// - 只处理单道题，不出现 Vec<Mcq>
/// - 不关心重试与节奏，那是编排器的事
pub struct LlmService {
    pub(crate) client: Client<OpenAIConfig>,
    pub(crate) model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &AppConfig) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 发送消息到 LLM
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        imgs: Option<&[String]>,
    ) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());
        if let Some(img_urls) = imgs {
            debug!("包含 {} 张图片", img_urls.len());
        }

        // 构建消息列表
        let mut messages = Vec::new();

        // 添加系统消息（如果提供）
        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        // 构建用户消息内容（支持图片）
        let user_msg = if let Some(img_urls) = imgs.filter(|u| !u.is_empty()) {
            let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> = Vec::new();

            // 文本部分
            content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: user_message.to_string(),
                },
            ));

            // 图片部分
            for url in img_urls.iter() {
                content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImage {
                        image_url: ImageUrl {
                            url: url.clone(),
                            detail: Some(ImageDetail::Auto),
                        },
                    },
                ));
            }

            debug!("使用 Vision API，包含 {} 张图片", img_urls.len());

            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(
                    content_parts,
                ))
                .build()?
        } else {
            // 纯文本
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()?
        };

        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // 构建请求
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.3)
            .build()?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 网络/协议层错误: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        if let Some(choice) = response.choices.first() {
            debug!("LLM Finish Reason: {:?}", choice.finish_reason);
            if let Some(reason) = &choice.finish_reason {
                if matches!(reason, FinishReason::ContentFilter) {
                    return Err(anyhow::anyhow!("请求被 AI 内容风控拦截"));
                }
            }
        }

        // 提取响应内容
        let raw_content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        if raw_content.trim().is_empty() {
            warn!(
                "LLM 返回内容为空! Raw length: {}, Bytes: {:?}",
                raw_content.len(),
                raw_content.as_bytes()
            );
            return Err(anyhow::anyhow!("LLM 返回了空字符串/纯空白"));
        }

        Ok(raw_content.trim().to_string())
    }

    /// 拼装答题提示词：选项编号 + 仅输出答案的指令
    pub(crate) fn build_predict_prompt(question: &str, options: &[String]) -> String {
        let options_text = options
            .iter()
            .enumerate()
            .map(|(i, opt)| format!("{}. {}", i + 1, opt))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Question: {question}\n\n\
             Options:\n{options_text}\n\n\
             Instructions:\n\
             1. Analyze the question and options carefully.\n\
             2. Select the most accurate answer.\n\
             3. Respond ONLY with the letter or number of the correct option, or the exact text of the correct option.\n\
             4. If multiple answers are correct, list all correct options separated by commas.\n\
             5. Do not explain your reasoning, just provide the answer.\n"
        )
    }
}

#[async_trait]
impl AnswerPredictor for LlmService {
    async fn predict(&self, req: &PredictRequest) -> Result<String> {
        let prompt = Self::build_predict_prompt(&req.question, &req.options);

        let imgs: Option<Vec<String>> = req.image.clone().map(|i| vec![i]);
        let answer = self
            .send_to_llm(&prompt, None, imgs.as_deref())
            .await?;

        debug!("LLM 预测答案: {}", answer);
        Ok(answer)
    }
}
