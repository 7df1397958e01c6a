//! LLM 服务测试模块

use async_openai::{Client, config::OpenAIConfig};

use super::service::LlmService;
use super::{AnswerPredictor, PredictRequest};
use crate::app::logger;

/// 创建测试用的 LlmService
fn create_test_service() -> LlmService {
    let config = OpenAIConfig::new()
        .with_api_key("test-key")
        .with_api_base("http://localhost:8000/v1");

    let client = Client::with_config(config);

    LlmService {
        client,
        model_name: "gpt-4o-mini".to_string(),
    }
}

#[test]
fn test_predict_prompt_numbers_options() {
    let prompt = LlmService::build_predict_prompt(
        "What is the capital of France?",
        &["Paris".to_string(), "Lisbon".to_string()],
    );

    assert!(prompt.contains("Question: What is the capital of France?"));
    assert!(prompt.contains("1. Paris"));
    assert!(prompt.contains("2. Lisbon"));
    // 指令必须要求只输出答案本体
    assert!(prompt.contains("Do not explain your reasoning"));
}

#[test]
fn test_predict_prompt_empty_options() {
    let prompt = LlmService::build_predict_prompt("Anything?", &[]);
    assert!(prompt.contains("Options:\n\n"));
}

/// 测试通用 LLM 调用（需要可用的后端）
#[tokio::test]
#[ignore]
async fn test_send_to_llm_simple() {
    logger::init_test();

    let service = create_test_service();

    let result = service
        .send_to_llm("用一句话介绍你自己", Some("你是一个简洁的助手。"), None)
        .await;

    match result {
        Ok(response) => {
            println!("\n========== LLM 响应 ==========");
            println!("{}", response);
            println!("==============================\n");
            assert!(!response.is_empty());
        }
        Err(e) => {
            panic!("LLM 调用失败: {}", e);
        }
    }
}

/// 测试完整预测链路（需要可用的后端）
#[tokio::test]
#[ignore]
async fn test_predict_roundtrip() {
    logger::init_test();

    let service = create_test_service();
    let req = PredictRequest {
        question: "What is 2+2?".to_string(),
        options: vec!["3".to_string(), "4".to_string(), "5".to_string()],
        image: None,
    };

    let answer = service.predict(&req).await.expect("预测失败");
    println!("预测答案: {}", answer);
    assert!(!answer.is_empty());
}

/// 测试 Vision 请求构造（需要可用的后端）
#[tokio::test]
#[ignore]
async fn test_predict_with_image() {
    logger::init_test();

    let service = create_test_service();
    let req = PredictRequest {
        question: "图中显示的是哪个城市的地标？".to_string(),
        options: vec!["巴黎".to_string(), "伦敦".to_string()],
        image: Some("data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==".to_string()),
    };

    let result = service.predict(&req).await;
    match result {
        Ok(answer) => println!("预测答案: {}", answer),
        Err(e) => println!("Vision 调用失败: {}", e),
    }
}
