//! LLM API 客户端
//!
//! 封装与文本生成服务的交互。兼容 OpenAI API 的服务（Gemini, Azure, Doubao 等）
//! 都可以通过 `LLM_API_BASE_URL` 接入。
//!
//! 每次调用只发一个 HTTP 请求：限流、服务端错误都原样返回给调用方，
//! 错误文本以状态码开头（如 `429 Too Many Requests: ...`），退避由编排器负责。

use std::time::Duration;

use anyhow::Context;
use async_openai::{
    config::{Config as _, OpenAIConfig},
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GenerationError;

/// 系统消息：约束输出为纯 JSON
const SYSTEM_MESSAGE: &str =
    "You are a helpful assistant for a crossword game. Always answer with valid JSON only.";

/// 文本生成能力
///
/// 一次调用对应一次请求，不做重试。错误只保留文本描述。
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// LLM 客户端
pub struct LlmClient {
    http: reqwest::Client,
    openai_config: OpenAIConfig,
    model_name: String,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(config.llm_api_base_url.trim_end_matches('/'));

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .context("无法创建 HTTP 客户端")?;

        Ok(Self {
            http,
            openai_config,
            model_name: config.llm_model_name.clone(),
        })
    }

    fn build_request(&self, prompt: &str) -> anyhow::Result<CreateChatCompletionRequest> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_MESSAGE)
            .build()?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.3)
            .max_tokens(1024u32)
            .build()?;
        Ok(request)
    }

    async fn send(&self, prompt: &str) -> anyhow::Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("提示词长度: {} 字符", prompt.len());

        let request = self.build_request(prompt)?;
        let response = self
            .http
            .post(self.openai_config.url("/chat/completions"))
            .headers(self.openai_config.headers())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            anyhow::bail!("{}: {}", status, body.trim());
        }

        let response: CreateChatCompletionResponse = response.json().await?;
        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.send(prompt).await.map_err(|e| {
            warn!("LLM API 调用失败: {:#}", e);
            GenerationError::new(format!("{:#}", e))
        })
    }
}
