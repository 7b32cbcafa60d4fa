//! 提示服务 - 业务能力层
//!
//! 玩家针对某个未解出的词提问，由 LLM 在不泄露答案的前提下回答。

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clients::TextGenerator;
use crate::error::ApiError;

/// 之前的一轮问答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintExchange {
    pub question: String,
    pub answer: String,
}

/// 提示请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintRequest {
    pub word: String,
    pub question: String,
    #[serde(default)]
    pub context: Vec<HintExchange>,
}

/// 提示回答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintAnswer {
    pub answer: String,
}

/// 提示服务
pub struct HintService {
    generator: Arc<dyn TextGenerator>,
}

impl HintService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn get_hint(&self, request: &HintRequest) -> Result<HintAnswer, ApiError> {
        if request.word.trim().is_empty() {
            return Err(ApiError::BadRequest("word must not be empty".to_string()));
        }
        if request.question.trim().is_empty() {
            return Err(ApiError::BadRequest("question must not be empty".to_string()));
        }

        let prompt = build_hint_prompt(request);
        let result = async {
            let text = self.generator.generate(&prompt).await?;
            let payload = crate::services::caller::parse_payload(&text)
                .context("提示回答不是 JSON 对象")?;
            let answer: HintAnswer = serde_json::from_value(payload.into())
                .context("提示回答缺少 answer 字段")?;
            anyhow::Ok(answer)
        }
        .await;

        match result {
            Ok(answer) => {
                info!("💡 [词 {}] 提示已生成", request.word);
                Ok(answer)
            }
            Err(e) => {
                warn!("⚠️ [词 {}] 提示生成失败: {:#}", request.word, e);
                Err(ApiError::Internal(e))
            }
        }
    }
}

fn build_hint_prompt(request: &HintRequest) -> String {
    let history = if request.context.is_empty() {
        "(none)".to_string()
    } else {
        request
            .context
            .iter()
            .map(|exchange| format!("Q: {}\nA: {}", exchange.question, exchange.answer))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are the host of a crossword game. The hidden answer is "{word}".
A player asks a question about the hidden answer. Reply with "yes", "no" or "notApplicable".
Never reveal the answer or any of its letters.

Previous questions:
{history}

Question: {question}

Respond with ONLY valid JSON: {{"answer": "<yes|no|notApplicable>"}}"#,
        word = request.word,
        history = history,
        question = request.question,
    )
}
