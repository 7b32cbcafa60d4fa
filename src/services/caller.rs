//! 限流感知的调用器 - 业务能力层
//!
//! 只负责"调用一次并归类结果"，不重试、不写存储。
//! 错误归类全部集中在 [`classify_error`]，服务的错误格式变化时只改这里。

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::clients::TextGenerator;
use crate::models::{CallOutcome, FailureKind, SuccessPayload};

/// 限流标记
const RATE_LIMIT_MARKERS: &[&str] = &["RESOURCE_EXHAUSTED", "Too Many Requests"];
/// 安全拒绝 / 前置条件标记
const SAFETY_MARKERS: &[&str] = &["SAFETY", "FAILED_PRECONDITION", "blocked"];

fn status_429() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b429\b").ok()).as_ref()
}

fn code_fence() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").ok()).as_ref()
}

/// 根据错误文本归类失败类型
pub fn classify_error(message: &str) -> FailureKind {
    if status_429().is_some_and(|re| re.is_match(message)) || RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m)) {
        FailureKind::RateLimited
    } else if SAFETY_MARKERS.iter().any(|m| message.contains(m)) {
        FailureKind::SafetyRejected
    } else {
        FailureKind::Other
    }
}

/// 把响应文本解析为 `词 → 内容` 映射
///
/// 允许外层包着 Markdown 代码块。
pub fn parse_payload(text: &str) -> Option<SuccessPayload> {
    let trimmed = text.trim();
    let body = code_fence()
        .and_then(|re| re.captures(trimmed))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    match serde_json::from_str::<JsonValue>(body) {
        Ok(JsonValue::Object(map)) => Some(map),
        Ok(other) => {
            debug!("响应不是 JSON 对象: {}", other);
            None
        }
        Err(e) => {
            debug!("响应 JSON 解析失败: {}", e);
            None
        }
    }
}

/// 调用器
#[derive(Clone)]
pub struct RateLimitedCaller {
    generator: Arc<dyn TextGenerator>,
}

impl RateLimitedCaller {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// 发起一次请求并归类结果
    pub async fn call(&self, prompt: &str) -> CallOutcome {
        match self.generator.generate(prompt).await {
            Ok(text) => match parse_payload(&text) {
                Some(payload) => CallOutcome::Success { payload },
                None => {
                    warn!("⚠️ 无法解析生成结果: {}", crate::utils::logging::truncate_text(&text, 80));
                    CallOutcome::failure(FailureKind::Other)
                }
            },
            Err(e) => {
                let kind = classify_error(&e.message);
                debug!("调用失败 ({}): {}", kind, e);
                CallOutcome::failure(kind)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use async_trait::async_trait;
    use serde_json::json;

    struct Fixed(Result<String, GenerationError>);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.0.clone()
        }
    }

    fn caller(result: Result<&str, &str>) -> RateLimitedCaller {
        let result = result
            .map(|s| s.to_string())
            .map_err(GenerationError::new);
        RateLimitedCaller::new(Arc::new(Fixed(result)))
    }

    #[test]
    fn test_classify_error() {
        assert_eq!(
            classify_error("[429 Too Many Requests] Resource has been exhausted"),
            FailureKind::RateLimited
        );
        assert_eq!(classify_error("status: RESOURCE_EXHAUSTED"), FailureKind::RateLimited);
        assert_eq!(
            classify_error("FAILED_PRECONDITION: Candidate was blocked due to SAFETY"),
            FailureKind::SafetyRejected
        );
        assert_eq!(classify_error("connection reset"), FailureKind::Other);
        assert_eq!(classify_error("took 14290ms"), FailureKind::Other);
    }

    #[test]
    fn test_parse_payload_with_code_fence() {
        let payload = parse_payload("```json\n{\"apple\": [\"A red fruit\"]}\n```").unwrap();
        assert_eq!(payload.get("apple"), Some(&json!(["A red fruit"])));

        assert!(parse_payload("[1, 2]").is_none());
        assert!(parse_payload("not json").is_none());
    }

    #[tokio::test]
    async fn test_call_success() {
        let outcome = caller(Ok(r#"{"apple": "A red fruit"}"#)).call("p").await;
        match outcome {
            CallOutcome::Success { payload } => {
                assert_eq!(payload.get("apple"), Some(&json!("A red fruit")));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_call_unparseable_response_is_other() {
        let outcome = caller(Ok("Sure! Here are some clues")).call("p").await;
        assert_eq!(outcome, CallOutcome::failure(FailureKind::Other));
    }

    #[tokio::test]
    async fn test_call_rate_limited() {
        let outcome = caller(Err("HTTP 429: quota exceeded")).call("p").await;
        assert!(outcome.is_rate_limited());
    }
}
