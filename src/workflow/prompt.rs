//! 提示词模板
//!
//! 支持的占位符：`{{word}}`、`{{clues}}`（JSON 数组）。

use crate::models::{SuccessPayload, WorkItem};
use serde_json::Value as JsonValue;

pub fn render(template: &str, item: &WorkItem) -> String {
    let clues = serde_json::to_string(&item.clues).unwrap_or_else(|_| "[]".to_string());
    template
        .replace("{{word}}", &item.word)
        .replace("{{clues}}", &clues)
}

/// 在结果映射中查找词对应的内容，大小写不敏感
pub fn lookup<'a>(payload: &'a SuccessPayload, word: &str) -> Option<&'a JsonValue> {
    payload.get(word).or_else(|| {
        payload
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(word))
            .map(|(_, value)| value)
    })
}
