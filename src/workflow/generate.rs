//! 线索生成任务
//!
//! 每个词一次调用，期望响应 `{"<word>": ["clue", ...]}`，
//! 以替换方式写入 `words/<word> = {clues}`。

use serde_json::Value as JsonValue;

use crate::infrastructure::Document;
use crate::models::{SuccessPayload, WorkItem};
use crate::orchestrator::{PersistMode, PipelineTask};
use crate::workflow::prompt;

pub const DEFAULT_GENERATE_PROMPT: &str = r#"You write clues for a crossword puzzle.
Write 5 short, fun, family-friendly clues for the word "{{word}}".
Clues must not contain the word itself.
Respond with ONLY valid JSON: {"{{word}}": ["clue 1", "clue 2", "clue 3", "clue 4", "clue 5"]}"#;

pub struct GenerateClues;

impl PipelineTask for GenerateClues {
    fn name(&self) -> &str {
        "generate"
    }

    fn build_prompt(&self, template: &str, item: &WorkItem) -> String {
        prompt::render(template, item)
    }

    fn to_fields(&self, item: &WorkItem, payload: &SuccessPayload) -> Option<Document> {
        let clues: Vec<JsonValue> = match prompt::lookup(payload, &item.word)? {
            JsonValue::String(clue) if !clue.trim().is_empty() => vec![JsonValue::String(clue.trim().to_string())],
            JsonValue::Array(values) => values
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| JsonValue::String(s.to_string()))
                .collect(),
            _ => return None,
        };

        if clues.is_empty() {
            return None;
        }

        let mut doc = Document::new();
        doc.insert("clues".to_string(), JsonValue::Array(clues));
        Some(doc)
    }

    fn persist_mode(&self) -> PersistMode {
        PersistMode::Replace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: JsonValue) -> SuccessPayload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_to_fields_array() {
        let fields = GenerateClues
            .to_fields(&WorkItem::new("apple"), &payload(json!({"apple": ["Red fruit", " ", 3]})))
            .unwrap();
        assert_eq!(fields.get("clues"), Some(&json!(["Red fruit"])));
    }

    #[test]
    fn test_to_fields_single_string_is_wrapped() {
        let fields = GenerateClues
            .to_fields(&WorkItem::new("apple"), &payload(json!({"apple": "Red fruit"})))
            .unwrap();
        assert_eq!(fields.get("clues"), Some(&json!(["Red fruit"])));
    }

    #[test]
    fn test_to_fields_rejects_empty() {
        let item = WorkItem::new("apple");
        assert!(GenerateClues.to_fields(&item, &payload(json!({"apple": []}))).is_none());
        assert!(GenerateClues.to_fields(&item, &payload(json!({"apple": 1}))).is_none());
        assert!(GenerateClues.to_fields(&item, &payload(json!({"pear": ["x"]}))).is_none());
    }
}
