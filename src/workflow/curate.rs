//! 线索精选任务
//!
//! 从已生成的候选线索中选出一条，期望响应 `{"<word>": "clue"}`，
//! 以合并方式写入 `{clue}`，保留原有的 `clues`。

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::infrastructure::{Document, DocumentStore};
use crate::models::{PersistedWord, SuccessPayload, WorkItem};
use crate::orchestrator::{PersistMode, PipelineTask};
use crate::workflow::prompt;

pub const DEFAULT_CURATE_PROMPT: &str = r#"You edit clues for a crossword puzzle.
The word is "{{word}}". Candidate clues: {{clues}}
Pick the single best clue: clear, fair and fun. You may lightly edit it.
Respond with ONLY valid JSON: {"{{word}}": "the chosen clue"}"#;

pub struct CurateClues;

impl PipelineTask for CurateClues {
    fn name(&self) -> &str {
        "curate"
    }

    fn build_prompt(&self, template: &str, item: &WorkItem) -> String {
        prompt::render(template, item)
    }

    fn to_fields(&self, item: &WorkItem, payload: &SuccessPayload) -> Option<Document> {
        let clue = prompt::lookup(payload, &item.word)?.as_str()?.trim();
        if clue.is_empty() {
            return None;
        }
        let mut doc = Document::new();
        doc.insert("clue".to_string(), JsonValue::String(clue.to_string()));
        Some(doc)
    }

    fn persist_mode(&self) -> PersistMode {
        PersistMode::Merge
    }
}

/// 读取需要精选的词
///
/// 指定了 `words` 时逐个读取，否则扫描整个集合。
pub async fn load_curation_items(
    store: &dyn DocumentStore,
    collection: &str,
    words: Option<&[String]>,
) -> Result<Vec<WorkItem>> {
    let docs: Vec<(String, Document)> = match words {
        Some(words) => {
            let mut docs = Vec::with_capacity(words.len());
            for word in words {
                match store.get(collection, word).await? {
                    Some(doc) => docs.push((word.clone(), doc)),
                    None => warn!("[词 {}] ⚠️ 未找到已生成的线索，跳过", word),
                }
            }
            docs
        }
        None => store
            .list(collection)
            .await
            .with_context(|| format!("无法读取集合: {}", collection))?,
    };

    let mut items = Vec::new();
    for (word, doc) in docs {
        let persisted: PersistedWord = match serde_json::from_value(JsonValue::Object(doc)) {
            Ok(p) => p,
            Err(e) => {
                warn!("[词 {}] ⚠️ 文档格式错误: {}", word, e);
                continue;
            }
        };
        if persisted.needs_curation() {
            items.push(WorkItem::with_clues(word, persisted.clues));
        } else {
            debug!("[词 {}] 无需精选", word);
        }
    }
    Ok(items)
}
