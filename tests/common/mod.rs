#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crossword_backend::clients::TextGenerator;
use crossword_backend::infrastructure::{Document, DocumentStore, MemoryStore, Pause};
use crossword_backend::{GenerationError, StoreError};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

/// 按提示词返回预设结果的生成器；未预设的提示词返回 `{"<prompt>": ["clue"]}`
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: HashMap<String, Result<String, GenerationError>>,
    delay: Option<Duration>,
    pub events: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, prompt: &str, text: &str) -> Self {
        self.replies.insert(prompt.to_string(), Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, prompt: &str, message: &str) -> Self {
        self.replies
            .insert(prompt.to_string(), Err(GenerationError::new(message)));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.starts_with("start "))
            .count()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.events.lock().push(format!("start {}", prompt));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.events.lock().push(format!("end {}", prompt));
        self.replies
            .get(prompt)
            .cloned()
            .unwrap_or_else(|| Ok(format!(r#"{{"{}": ["clue"]}}"#, prompt)))
    }
}

/// 只记录、不等待的暂停
#[derive(Default)]
pub struct RecordingPause {
    pub pauses: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().push(duration);
    }
}

/// 每次操作前先让出一次执行权的存储，让 `tokio::join!` 中的并发流程真正交错
pub struct YieldingStore {
    pub inner: Arc<MemoryStore>,
}

impl YieldingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DocumentStore for YieldingStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.set(collection, id, doc).await
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.merge(collection, id, fields).await
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        tokio::task::yield_now().await;
        self.inner.increment(collection, id, field, delta).await
    }

    async fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &JsonValue,
        new: JsonValue,
    ) -> Result<bool, StoreError> {
        tokio::task::yield_now().await;
        self.inner.compare_and_set(collection, id, field, expected, new).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.list(collection).await
    }
}
