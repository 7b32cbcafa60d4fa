//! 内存文档存储 - 基础设施层
//!
//! 唯一持有文档数据的组件。每次写入都会向订阅者推送 [`DocumentChange`]，
//! 可以从 JSON 快照文件加载或保存。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::error::StoreError;
use crate::infrastructure::document_store::{Document, DocumentChange, DocumentStore};

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// 内存文档存储
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

struct Inner {
    collections: Collections,
    /// 变更订阅者
    watchers: Vec<UnboundedSender<DocumentChange>>,
    /// 写入这些文档 id 时返回错误（测试用）
    failing_ids: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_collections(Collections::new())
    }

    fn with_collections(collections: Collections) -> Self {
        Self {
            inner: Mutex::new(Inner {
                collections,
                watchers: Vec::new(),
                failing_ids: HashSet::new(),
            }),
        }
    }

    /// 从 JSON 快照文件加载，文件不存在时返回空存储
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("快照文件不存在，使用空存储: {}", path.display());
            return Ok(Self::new());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取快照文件: {}", path.display()))?;
        let collections: Collections = serde_json::from_str(&content)
            .with_context(|| format!("无法解析快照文件: {}", path.display()))?;

        Ok(Self::with_collections(collections))
    }

    /// 保存为 JSON 快照文件
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = {
            let inner = self.inner.lock();
            serde_json::to_string_pretty(&inner.collections)?
        };
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("无法写入快照文件: {}", path.display()))?;
        Ok(())
    }

    /// 订阅变更通知
    pub fn subscribe(&self) -> UnboundedReceiver<DocumentChange> {
        let (tx, rx) = unbounded_channel();
        self.inner.lock().watchers.push(tx);
        rx
    }

    /// 让指定文档 id 的写入失败
    pub fn fail_writes_to(&self, id: impl Into<String>) {
        self.inner.lock().failing_ids.insert(id.into());
    }

    /// 当前集合中的文档数量
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn check_writable(&self, id: &str) -> Result<(), StoreError> {
        if self.failing_ids.contains(id) {
            return Err(StoreError::Backend(format!("write rejected for {}", id)));
        }
        Ok(())
    }

    /// 写入文档并通知订阅者
    fn write(&mut self, collection: &str, id: &str, doc: Document) {
        let docs = self.collections.entry(collection.to_string()).or_default();
        let before = docs.insert(id.to_string(), doc.clone());
        let after = Some(doc);

        let change = DocumentChange {
            collection: collection.to_string(),
            id: id.to_string(),
            before,
            after,
        };
        self.watchers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    fn current(&self, collection: &str, id: &str) -> Option<&Document> {
        self.collections.get(collection).and_then(|docs| docs.get(id))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.inner.lock().current(collection, id).cloned())
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check_writable(id)?;
        inner.write(collection, id, doc);
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.check_writable(id)?;
        let mut doc = inner.current(collection, id).cloned().unwrap_or_default();
        doc.extend(fields);
        inner.write(collection, id, doc);
        Ok(())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock();
        inner.check_writable(id)?;
        let mut doc = inner.current(collection, id).cloned().unwrap_or_default();
        let current = match doc.get(field) {
            None | Some(JsonValue::Null) => 0,
            Some(value) => value
                .as_i64()
                .ok_or_else(|| StoreError::type_mismatch(collection, id, field, "integer"))?,
        };
        let updated = current + delta;
        doc.insert(field.to_string(), JsonValue::from(updated));
        inner.write(collection, id, doc);
        Ok(updated)
    }

    async fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &JsonValue,
        new: JsonValue,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        inner.check_writable(id)?;
        let mut doc = inner.current(collection, id).cloned().unwrap_or_default();
        let current = doc.get(field).unwrap_or(&JsonValue::Null);
        if current != expected {
            return Ok(false);
        }
        doc.insert(field.to_string(), new);
        inner.write(collection, id, doc);
        Ok(true)
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
