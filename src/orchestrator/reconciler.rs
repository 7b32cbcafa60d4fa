//! 结果落库 - 编排层
//!
//! 把成功的调用结果转换成按词写入的文档。写入以任务形式立即开始，
//! 但不阻塞下一批调用；编排器在运行结束时统一 [`drain`](ResultReconciler::drain)。

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::infrastructure::{Document, DocumentStore};
use crate::models::BatchRunSummary;

/// 写入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// 整体替换（首次生成）
    Replace,
    /// 合并字段（精选时保留 clues）
    Merge,
}

/// 尚未完成的写入
pub struct PendingWrite {
    key: String,
    /// 失败标记的写入不计入成功数
    counts_as_success: bool,
    handle: JoinHandle<Result<(), StoreError>>,
}

/// 结果落库器
#[derive(Clone)]
pub struct ResultReconciler {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl ResultReconciler {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// 发起一次写入，立即返回句柄
    pub fn persist(&self, key: &str, fields: Document, mode: PersistMode) -> PendingWrite {
        self.spawn_write(key, fields, mode, true)
    }

    /// 给失败的词写入 error 标记
    pub fn tag_failure(&self, key: &str, marker: &str) -> PendingWrite {
        let mut fields = Document::new();
        fields.insert("error".to_string(), marker.into());
        self.spawn_write(key, fields, PersistMode::Merge, false)
    }

    fn spawn_write(
        &self,
        key: &str,
        fields: Document,
        mode: PersistMode,
        counts_as_success: bool,
    ) -> PendingWrite {
        let store = self.store.clone();
        let collection = self.collection.clone();
        let id = key.to_string();

        let handle = tokio::spawn(async move {
            match mode {
                PersistMode::Replace => store.set(&collection, &id, fields).await,
                PersistMode::Merge => store.merge(&collection, &id, fields).await,
            }
        });

        PendingWrite {
            key: key.to_string(),
            counts_as_success,
            handle,
        }
    }

    /// 等待全部写入完成，把结果计入统计
    ///
    /// 失败的写入不重试，记为丢失。
    pub async fn drain(writes: Vec<PendingWrite>, summary: &mut BatchRunSummary) {
        let keys: Vec<(String, bool)> = writes
            .iter()
            .map(|w| (w.key.clone(), w.counts_as_success))
            .collect();
        let results = futures::future::join_all(writes.into_iter().map(|w| w.handle)).await;

        for ((key, counts_as_success), result) in keys.into_iter().zip(results) {
            let outcome = match result {
                Ok(inner) => inner.map_err(|e| e.to_string()),
                Err(join_err) => Err(join_err.to_string()),
            };

            match (outcome, counts_as_success) {
                (Ok(()), true) => {
                    summary.persisted += 1;
                    debug!("[词 {}] ✓ 已写入", key);
                }
                (Ok(()), false) => debug!("[词 {}] 已写入失败标记", key),
                (Err(e), true) => {
                    error!("[词 {}] ❌ 写入失败: {}", key, e);
                    summary.record_lost_write();
                }
                (Err(e), false) => error!("[词 {}] ❌ 失败标记写入失败: {}", key, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;
    use serde_json::{json, Value as JsonValue};

    fn fields(value: JsonValue) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_replace_twice_keeps_second_payload() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = ResultReconciler::new(store.clone(), "words");
        let mut summary = BatchRunSummary::default();

        let first = reconciler.persist("apple", fields(json!({"clues": ["a"], "clue": "a"})), PersistMode::Replace);
        ResultReconciler::drain(vec![first], &mut summary).await;
        let second = reconciler.persist("apple", fields(json!({"clues": ["b"]})), PersistMode::Replace);
        ResultReconciler::drain(vec![second], &mut summary).await;

        let stored = store.get("words", "apple").await.unwrap().unwrap();
        assert_eq!(JsonValue::Object(stored), json!({"clues": ["b"]}));
        assert_eq!(summary.persisted, 2);
    }

    #[tokio::test]
    async fn test_merge_twice_unions_fields() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = ResultReconciler::new(store.clone(), "words");
        let mut summary = BatchRunSummary::default();

        let first = reconciler.persist("apple", fields(json!({"clues": ["a"], "clue": "a"})), PersistMode::Merge);
        ResultReconciler::drain(vec![first], &mut summary).await;
        let second = reconciler.persist("apple", fields(json!({"clue": "b"})), PersistMode::Merge);
        ResultReconciler::drain(vec![second], &mut summary).await;

        let stored = store.get("words", "apple").await.unwrap().unwrap();
        assert_eq!(JsonValue::Object(stored), json!({"clues": ["a"], "clue": "b"}));
    }

    #[tokio::test]
    async fn test_failed_write_is_counted_as_lost() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes_to("pear");
        let reconciler = ResultReconciler::new(store.clone(), "words");

        let mut summary = BatchRunSummary::default();
        summary.record_success();
        summary.record_success();

        let writes = vec![
            reconciler.persist("apple", fields(json!({"clues": ["a"]})), PersistMode::Replace),
            reconciler.persist("pear", fields(json!({"clues": ["p"]})), PersistMode::Replace),
        ];
        ResultReconciler::drain(writes, &mut summary).await;

        assert_eq!(summary.successes, 1);
        assert_eq!(summary.persisted, 1);
        assert_eq!(summary.lost_writes, 1);
        assert_eq!(summary.other, 1);
    }

    #[tokio::test]
    async fn test_tag_failure_does_not_count_as_persisted() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = ResultReconciler::new(store.clone(), "words");
        let mut summary = BatchRunSummary::default();

        let write = reconciler.tag_failure("apple", "safety_rejected");
        ResultReconciler::drain(vec![write], &mut summary).await;

        assert_eq!(summary.persisted, 0);
        let stored = store.get("words", "apple").await.unwrap().unwrap();
        assert_eq!(stored.get("error"), Some(&json!("safety_rejected")));
    }
}
