//! 文档存储接口 - 基础设施层
//!
//! 文档按集合分组，每个文档是一个 JSON 对象。
//! 上层只通过本 trait 访问存储，不关心具体实现。

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::error::StoreError;

/// 单个文档
pub type Document = Map<String, JsonValue>;

/// 文档变更通知（before / after 快照）
///
/// 创建时 `before` 为 `None`，删除时 `after` 为 `None`。
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub collection: String,
    pub id: String,
    pub before: Option<Document>,
    pub after: Option<Document>,
}

impl DocumentChange {
    pub fn is_create(&self) -> bool {
        self.before.is_none() && self.after.is_some()
    }

    /// 读取变更前后某个字段的值
    pub fn field(&self, field: &str) -> (Option<&JsonValue>, Option<&JsonValue>) {
        (
            self.before.as_ref().and_then(|d| d.get(field)),
            self.after.as_ref().and_then(|d| d.get(field)),
        )
    }
}

/// 文档存储能力
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 读取文档，不存在时返回 `None`
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// 整体替换文档
    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError>;

    /// 合并字段（同名字段以新值为准），文档不存在时创建
    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    /// 原子地给数值字段加上 `delta`，返回新值；字段不存在时按 0 计算
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError>;

    /// 原子比较并设置：字段当前值等于 `expected` 时写入 `new`，返回是否写入
    ///
    /// 字段不存在时视为 `null`。
    async fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &JsonValue,
        new: JsonValue,
    ) -> Result<bool, StoreError>;

    /// 列出集合内所有文档（按 id 排序）
    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError>;
}

/// 构造 `{ "value": ... }` 形式的单值文档
pub fn value_doc(value: impl Into<JsonValue>) -> Document {
    let mut doc = Document::new();
    doc.insert("value".to_string(), value.into());
    doc
}
