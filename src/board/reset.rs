//! 棋盘重置状态机
//!
//! 重置步骤必须按顺序执行：
//! 1. CAS 抢占：`gameStatus` 从 `in_progress` 改为 `reset_in_progress`，失败则拒绝本次重置
//! 2. 遮盖所有分块中的答案，清除解题信息
//! 3. 原子递增 `gamesCompletedCount`
//! 4. CAS 释放：`gameStatus` 改回 `in_progress`
//! 5. `solvedWordsCount` 归零
//!
//! 中途出错时状态停留在 `reset_in_progress`，需要 [`release`](BoardResetStateMachine::release) 手动恢复。

use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::infrastructure::{value_doc, Document, DocumentStore};
use crate::models::board::{
    BOARD_CHUNKS, BOARD_INFO, GAMES_COMPLETED_COUNT, GAME_STATUS, SOLVED_WORDS_COUNT, VALUE_FIELD,
};
use crate::models::{BoardChunk, GameStatus};

/// 一次重置尝试的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// 重置完成，附带新的已完成局数
    Completed { games_completed: i64 },
    /// 已有重置在进行，本次被拒绝
    AlreadyResetting,
}

#[derive(Clone)]
pub struct BoardResetStateMachine {
    store: Arc<dyn DocumentStore>,
}

impl BoardResetStateMachine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 执行完整的重置序列
    pub async fn reset(&self) -> Result<ResetOutcome, StoreError> {
        if !self.claim().await? {
            warn!("⚠️ 已有重置在进行，跳过本次重置");
            return Ok(ResetOutcome::AlreadyResetting);
        }
        info!("🔒 已进入 reset_in_progress");

        let masked = self.mask_chunks().await?;
        info!("🧹 已遮盖 {} 个分块", masked);

        let games_completed = self
            .store
            .increment(BOARD_INFO, GAMES_COMPLETED_COUNT, VALUE_FIELD, 1)
            .await?;

        let released = self
            .store
            .compare_and_set(
                BOARD_INFO,
                GAME_STATUS,
                VALUE_FIELD,
                &JsonValue::from(GameStatus::ResetInProgress),
                JsonValue::from(GameStatus::InProgress),
            )
            .await?;
        if !released {
            warn!("⚠️ 释放时 gameStatus 已被其他操作修改");
        }

        self.store
            .set(BOARD_INFO, SOLVED_WORDS_COUNT, value_doc(0))
            .await?;

        info!("✅ 棋盘重置完成，已完成局数: {}", games_completed);
        Ok(ResetOutcome::Completed { games_completed })
    }

    /// 抢占重置锁。状态文档不存在时视为 `in_progress`
    async fn claim(&self) -> Result<bool, StoreError> {
        for expected in [JsonValue::from(GameStatus::InProgress), JsonValue::Null] {
            let claimed = self
                .store
                .compare_and_set(
                    BOARD_INFO,
                    GAME_STATUS,
                    VALUE_FIELD,
                    &expected,
                    JsonValue::from(GameStatus::ResetInProgress),
                )
                .await?;
            if claimed {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 并发改写所有分块，返回分块数
    async fn mask_chunks(&self) -> Result<usize, StoreError> {
        let chunks = self.store.list(BOARD_CHUNKS).await?;
        let count = chunks.len();

        let updates = chunks.into_iter().map(|(id, doc)| {
            let store = self.store.clone();
            async move {
                let chunk: BoardChunk = serde_json::from_value(JsonValue::Object(doc))
                    .map_err(|_| StoreError::type_mismatch(BOARD_CHUNKS, &id, "words", "board chunk"))?;
                let words: Vec<JsonValue> = chunk
                    .words
                    .iter()
                    .map(|cell| serde_json::to_value(cell.masked()))
                    .collect::<Result<_, _>>()
                    .map_err(|e| StoreError::Backend(e.to_string()))?;

                let mut fields = Document::new();
                fields.insert("words".to_string(), JsonValue::Array(words));
                store.merge(BOARD_CHUNKS, &id, fields).await
            }
        });

        try_join_all(updates).await?;
        Ok(count)
    }

    /// 强制把状态改回 `in_progress`（重置中途失败后的人工恢复）
    pub async fn release(&self) -> Result<(), StoreError> {
        warn!("🔓 强制释放重置锁");
        self.store
            .set(BOARD_INFO, GAME_STATUS, value_doc(GameStatus::InProgress))
            .await
    }
}
