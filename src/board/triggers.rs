//! 重置触发器
//!
//! 两种变更通知都汇聚到同一个重置序列：
//! - `solvedWordsCount` 更新：新值达到 `totalWordsCount` 时重置
//! - `adminResetGame` 更新：从非 true 变为 true 时重置，随后自动改回 false
//!
//! 触发器从不向平台抛出错误：平台遇错重试会重复执行半途的重置，比吞掉错误更糟。

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::board::reset::{BoardResetStateMachine, ResetOutcome};
use crate::board::state::read_count;
use crate::error::StoreError;
use crate::infrastructure::{value_doc, DocumentChange, DocumentStore};
use crate::models::board::{ADMIN_RESET_GAME, BOARD_INFO, TOTAL_WORDS_COUNT, VALUE_FIELD};

/// 触发器的处理结果（仅用于观测）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// 条件不满足，未做任何修改
    Skipped,
    /// 执行了重置
    Reset,
    /// 已有重置在进行，被拒绝
    Rejected,
    /// 出错，已记录日志
    Failed,
}

#[derive(Clone)]
pub struct BoardTriggers {
    store: Arc<dyn DocumentStore>,
    machine: BoardResetStateMachine,
}

impl BoardTriggers {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            machine: BoardResetStateMachine::new(store.clone()),
            store,
        }
    }

    pub fn machine(&self) -> &BoardResetStateMachine {
        &self.machine
    }

    /// `boardInfo/solvedWordsCount` 变更
    pub async fn on_solved_count_updated(&self, change: &DocumentChange) -> TriggerOutcome {
        let (before, after) = change.field(VALUE_FIELD);
        if before == after {
            debug!("solvedWordsCount 未变化，忽略重复通知");
            return TriggerOutcome::Skipped;
        }
        let Some(solved) = after.and_then(JsonValue::as_i64) else {
            warn!("⚠️ solvedWordsCount 不是整数: {:?}", after);
            return TriggerOutcome::Skipped;
        };

        match self.reset_if_complete(solved).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("❌ 自动重置失败: {}", e);
                TriggerOutcome::Failed
            }
        }
    }

    async fn reset_if_complete(&self, solved: i64) -> Result<TriggerOutcome, StoreError> {
        let total = read_count(self.store.as_ref(), TOTAL_WORDS_COUNT)
            .await?
            .ok_or_else(|| StoreError::not_found(BOARD_INFO, TOTAL_WORDS_COUNT))?;

        if solved < total {
            debug!("已解出 {}/{}，无需重置", solved, total);
            return Ok(TriggerOutcome::Skipped);
        }

        info!("🏁 所有词已解出 ({}/{})，开始重置棋盘", solved, total);
        Ok(into_trigger_outcome(self.machine.reset().await?))
    }

    /// `boardInfo/adminResetGame` 变更
    pub async fn on_admin_reset_updated(&self, change: &DocumentChange) -> TriggerOutcome {
        let (before, after) = change.field(VALUE_FIELD);
        let requested = after.and_then(JsonValue::as_bool) == Some(true);
        let was_requested = before.and_then(JsonValue::as_bool) == Some(true);
        if !requested || was_requested {
            return TriggerOutcome::Skipped;
        }

        info!("🛠️ 管理员请求重置棋盘");
        let outcome = match self.machine.reset().await {
            Ok(outcome) => into_trigger_outcome(outcome),
            Err(e) => {
                error!("❌ 管理员重置失败: {}", e);
                TriggerOutcome::Failed
            }
        };

        if let Err(e) = self
            .store
            .set(BOARD_INFO, ADMIN_RESET_GAME, value_doc(false))
            .await
        {
            error!("❌ 无法清除 adminResetGame: {}", e);
            return TriggerOutcome::Failed;
        }

        outcome
    }
}

fn into_trigger_outcome(outcome: ResetOutcome) -> TriggerOutcome {
    match outcome {
        ResetOutcome::Completed { .. } => TriggerOutcome::Reset,
        ResetOutcome::AlreadyResetting => TriggerOutcome::Rejected,
    }
}
