//! 棋盘信息读写辅助

use serde_json::Value as JsonValue;

use crate::error::StoreError;
use crate::infrastructure::{value_doc, DocumentStore};
use crate::models::board::{
    ADMIN_RESET_GAME, BOARD_INFO, GAMES_COMPLETED_COUNT, GAME_STATUS, SOLVED_WORDS_COUNT,
    TOTAL_WORDS_COUNT, VALUE_FIELD,
};
use crate::models::{BoardState, GameStatus};

/// 读取 `boardInfo/<id>.value`
pub async fn read_value(store: &dyn DocumentStore, id: &str) -> Result<Option<JsonValue>, StoreError> {
    Ok(store
        .get(BOARD_INFO, id)
        .await?
        .and_then(|mut doc| doc.remove(VALUE_FIELD)))
}

/// 读取整数值，不存在时返回 `None`
pub async fn read_count(store: &dyn DocumentStore, id: &str) -> Result<Option<i64>, StoreError> {
    match read_value(store, id).await? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| StoreError::type_mismatch(BOARD_INFO, id, VALUE_FIELD, "integer")),
    }
}

pub async fn read_status(store: &dyn DocumentStore) -> Result<Option<GameStatus>, StoreError> {
    match read_value(store, GAME_STATUS).await? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => GameStatus::parse(&s)
            .map(Some)
            .ok_or_else(|| StoreError::type_mismatch(BOARD_INFO, GAME_STATUS, VALUE_FIELD, "game status")),
        Some(_) => Err(StoreError::type_mismatch(BOARD_INFO, GAME_STATUS, VALUE_FIELD, "game status")),
    }
}

/// 读取完整的棋盘状态，缺失的字段按初始值处理
pub async fn read_board_state(store: &dyn DocumentStore) -> Result<BoardState, StoreError> {
    Ok(BoardState {
        game_status: read_status(store).await?.unwrap_or(GameStatus::InProgress),
        games_completed_count: read_count(store, GAMES_COMPLETED_COUNT).await?.unwrap_or(0),
        solved_words_count: read_count(store, SOLVED_WORDS_COUNT).await?.unwrap_or(0),
        total_words_count: read_count(store, TOTAL_WORDS_COUNT).await?.unwrap_or(0),
        admin_reset_game: read_value(store, ADMIN_RESET_GAME)
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
    })
}

/// 初始化一局新棋盘的信息文档
pub async fn seed_board_info(store: &dyn DocumentStore, total_words: i64) -> Result<(), StoreError> {
    store.set(BOARD_INFO, GAME_STATUS, value_doc(GameStatus::InProgress)).await?;
    store.set(BOARD_INFO, GAMES_COMPLETED_COUNT, value_doc(0)).await?;
    store.set(BOARD_INFO, SOLVED_WORDS_COUNT, value_doc(0)).await?;
    store.set(BOARD_INFO, TOTAL_WORDS_COUNT, value_doc(total_words)).await?;
    store.set(BOARD_INFO, ADMIN_RESET_GAME, value_doc(false)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;

    #[tokio::test]
    async fn test_missing_fields_read_as_initial_state() {
        let store = MemoryStore::new();
        let state = read_board_state(&store).await.unwrap();
        assert_eq!(state.game_status, GameStatus::InProgress);
        assert_eq!(state.solved_words_count, 0);
        assert!(!state.admin_reset_game);
    }

    #[tokio::test]
    async fn test_unknown_status_is_type_mismatch() {
        let store = MemoryStore::new();
        store.set(BOARD_INFO, GAME_STATUS, value_doc("paused")).await.unwrap();
        assert!(matches!(
            read_status(&store).await,
            Err(StoreError::TypeMismatch { .. })
        ));
    }
}
