//! 棋盘模型

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// 棋盘信息集合，每个字段一个 `{value}` 文档
pub const BOARD_INFO: &str = "boardInfo";
/// 棋盘分块集合
pub const BOARD_CHUNKS: &str = "boardChunks";

pub const GAME_STATUS: &str = "gameStatus";
pub const GAMES_COMPLETED_COUNT: &str = "gamesCompletedCount";
pub const SOLVED_WORDS_COUNT: &str = "solvedWordsCount";
pub const TOTAL_WORDS_COUNT: &str = "totalWordsCount";
pub const ADMIN_RESET_GAME: &str = "adminResetGame";

/// 单值文档的字段名
pub const VALUE_FIELD: &str = "value";

/// 游戏状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    ResetInProgress,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::InProgress => "in_progress",
            GameStatus::ResetInProgress => "reset_in_progress",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in_progress" => Some(GameStatus::InProgress),
            "reset_in_progress" => Some(GameStatus::ResetInProgress),
            _ => None,
        }
    }
}

impl From<GameStatus> for JsonValue {
    fn from(status: GameStatus) -> Self {
        JsonValue::String(status.as_str().to_string())
    }
}

/// 棋盘状态（读取视图）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    pub game_status: GameStatus,
    pub games_completed_count: i64,
    pub solved_words_count: i64,
    pub total_words_count: i64,
    pub admin_reset_game: bool,
}

/// 棋盘上的一个词格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardWordCell {
    pub id: String,
    /// 未解出时为等长空格
    pub answer: String,
    #[serde(default)]
    pub mascot: Option<String>,
    #[serde(default)]
    pub solved_timestamp: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// 位置、方向等其他字段原样保留
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl BoardWordCell {
    /// 重置：答案换成等长空格，清除解题信息
    pub fn masked(&self) -> Self {
        Self {
            id: self.id.clone(),
            answer: " ".repeat(self.answer.chars().count()),
            mascot: None,
            solved_timestamp: None,
            user_id: None,
            extra: self.extra.clone(),
        }
    }

    pub fn is_solved(&self) -> bool {
        self.solved_timestamp.is_some()
    }
}

/// 棋盘分块文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardChunk {
    #[serde(default)]
    pub words: Vec<BoardWordCell>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_masked_preserves_length_and_layout() {
        let cell: BoardWordCell = serde_json::from_value(json!({
            "id": "w1",
            "answer": "apple",
            "mascot": "dash",
            "solvedTimestamp": "2024-05-01T10:00:00Z",
            "userId": "u1",
            "position": {"x": 3, "y": 4}
        }))
        .unwrap();

        let masked = cell.masked();
        assert_eq!(masked.answer, "     ");
        assert_eq!(masked.mascot, None);
        assert_eq!(masked.solved_timestamp, None);
        assert_eq!(masked.user_id, None);
        assert_eq!(masked.extra.get("position"), Some(&json!({"x": 3, "y": 4})));
    }

    #[test]
    fn test_game_status_round_trip_names() {
        assert_eq!(GameStatus::parse("reset_in_progress"), Some(GameStatus::ResetInProgress));
        assert_eq!(JsonValue::from(GameStatus::InProgress), json!("in_progress"));
        assert_eq!(GameStatus::parse("paused"), None);
    }
}
