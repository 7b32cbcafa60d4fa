//! 解题受理
//!
//! 重置进行中（`reset_in_progress`）时拒绝新的解题。
//! 词格写入是对分块 `words` 字段的比较并设置，同一分块上的并发解题互不覆盖；
//! 冲突时重新读取后重试。
//! 状态检查与计数递增之间没有事务，并发重置时仍可能有极小的窗口。

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::board::state::read_status;
use crate::error::StoreError;
use crate::infrastructure::{Document, DocumentStore};
use crate::models::board::{BOARD_CHUNKS, BOARD_INFO, SOLVED_WORDS_COUNT, VALUE_FIELD};
use crate::models::{BoardChunk, GameStatus};

/// 分块写入冲突时的最大重试次数
const MAX_CELL_WRITE_ATTEMPTS: usize = 16;

const WORDS_FIELD: &str = "words";

/// 一次解题提交
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveSubmission {
    pub word_id: String,
    pub answer: String,
    pub user_id: String,
    pub mascot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// 已受理，附带新的已解出数量
    Accepted { solved_words: i64 },
    /// 该词已被解出
    AlreadySolved,
    /// 答案长度与词格不符
    InvalidAnswer { expected_len: usize },
    /// 棋盘正在重置
    Rejected,
}

pub struct SolveService {
    store: Arc<dyn DocumentStore>,
}

impl SolveService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn record_solve(&self, submission: &SolveSubmission) -> Result<SolveOutcome, StoreError> {
        for attempt in 1..=MAX_CELL_WRITE_ATTEMPTS {
            if read_status(self.store.as_ref()).await? == Some(GameStatus::ResetInProgress) {
                warn!("[词 {}] ⚠️ 棋盘重置中，拒绝解题", submission.word_id);
                return Ok(SolveOutcome::Rejected);
            }

            let (chunk_id, words) = self.find_chunk(&submission.word_id).await?;
            let mut chunk: BoardChunk = chunk_from_words(&chunk_id, &words)?;
            let Some(cell) = chunk.words.iter_mut().find(|c| c.id == submission.word_id) else {
                return Err(StoreError::not_found(BOARD_CHUNKS, &submission.word_id));
            };
            if cell.is_solved() {
                return Ok(SolveOutcome::AlreadySolved);
            }

            let expected_len = cell.answer.chars().count();
            if submission.answer.chars().count() != expected_len {
                warn!(
                    "[词 {}] ⚠️ 答案长度 {} 与词格长度 {} 不符",
                    submission.word_id,
                    submission.answer.chars().count(),
                    expected_len
                );
                return Ok(SolveOutcome::InvalidAnswer { expected_len });
            }

            cell.answer = submission.answer.clone();
            cell.user_id = Some(submission.user_id.clone());
            cell.mascot = submission.mascot.clone();
            cell.solved_timestamp = Some(chrono::Utc::now().to_rfc3339());

            let updated = serde_json::to_value(&chunk.words).map_err(|e| StoreError::Backend(e.to_string()))?;
            let written = self
                .store
                .compare_and_set(BOARD_CHUNKS, &chunk_id, WORDS_FIELD, &words, updated)
                .await?;
            if !written {
                debug!("[词 {}] 分块 {} 已被修改，第 {} 次重试", submission.word_id, chunk_id, attempt);
                continue;
            }

            let solved_words = self
                .store
                .increment(BOARD_INFO, SOLVED_WORDS_COUNT, VALUE_FIELD, 1)
                .await?;
            info!("[词 {}] ✓ 已解出，当前 {} 个", submission.word_id, solved_words);

            return Ok(SolveOutcome::Accepted { solved_words });
        }

        Err(StoreError::Backend(format!(
            "分块写入冲突过多，放弃解题: {}",
            submission.word_id
        )))
    }

    /// 找到包含该词的分块，返回分块 id 和当前的 `words` 原始值
    async fn find_chunk(&self, word_id: &str) -> Result<(String, JsonValue), StoreError> {
        for (id, mut doc) in self.store.list(BOARD_CHUNKS).await? {
            let words = doc.remove(WORDS_FIELD).unwrap_or(JsonValue::Null);
            let chunk = chunk_from_words(&id, &words)?;
            if chunk.words.iter().any(|c| c.id == word_id) {
                return Ok((id, words));
            }
        }
        Err(StoreError::not_found(BOARD_CHUNKS, word_id))
    }
}

fn chunk_from_words(chunk_id: &str, words: &JsonValue) -> Result<BoardChunk, StoreError> {
    let mut doc = Document::new();
    if !words.is_null() {
        doc.insert(WORDS_FIELD.to_string(), words.clone());
    }
    serde_json::from_value(JsonValue::Object(doc))
        .map_err(|_| StoreError::type_mismatch(BOARD_CHUNKS, chunk_id, WORDS_FIELD, "board chunk"))
}
