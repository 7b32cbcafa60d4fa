//! 词条模型

use serde::{Deserialize, Serialize};

/// 流水线输入：一个词及其已有的候选线索
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub word: String,
    #[serde(default)]
    pub clues: Vec<String>,
}

impl WorkItem {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            clues: Vec::new(),
        }
    }

    pub fn with_clues(word: impl Into<String>, clues: Vec<String>) -> Self {
        Self {
            word: word.into(),
            clues,
        }
    }
}

/// `words` 集合中持久化的词条
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedWord {
    #[serde(default)]
    pub clues: Vec<String>,
    /// 选定的线索
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clue: Option<String>,
    /// 失败标记
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PersistedWord {
    /// 已有候选线索但还没有选定的词才需要精选
    pub fn needs_curation(&self) -> bool {
        !self.clues.is_empty() && self.clue.is_none()
    }
}
