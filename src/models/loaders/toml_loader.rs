use crate::models::word::WorkItem;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 词表文件格式
///
/// ```toml
/// words = ["apple", "banana"]
///
/// [[items]]
/// word = "cherry"
/// clues = ["Small red stone fruit"]
/// ```
#[derive(Debug, Default, Deserialize)]
struct WordListFile {
    #[serde(default)]
    words: Vec<String>,
    #[serde(default)]
    items: Vec<WorkItem>,
}

/// 从 TOML 文件加载词表，保持文件中的顺序（先 `words` 后 `items`）
pub async fn load_word_list(toml_file_path: &Path) -> Result<Vec<WorkItem>> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    parse_word_list(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))
}

/// 解析词表内容，空白词被跳过
pub fn parse_word_list(content: &str) -> Result<Vec<WorkItem>> {
    let file: WordListFile = toml::from_str(content)?;

    let items: Vec<WorkItem> = file
        .words
        .into_iter()
        .map(WorkItem::new)
        .chain(file.items)
        .filter(|item| {
            let keep = !item.word.trim().is_empty();
            if !keep {
                tracing::warn!("跳过空白词条");
            }
            keep
        })
        .collect();

    tracing::info!("成功加载 {} 个词", items.len());
    Ok(items)
}
