use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use crossword_backend::clients::LlmClient;
use crossword_backend::infrastructure::{value_doc, DocumentStore, MemoryStore, TokioPause};
use crossword_backend::models::board::{ADMIN_RESET_GAME, BOARD_CHUNKS, BOARD_INFO};
use crossword_backend::models::load_word_list;
use crossword_backend::services::{HintExchange, HintRequest};
use crossword_backend::utils::logging;
use crossword_backend::workflow::WORDS_COLLECTION;
use crossword_backend::{App, AppRequest, Config, EventResponse, PipelineRequest, PlatformEvent};
use tracing::info;

const USAGE: &str = "用法: crossword_backend <generate [prompt] | curate [prompt] | reset | unlock | hint <word> <question>>";

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    let store = Arc::new(MemoryStore::load_snapshot(&config.store_snapshot_file).await?);
    info!(
        "📂 已加载快照: {} 个词, {} 个棋盘分块",
        store.len(WORDS_COLLECTION),
        store.len(BOARD_CHUNKS)
    );
    let dyn_store: Arc<dyn DocumentStore> = store.clone();
    let generator = Arc::new(LlmClient::new(&config)?);
    let app = App::new(&config, dyn_store, generator, Arc::new(TokioPause));

    let response = match command.as_str() {
        "generate" => {
            let items = load_word_list(Path::new(&config.words_file)).await?;
            let request = PipelineRequest {
                prompt: args.get(1).cloned().unwrap_or_default(),
                ..Default::default()
            };
            app.handle(PlatformEvent::Request(AppRequest::Generate { request, items }))
                .await
        }
        "curate" => {
            let request = PipelineRequest {
                prompt: args.get(1).cloned().unwrap_or_default(),
                ..Default::default()
            };
            app.handle(PlatformEvent::Request(AppRequest::Curate { request, words: None }))
                .await
        }
        "reset" => {
            let mut changes = store.subscribe();
            store.set(BOARD_INFO, ADMIN_RESET_GAME, value_doc(true)).await?;
            let change = changes.recv().await.context("未收到 adminResetGame 变更通知")?;
            app.handle(PlatformEvent::DocumentUpdated(change)).await
        }
        "unlock" => {
            app.triggers().machine().release().await?;
            EventResponse::Ignored
        }
        "hint" => {
            let (Some(word), Some(question)) = (args.get(1), args.get(2)) else {
                bail!(USAGE);
            };
            let request = HintRequest {
                word: word.clone(),
                question: question.clone(),
                context: Vec::<HintExchange>::new(),
            };
            app.handle(PlatformEvent::Request(AppRequest::Hint(request))).await
        }
        _ => bail!(USAGE),
    };

    match response {
        EventResponse::Summary(summary) => println!("{}", summary),
        EventResponse::Reply { status, body } => println!("{} {}", status, body),
        EventResponse::Trigger(outcome) => println!("{:?}", outcome),
        EventResponse::Ignored => {}
    }

    store.save_snapshot(&config.store_snapshot_file).await?;
    Ok(())
}
