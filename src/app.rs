//! 应用入口
//!
//! 平台投递三种事件：显式请求、文档创建通知、文档更新通知。
//! `App` 把它们分发给流水线、提示服务和棋盘触发器。

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info};

use crate::board::{BoardTriggers, SolveOutcome, SolveService, SolveSubmission, TriggerOutcome};
use crate::clients::TextGenerator;
use crate::config::{Config, PipelineRequest};
use crate::infrastructure::{DocumentChange, DocumentStore, Pause};
use crate::models::board::{ADMIN_RESET_GAME, BOARD_INFO, SOLVED_WORDS_COUNT};
use crate::models::WorkItem;
use crate::services::{HintRequest, HintService};
use crate::workflow::ClueFlow;

/// 显式请求
#[derive(Debug, Clone)]
pub enum AppRequest {
    Generate {
        request: PipelineRequest,
        items: Vec<WorkItem>,
    },
    Curate {
        request: PipelineRequest,
        words: Option<Vec<String>>,
    },
    Hint(HintRequest),
    Solve(SolveSubmission),
}

/// 平台事件
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    Request(AppRequest),
    DocumentCreated(DocumentChange),
    DocumentUpdated(DocumentChange),
}

/// 事件处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum EventResponse {
    /// HTTP 风格响应
    Reply { status: u16, body: JsonValue },
    /// 流水线摘要
    Summary(String),
    /// 触发器处理结果
    Trigger(TriggerOutcome),
    /// 与本应用无关的事件
    Ignored,
}

/// 应用主结构
pub struct App {
    clue_flow: ClueFlow,
    hints: HintService,
    triggers: BoardTriggers,
    solves: SolveService,
}

impl App {
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        generator: Arc<dyn TextGenerator>,
        pause: Arc<dyn Pause>,
    ) -> Self {
        log_startup(config);
        Self {
            clue_flow: ClueFlow::new(store.clone(), generator.clone(), pause, config.pipeline_options()),
            hints: HintService::new(generator),
            triggers: BoardTriggers::new(store.clone()),
            solves: SolveService::new(store),
        }
    }

    pub fn triggers(&self) -> &BoardTriggers {
        &self.triggers
    }

    /// 分发一个平台事件
    pub async fn handle(&self, event: PlatformEvent) -> EventResponse {
        match event {
            PlatformEvent::Request(request) => self.handle_request(request).await,
            PlatformEvent::DocumentCreated(change) | PlatformEvent::DocumentUpdated(change) => {
                self.handle_change(&change).await
            }
        }
    }

    async fn handle_request(&self, request: AppRequest) -> EventResponse {
        match request {
            AppRequest::Generate { request, items } => {
                EventResponse::Summary(self.clue_flow.generate(&request, &items).await)
            }
            AppRequest::Curate { request, words } => {
                EventResponse::Summary(self.clue_flow.curate(&request, words.as_deref()).await)
            }
            AppRequest::Hint(request) => match self.hints.get_hint(&request).await {
                Ok(answer) => EventResponse::Reply {
                    status: 200,
                    body: json!(answer),
                },
                Err(e) => EventResponse::Reply {
                    status: e.status(),
                    body: json!({ "error": e.public_message() }),
                },
            },
            AppRequest::Solve(submission) => match self.solves.record_solve(&submission).await {
                Ok(SolveOutcome::Accepted { solved_words }) => EventResponse::Reply {
                    status: 200,
                    body: json!({ "solvedWords": solved_words }),
                },
                Ok(SolveOutcome::AlreadySolved) => EventResponse::Reply {
                    status: 409,
                    body: json!({ "error": "Word already solved" }),
                },
                Ok(SolveOutcome::InvalidAnswer { expected_len }) => EventResponse::Reply {
                    status: 400,
                    body: json!({ "error": format!("Answer must be {} characters long", expected_len) }),
                },
                Ok(SolveOutcome::Rejected) => EventResponse::Reply {
                    status: 423,
                    body: json!({ "error": "Board reset in progress" }),
                },
                Err(e) => {
                    error!("[词 {}] ❌ 解题受理失败: {}", submission.word_id, e);
                    EventResponse::Reply {
                        status: 500,
                        body: json!({ "error": "Internal server error" }),
                    }
                }
            },
        }
    }

    /// 把存储变更路由到对应触发器
    pub async fn handle_change(&self, change: &DocumentChange) -> EventResponse {
        if change.collection != BOARD_INFO || change.after.is_none() {
            return EventResponse::Ignored;
        }
        match change.id.as_str() {
            SOLVED_WORDS_COUNT => EventResponse::Trigger(self.triggers.on_solved_count_updated(change).await),
            ADMIN_RESET_GAME => EventResponse::Trigger(self.triggers.on_admin_reset_updated(change).await),
            _ => EventResponse::Ignored,
        }
    }

    /// 持续消费存储的变更通知，直到通道关闭
    pub async fn listen(&self, mut changes: UnboundedReceiver<DocumentChange>) {
        info!("👂 开始监听棋盘变更");
        while let Some(change) = changes.recv().await {
            let event = if change.is_create() {
                PlatformEvent::DocumentCreated(change)
            } else {
                PlatformEvent::DocumentUpdated(change)
            };
            let response = self.handle(event).await;
            if response != EventResponse::Ignored {
                debug!("变更处理结果: {:?}", response);
            }
        }
        info!("变更通道已关闭，停止监听");
    }
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 填字游戏后台");
    info!("🤖 模型: {}", config.llm_model_name);
    info!("📊 每批并发数: {} / 单次上限: {}", config.batch_size, config.generation_limit);
    info!("{}", "=".repeat(60));
}
