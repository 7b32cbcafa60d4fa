//! # Crossword Backend
//!
//! 多人填字游戏的后台：批量生成/精选线索，以及所有词解出后的棋盘重置。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 文档存储接口、内存实现、暂停能力
//!
//! ### ② 客户端与业务能力层（Clients / Services）
//! - `clients/` - 文本生成服务客户端
//! - `services/` - 单次调用归类、提示回答
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 分批并发调用、退避、统计
//! - `orchestrator/reconciler` - 成功结果落库，运行结束时统一等待
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - generate / curate 两个入口
//!
//! ### ⑤ 棋盘（Board）
//! - `board/` - 重置状态机、触发器、解题受理

pub mod app;
pub mod board;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::{App, AppRequest, EventResponse, PlatformEvent};
pub use config::{Config, PipelineOptions, PipelineRequest};
pub use error::{ApiError, GenerationError, StoreError};
pub use infrastructure::{DocumentStore, MemoryStore};
pub use models::{BatchRunSummary, CallOutcome, FailureKind, WorkItem};
pub use orchestrator::{BatchOrchestrator, ResultReconciler};
pub use workflow::ClueFlow;
