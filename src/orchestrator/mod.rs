//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量调用编排器
//! - 截断、分批、批内并发、全部结束后统计
//! - 限流退避与批间节流
//!
//! ### `reconciler` - 结果落库
//! - 成功结果转换为按词写入（替换或合并）
//! - 写入不阻塞下一批，运行结束时统一等待
//!
//! ## 层次关系
//!
//! ```text
//! workflow (generate / curate 入口)
//!     ↓
//! batch_processor (处理 Vec<WorkItem>)
//!     ↓                 ↘
//! services::RateLimitedCaller   reconciler
//!     ↓                          ↓
//! clients::TextGenerator   infrastructure::DocumentStore
//! ```

pub mod batch_processor;
pub mod reconciler;

pub use batch_processor::{BatchOrchestrator, PipelineTask};
pub use reconciler::{PendingWrite, PersistMode, ResultReconciler};
