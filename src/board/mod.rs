//! 棋盘层
//!
//! - `reset` - 重置状态机（CAS 抢占 / 释放）
//! - `triggers` - 已解出计数与管理员信号两种触发入口
//! - `solve` - 解题受理（重置期间拒绝）
//! - `state` - 棋盘信息读写辅助

pub mod reset;
pub mod solve;
pub mod state;
pub mod triggers;

pub use reset::{BoardResetStateMachine, ResetOutcome};
pub use solve::{SolveOutcome, SolveService, SolveSubmission};
pub use state::{read_board_state, seed_board_info};
pub use triggers::{BoardTriggers, TriggerOutcome};
