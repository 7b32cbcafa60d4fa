//! 暂停能力
//!
//! 流水线中的退避和节流都通过 [`Pause`] 进行，便于测试时计数而不真正等待。

use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// 基于 `tokio::time::sleep` 的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
