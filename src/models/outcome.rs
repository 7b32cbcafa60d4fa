//! 调用结果与运行统计

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// 成功调用解析出的结构化内容：词 → 生成内容
pub type SuccessPayload = Map<String, JsonValue>;

/// 失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 服务端限流（可通过退避恢复）
    RateLimited,
    /// 服务拒绝生成内容（不重试）
    SafetyRejected,
    /// 解析失败、未知错误、持久化失败
    Other,
}

impl FailureKind {
    /// 写入 `error` 标记时使用的名称
    pub fn marker(&self) -> &'static str {
        match self {
            FailureKind::RateLimited => "rate_limited",
            FailureKind::SafetyRejected => "safety_rejected",
            FailureKind::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// 单次外部调用的结果
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success { payload: SuccessPayload },
    Failure { kind: FailureKind },
}

impl CallOutcome {
    pub fn failure(kind: FailureKind) -> Self {
        CallOutcome::Failure { kind }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            CallOutcome::Failure {
                kind: FailureKind::RateLimited
            }
        )
    }
}

/// 一次流水线运行的统计
///
/// 运行期间作为累加器，返回后不再修改。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRunSummary {
    pub successes: usize,
    pub rate_limited: usize,
    pub safety_rejected: usize,
    pub other: usize,
    /// 实际发出的调用数
    pub dispatched: usize,
    /// 批次数
    pub batches: usize,
    /// 触发限流退避的次数
    pub recovery_pauses: usize,
    /// 成功写入的文档数
    pub persisted: usize,
    /// 写入失败而丢失的结果数
    pub lost_writes: usize,
    pub elapsed: Duration,
}

impl BatchRunSummary {
    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    pub fn record_failure(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::RateLimited => self.rate_limited += 1,
            FailureKind::SafetyRejected => self.safety_rejected += 1,
            FailureKind::Other => self.other += 1,
        }
    }

    /// 写入失败：撤回对应的成功计数，改记为 Other
    pub fn record_lost_write(&mut self) {
        self.successes = self.successes.saturating_sub(1);
        self.lost_writes += 1;
        self.record_failure(FailureKind::Other);
    }

    pub fn failures(&self) -> usize {
        self.rate_limited + self.safety_rejected + self.other
    }

    /// 生成给调用方看的摘要
    pub fn describe(&self, task: &str) -> String {
        format!(
            "{}: {} succeeded, {} failed (quota={}, safety={}, other={}) in {:.1}s",
            task,
            self.successes,
            self.failures(),
            self.rate_limited,
            self.safety_rejected,
            self.other,
            self.elapsed.as_secs_f64()
        )
    }
}

impl fmt::Display for BatchRunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "successes={}, failures={} (quota={}, safety={}, other={})",
            self.successes,
            self.failures(),
            self.rate_limited,
            self.safety_rejected,
            self.other
        )
    }
}
