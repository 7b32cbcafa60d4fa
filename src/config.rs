use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 每批并发调用的数量
    pub batch_size: usize,
    /// 单次运行最多处理的词数
    pub generation_limit: usize,
    /// 遇到限流后暂停的毫秒数
    pub recovery_delay_ms: u64,
    /// 批次之间固定暂停的毫秒数（0 表示不暂停）
    pub inter_batch_delay_ms: u64,
    /// 是否给失败的词写入 error 标记
    pub tag_failures: bool,
    /// 词表文件（TOML）
    pub words_file: String,
    /// 文档存储快照文件（JSON）
    pub store_snapshot_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 10,
            generation_limit: 100,
            recovery_delay_ms: 60_000,
            inter_batch_delay_ms: 0,
            tag_failures: false,
            words_file: "words.toml".to_string(),
            store_snapshot_file: "store.json".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-1.5-flash".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            batch_size: std::env::var("BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_size),
            generation_limit: std::env::var("GENERATION_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.generation_limit),
            recovery_delay_ms: std::env::var("RECOVERY_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.recovery_delay_ms),
            inter_batch_delay_ms: std::env::var("INTER_BATCH_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.inter_batch_delay_ms),
            tag_failures: std::env::var("TAG_FAILURES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.tag_failures),
            words_file: std::env::var("WORDS_FILE").unwrap_or(default.words_file),
            store_snapshot_file: std::env::var("STORE_SNAPSHOT_FILE").unwrap_or(default.store_snapshot_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        }
    }

    /// 由配置生成流水线参数
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            limit: self.generation_limit,
            batch_size: self.batch_size,
            recovery_delay: Duration::from_millis(self.recovery_delay_ms),
            inter_batch_delay: match self.inter_batch_delay_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            tag_failures: self.tag_failures,
        }
        .sanitized()
    }
}

/// 单次流水线运行的参数
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOptions {
    pub limit: usize,
    pub batch_size: usize,
    pub recovery_delay: Duration,
    pub inter_batch_delay: Option<Duration>,
    pub tag_failures: bool,
}

impl PipelineOptions {
    /// limit 和 batch_size 必须大于 0，非法值按 1 处理
    pub fn sanitized(mut self) -> Self {
        if self.batch_size == 0 {
            warn!("⚠️ batch_size 为 0，按 1 处理");
            self.batch_size = 1;
        }
        if self.limit == 0 {
            warn!("⚠️ limit 为 0，按 1 处理");
            self.limit = 1;
        }
        self
    }

    /// 用请求中的可选字段覆盖默认参数
    pub fn with_request(&self, request: &PipelineRequest) -> Self {
        Self {
            limit: request.limit.unwrap_or(self.limit),
            batch_size: request.batch_size.unwrap_or(self.batch_size),
            recovery_delay: request
                .recovery_delay
                .map(Duration::from_millis)
                .unwrap_or(self.recovery_delay),
            inter_batch_delay: match request.inter_batch_delay {
                Some(0) => None,
                Some(ms) => Some(Duration::from_millis(ms)),
                None => self.inter_batch_delay,
            },
            tag_failures: self.tag_failures,
        }
        .sanitized()
    }
}

/// 流水线入口的请求体
///
/// 延迟字段以毫秒为单位。
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    pub prompt: String,
    pub limit: Option<usize>,
    pub batch_size: Option<usize>,
    pub recovery_delay: Option<u64>,
    pub inter_batch_delay: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_overrides_defaults() {
        let base = Config::default().pipeline_options();
        let request: PipelineRequest = serde_json::from_str(
            r#"{"prompt":"p","limit":5,"batchSize":2,"recoveryDelay":10,"interBatchDelay":0}"#,
        )
        .unwrap();

        let options = base.with_request(&request);
        assert_eq!(options.limit, 5);
        assert_eq!(options.batch_size, 2);
        assert_eq!(options.recovery_delay, Duration::from_millis(10));
        assert_eq!(options.inter_batch_delay, None);
    }

    #[test]
    fn test_zero_sizes_are_clamped() {
        let request = PipelineRequest {
            limit: Some(0),
            batch_size: Some(0),
            ..Default::default()
        };
        let options = Config::default().pipeline_options().with_request(&request);
        assert_eq!(options.limit, 1);
        assert_eq!(options.batch_size, 1);
    }
}
