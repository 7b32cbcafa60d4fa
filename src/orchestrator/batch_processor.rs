//! 批量调用编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **截断**：只处理前 `limit` 个词（保持输入顺序）
//! 2. **分批**：按 `batch_size` 切分，批与批严格串行
//! 3. **并发**：每批内每个词一个任务，等待全部结束（不因单个失败提前返回）
//! 4. **统计**：按结果类型计数，成功结果交给 [`ResultReconciler`] 异步写入
//! 5. **退避**：本批出现任何限流，暂停 `recovery_delay` 后再开始下一批（最后一批之后不暂停）
//! 6. **节流**：配置了 `inter_batch_delay` 时每批之后固定暂停
//! 7. **收尾**：全部批次结束后等待所有写入完成再返回统计

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::PipelineOptions;
use crate::infrastructure::{Document, Pause};
use crate::models::{BatchRunSummary, CallOutcome, FailureKind, SuccessPayload, WorkItem};
use crate::orchestrator::reconciler::{PendingWrite, PersistMode, ResultReconciler};
use crate::services::RateLimitedCaller;
use crate::utils::logging;

/// 一种流水线任务（生成、精选……）
pub trait PipelineTask: Send + Sync {
    /// 任务名（用于日志和摘要）
    fn name(&self) -> &str;

    /// 为单个词构建提示词
    fn build_prompt(&self, template: &str, item: &WorkItem) -> String;

    /// 把解析出的内容转换为要写入的字段，内容不可用时返回 `None`
    fn to_fields(&self, item: &WorkItem, payload: &SuccessPayload) -> Option<Document>;

    fn persist_mode(&self) -> PersistMode;
}

/// 批量编排器
pub struct BatchOrchestrator {
    caller: RateLimitedCaller,
    reconciler: ResultReconciler,
    pause: Arc<dyn Pause>,
}

impl BatchOrchestrator {
    pub fn new(caller: RateLimitedCaller, reconciler: ResultReconciler, pause: Arc<dyn Pause>) -> Self {
        Self {
            caller,
            reconciler,
            pause,
        }
    }

    /// 运行整条流水线
    pub async fn run(
        &self,
        task: &dyn PipelineTask,
        items: &[WorkItem],
        template: &str,
        options: &PipelineOptions,
    ) -> BatchRunSummary {
        let started = Instant::now();
        let options = options.clone().sanitized();
        let mut summary = BatchRunSummary::default();
        let mut pending: Vec<PendingWrite> = Vec::new();

        let selected = &items[..items.len().min(options.limit)];
        let total = selected.len();
        let total_batches = total.div_ceil(options.batch_size);

        logging::log_run_start(task.name(), total, items.len(), options.batch_size);

        for (batch_idx, batch) in selected.chunks(options.batch_size).enumerate() {
            let batch_num = batch_idx + 1;
            let batch_start = batch_idx * options.batch_size;
            logging::log_batch_start(batch_num, total_batches, batch_start + 1, batch_start + batch.len(), total);

            let outcomes = self.dispatch_batch(task, batch, template).await;
            summary.batches += 1;
            summary.dispatched += batch.len();

            let mut batch_success = 0;
            let mut rate_limited = false;

            for (item, outcome) in batch.iter().zip(outcomes) {
                rate_limited |= outcome.is_rate_limited();
                match outcome {
                    CallOutcome::Success { payload } => match task.to_fields(item, &payload) {
                        Some(fields) => {
                            summary.record_success();
                            batch_success += 1;
                            pending.push(self.reconciler.persist(&item.word, fields, task.persist_mode()));
                        }
                        None => {
                            warn!("[词 {}] ⚠️ 响应中没有可用内容", item.word);
                            self.record_failure(&mut summary, &mut pending, item, FailureKind::Other, &options);
                        }
                    },
                    CallOutcome::Failure { kind } => {
                        self.record_failure(&mut summary, &mut pending, item, kind, &options);
                    }
                }
            }

            logging::log_batch_complete(batch_num, batch_success, batch.len());

            let is_last_batch = batch_num == total_batches;
            if rate_limited && !is_last_batch {
                warn!("⏳ 第 {} 批出现限流，暂停 {:?}", batch_num, options.recovery_delay);
                summary.recovery_pauses += 1;
                self.pause.pause(options.recovery_delay).await;
            } else if rate_limited {
                debug!("最后一批出现限流，无需退避");
            }

            if let Some(delay) = options.inter_batch_delay {
                self.pause.pause(delay).await;
            }
        }

        info!("💾 等待 {} 个写入完成...", pending.len());
        ResultReconciler::drain(pending, &mut summary).await;

        summary.elapsed = started.elapsed();
        logging::print_final_stats(task.name(), &summary);
        summary
    }

    /// 并发调用本批所有词，按输入顺序返回结果
    async fn dispatch_batch(&self, task: &dyn PipelineTask, batch: &[WorkItem], template: &str) -> Vec<CallOutcome> {
        let mut handles = Vec::with_capacity(batch.len());

        for item in batch {
            let prompt = task.build_prompt(template, item);
            let caller = self.caller.clone();
            let handle = tokio::spawn(async move { caller.call(&prompt).await });
            handles.push((item.word.clone(), handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (word, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!("[词 {}] 任务执行失败: {}", word, e);
                    outcomes.push(CallOutcome::failure(FailureKind::Other));
                }
            }
        }
        outcomes
    }

    fn record_failure(
        &self,
        summary: &mut BatchRunSummary,
        pending: &mut Vec<PendingWrite>,
        item: &WorkItem,
        kind: FailureKind,
        options: &PipelineOptions,
    ) {
        summary.record_failure(kind);
        if options.tag_failures {
            pending.push(self.reconciler.tag_failure(&item.word, kind.marker()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::TextGenerator;
    use crate::error::GenerationError;
    use crate::infrastructure::MemoryStore;
    use crate::infrastructure::document_store::DocumentStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::time::Duration;

    /// 按提示词返回预设结果
    struct Scripted {
        replies: HashMap<String, Result<String, GenerationError>>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.calls.lock().push(prompt.to_string());
            self.replies
                .get(prompt)
                .cloned()
                .unwrap_or_else(|| Ok(format!(r#"{{"{}": "clue"}}"#, prompt)))
        }
    }

    #[derive(Default)]
    struct CountingPause {
        pauses: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Pause for CountingPause {
        async fn pause(&self, duration: Duration) {
            self.pauses.lock().push(duration);
        }
    }

    struct EchoTask;

    impl PipelineTask for EchoTask {
        fn name(&self) -> &str {
            "echo"
        }

        fn build_prompt(&self, _template: &str, item: &WorkItem) -> String {
            item.word.clone()
        }

        fn to_fields(&self, item: &WorkItem, payload: &SuccessPayload) -> Option<Document> {
            let value = payload.get(&item.word)?.clone();
            let mut doc = Document::new();
            doc.insert("clue".to_string(), value);
            Some(doc)
        }

        fn persist_mode(&self) -> PersistMode {
            PersistMode::Replace
        }
    }

    fn setup(
        replies: Vec<(&str, Result<&str, &str>)>,
    ) -> (BatchOrchestrator, Arc<Scripted>, Arc<CountingPause>, Arc<MemoryStore>) {
        let generator = Arc::new(Scripted {
            replies: replies
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string).map_err(GenerationError::new)))
                .collect(),
            calls: Mutex::new(Vec::new()),
        });
        let pause = Arc::new(CountingPause::default());
        let store = Arc::new(MemoryStore::new());
        let orchestrator = BatchOrchestrator::new(
            RateLimitedCaller::new(generator.clone()),
            ResultReconciler::new(store.clone(), "words"),
            pause.clone(),
        );
        (orchestrator, generator, pause, store)
    }

    fn options(limit: usize, batch_size: usize) -> PipelineOptions {
        PipelineOptions {
            limit,
            batch_size,
            recovery_delay: Duration::from_secs(60),
            inter_batch_delay: None,
            tag_failures: false,
        }
    }

    fn items(words: &[&str]) -> Vec<WorkItem> {
        words.iter().map(|w| WorkItem::new(*w)).collect()
    }

    #[tokio::test]
    async fn test_dispatch_count_and_batches() {
        let words = ["a", "b", "c", "d", "e", "f", "g"];
        for batch_size in 1..=5 {
            let (orchestrator, generator, _, _) = setup(vec![]);
            let summary = orchestrator
                .run(&EchoTask, &items(&words), "", &options(5, batch_size))
                .await;

            assert_eq!(summary.dispatched, 5);
            assert_eq!(summary.batches, 5usize.div_ceil(batch_size));
            assert_eq!(generator.calls.lock().len(), 5);
        }
    }

    #[tokio::test]
    async fn test_limit_larger_than_items() {
        let (orchestrator, _, _, store) = setup(vec![]);
        let summary = orchestrator.run(&EchoTask, &items(&["a", "b"]), "", &options(10, 4)).await;
        assert_eq!(summary.dispatched, 2);
        assert_eq!(summary.successes, 2);
        assert_eq!(store.len("words"), 2);
    }

    #[tokio::test]
    async fn test_no_rate_limit_means_no_recovery_pause() {
        let (orchestrator, _, pause, _) = setup(vec![("b", Err("SAFETY"))]);
        let summary = orchestrator.run(&EchoTask, &items(&["a", "b", "c"]), "", &options(3, 1)).await;
        assert_eq!(summary.recovery_pauses, 0);
        assert!(pause.pauses.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limits_in_one_batch_pause_once() {
        let (orchestrator, _, pause, _) = setup(vec![("a", Err("429")), ("b", Err("429 again"))]);
        let summary = orchestrator.run(&EchoTask, &items(&["a", "b", "c"]), "", &options(3, 2)).await;

        assert_eq!(summary.rate_limited, 2);
        assert_eq!(summary.recovery_pauses, 1);
        assert_eq!(*pause.pauses.lock(), vec![Duration::from_secs(60)]);
    }

    #[tokio::test]
    async fn test_rate_limit_in_last_batch_skips_recovery_pause() {
        let (orchestrator, _, pause, _) = setup(vec![("c", Err("429"))]);
        let summary = orchestrator.run(&EchoTask, &items(&["a", "b", "c"]), "", &options(3, 2)).await;

        assert_eq!(summary.rate_limited, 1);
        assert_eq!(summary.recovery_pauses, 0);
        assert!(pause.pauses.lock().is_empty());
    }

    #[tokio::test]
    async fn test_inter_batch_delay_after_every_batch() {
        let (orchestrator, _, pause, _) = setup(vec![("a", Err("429"))]);
        let mut opts = options(4, 2);
        opts.inter_batch_delay = Some(Duration::from_millis(5));

        orchestrator.run(&EchoTask, &items(&["a", "b", "c", "d"]), "", &opts).await;

        assert_eq!(
            *pause.pauses.lock(),
            vec![
                Duration::from_secs(60),
                Duration::from_millis(5),
                Duration::from_millis(5)
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_key_in_payload_is_other() {
        let (orchestrator, _, _, store) = setup(vec![("a", Ok(r#"{"zzz": "clue"}"#))]);
        let summary = orchestrator.run(&EchoTask, &items(&["a"]), "", &options(1, 1)).await;
        assert_eq!(summary.other, 1);
        assert_eq!(summary.successes, 0);
        assert_eq!(store.len("words"), 0);
    }

    #[tokio::test]
    async fn test_tag_failures_writes_error_marker() {
        let (orchestrator, _, _, store) = setup(vec![("a", Err("FAILED_PRECONDITION"))]);
        let mut opts = options(1, 1);
        opts.tag_failures = true;

        let summary = orchestrator.run(&EchoTask, &items(&["a"]), "", &opts).await;

        assert_eq!(summary.safety_rejected, 1);
        assert_eq!(summary.persisted, 0);
        let stored = store.get("words", "a").await.unwrap().unwrap();
        assert_eq!(stored.get("error"), Some(&serde_json::json!("safety_rejected")));
    }
}
