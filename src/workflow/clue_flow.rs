//! 线索流水线入口 - 流程层
//!
//! 每个任务一个入口（generate / curate），接收 `{prompt, limit?, batchSize?, ...}`，
//! 总是返回摘要字符串，不会整体失败。

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::clients::TextGenerator;
use crate::config::{PipelineOptions, PipelineRequest};
use crate::infrastructure::{DocumentStore, Pause};
use crate::models::{BatchRunSummary, WorkItem};
use crate::orchestrator::{BatchOrchestrator, PipelineTask, ResultReconciler};
use crate::services::RateLimitedCaller;
use crate::workflow::curate::{load_curation_items, CurateClues, DEFAULT_CURATE_PROMPT};
use crate::workflow::generate::{GenerateClues, DEFAULT_GENERATE_PROMPT};

/// 词条集合
pub const WORDS_COLLECTION: &str = "words";

/// 线索流水线
pub struct ClueFlow {
    store: Arc<dyn DocumentStore>,
    orchestrator: BatchOrchestrator,
    defaults: PipelineOptions,
}

impl ClueFlow {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        generator: Arc<dyn TextGenerator>,
        pause: Arc<dyn Pause>,
        defaults: PipelineOptions,
    ) -> Self {
        let orchestrator = BatchOrchestrator::new(
            RateLimitedCaller::new(generator),
            ResultReconciler::new(store.clone(), WORDS_COLLECTION),
            pause,
        );
        Self {
            store,
            orchestrator,
            defaults,
        }
    }

    /// 生成线索，返回统计
    pub async fn generate_summary(&self, request: &PipelineRequest, items: &[WorkItem]) -> BatchRunSummary {
        let template = template_or(&request.prompt, DEFAULT_GENERATE_PROMPT);
        self.run(&GenerateClues, request, items, template).await
    }

    /// 生成线索，返回摘要
    pub async fn generate(&self, request: &PipelineRequest, items: &[WorkItem]) -> String {
        self.generate_summary(request, items).await.describe(GenerateClues.name())
    }

    /// 精选线索，返回统计
    ///
    /// `words` 为空时处理所有尚未精选的词。
    pub async fn curate_summary(&self, request: &PipelineRequest, words: Option<&[String]>) -> BatchRunSummary {
        let started = Instant::now();
        let items = match load_curation_items(self.store.as_ref(), WORDS_COLLECTION, words).await {
            Ok(items) => items,
            Err(e) => {
                error!("❌ 读取待精选的词失败: {:#}", e);
                return BatchRunSummary {
                    elapsed: started.elapsed(),
                    ..Default::default()
                };
            }
        };
        info!("✓ 找到 {} 个待精选的词", items.len());

        let template = template_or(&request.prompt, DEFAULT_CURATE_PROMPT);
        self.run(&CurateClues, request, &items, template).await
    }

    /// 精选线索，返回摘要
    pub async fn curate(&self, request: &PipelineRequest, words: Option<&[String]>) -> String {
        self.curate_summary(request, words).await.describe(CurateClues.name())
    }

    async fn run(
        &self,
        task: &dyn PipelineTask,
        request: &PipelineRequest,
        items: &[WorkItem],
        template: &str,
    ) -> BatchRunSummary {
        let options = self.defaults.with_request(request);
        self.orchestrator.run(task, items, template, &options).await
    }
}

fn template_or<'a>(prompt: &'a str, default: &'a str) -> &'a str {
    if prompt.trim().is_empty() {
        default
    } else {
        prompt
    }
}
