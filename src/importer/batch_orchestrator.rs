// ==========================================
// 批量导入管道 - 分批提交编排器
// ==========================================
// 状态机: Idle → Running(batch_index) → Completed（无暂停/取消）
// 流程: 切分批次 → 逐批上报进度并提交 → 累加结果 → 批间固定延迟 → 100%
// 红线:
// - 批次严格串行提交，不并行
// - 整批失败不中止任务，为批内每条记录生成一条错误
// - 报告的行号始终是源文件行号
// ==========================================

use crate::config::ImportConfig;
use crate::domain::{partition, BatchInfo, CanonicalRecord, EntityKind, ImportBatch, ImportOutcome, ImportProgress};
use crate::i18n::t_with_args;
use crate::importer::error::SubmissionError;
use crate::importer::import_endpoint::{EndpointResponse, ImportEndpoint};
use crate::importer::progress::{NoOpProgressReporter, ProgressReporter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// 编排器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running { batch_index: usize },
    Completed,
}

/// 编排参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&ImportConfig::default())
    }
}

impl From<&ImportConfig> for OrchestratorSettings {
    fn from(config: &ImportConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            inter_batch_delay: config.inter_batch_delay(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        }
    }
}

// ==========================================
// BatchOrchestrator
// ==========================================
pub struct BatchOrchestrator {
    endpoint: Arc<dyn ImportEndpoint>,
    reporter: Arc<dyn ProgressReporter>,
    settings: OrchestratorSettings,
    state: OrchestratorState,
}

impl BatchOrchestrator {
    pub fn new(endpoint: Arc<dyn ImportEndpoint>, settings: OrchestratorSettings) -> Self {
        Self {
            endpoint,
            reporter: Arc::new(NoOpProgressReporter),
            settings,
            state: OrchestratorState::Idle,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// 逐批提交全部记录，返回汇总结果
    ///
    /// # 返回
    /// - 始终返回 ImportOutcome，批次失败已降级为行错误
    #[instrument(skip(self, records), fields(kind = %kind, total = records.len()))]
    pub async fn run(&mut self, kind: EntityKind, records: Vec<CanonicalRecord>) -> ImportOutcome {
        let total = records.len();
        let batches = partition(records, self.settings.batch_size);
        let batch_count = batches.len();
        let mut outcome = ImportOutcome::default();
        let mut processed = 0;

        info!(batch_count, batch_size = self.settings.batch_size, "开始分批提交");

        for batch in &batches {
            self.state = OrchestratorState::Running {
                batch_index: batch.index,
            };
            self.reporter.report(ImportProgress::new(
                processed,
                total,
                Some(BatchInfo {
                    batch_index: batch.index,
                    batch_count,
                    batch_size: batch.len(),
                    start_line: batch.start_line_number,
                }),
            ));
            debug!(
                batch_index = batch.index,
                start_line = batch.start_line_number,
                size = batch.len(),
                "提交批次"
            );

            match self.submit_with_retry(kind, batch).await {
                Ok(resp) => apply_response(&mut outcome, batch, resp),
                Err(err) => {
                    warn!(
                        batch_index = batch.index,
                        start_line = batch.start_line_number,
                        size = batch.len(),
                        error = %err,
                        "批次提交失败，生成逐行错误"
                    );
                    apply_failure(&mut outcome, batch, &err);
                }
            }

            processed += batch.len();
            if batch.index + 1 < batch_count && !self.settings.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_batch_delay).await;
            }
        }

        self.reporter.report(ImportProgress::completed(total));
        self.state = OrchestratorState::Completed;
        info!(
            imported = outcome.imported,
            updated = outcome.updated,
            skipped = outcome.skipped,
            errors = outcome.errors.len(),
            "分批提交完成"
        );
        outcome
    }

    /// 瞬时故障按线性退避重试，max_retries = 0 时只提交一次
    async fn submit_with_retry(
        &self,
        kind: EntityKind,
        batch: &ImportBatch,
    ) -> Result<EndpointResponse, SubmissionError> {
        let mut attempt: u32 = 0;
        loop {
            match self.endpoint.submit(kind, batch).await {
                Ok(resp) => return Ok(resp),
                Err(err) if err.is_transient() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let backoff = self.settings.retry_backoff * attempt;
                    warn!(
                        batch_index = batch.index,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "批次提交瞬时失败，重试"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// 累加端点结果，行错误换算为源文件行号
fn apply_response(outcome: &mut ImportOutcome, batch: &ImportBatch, resp: EndpointResponse) {
    outcome.add_counts(resp.imported, resp.updated, resp.skipped);
    for err in resp.errors {
        let line = err
            .batch_index()
            .map(|i| batch.line_for_index(i))
            .unwrap_or(batch.start_line_number);
        outcome.push_error(line, err.message);
    }
}

/// 整批失败: 批内每条记录一条错误
fn apply_failure(outcome: &mut ImportOutcome, batch: &ImportBatch, err: &SubmissionError) {
    let message = t_with_args(
        "import.batch_failed",
        &[
            ("batch", &(batch.index + 1).to_string()),
            ("error", &err.to_string()),
        ],
    );
    for record in &batch.records {
        outcome.push_error(record.line_number(), message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRow;
    use crate::importer::import_endpoint::EndpointRowError;
    use crate::importer::progress::ChannelProgressReporter;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct ScriptedEndpoint {
        fail_batches: HashSet<usize>,
        transient_failures: Mutex<u32>, // 前 N 次调用返回瞬时故障
        calls: Mutex<Vec<usize>>,
    }

    impl ScriptedEndpoint {
        fn new(fail_batches: &[usize]) -> Self {
            Self {
                fail_batches: fail_batches.iter().copied().collect(),
                transient_failures: Mutex::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImportEndpoint for ScriptedEndpoint {
        async fn submit(
            &self,
            _kind: EntityKind,
            batch: &ImportBatch,
        ) -> Result<EndpointResponse, SubmissionError> {
            self.calls.lock().unwrap().push(batch.index);
            {
                let mut remaining = self.transient_failures.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SubmissionError::Transport("connection reset".into()));
                }
            }
            if self.fail_batches.contains(&batch.index) {
                return Err(SubmissionError::Server {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(EndpointResponse {
                imported: batch.len() - 1,
                updated: 0,
                skipped: 0,
                errors: vec![EndpointRowError {
                    index: Some(0),
                    row: None,
                    message: "duplicate".into(),
                }],
            })
        }
    }

    fn records(n: usize) -> Vec<CanonicalRecord> {
        (0..n)
            .map(|i| CanonicalRecord::new(RawRow::new(vec![], i + 2)))
            .collect()
    }

    fn settings(max_retries: u32) -> OrchestratorSettings {
        OrchestratorSettings {
            batch_size: 100,
            inter_batch_delay: Duration::ZERO,
            max_retries,
            retry_backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_failed_batch_yields_one_error_per_record() {
        let endpoint = Arc::new(ScriptedEndpoint::new(&[1]));
        let mut orchestrator = BatchOrchestrator::new(endpoint.clone(), settings(0));
        assert_eq!(orchestrator.state(), OrchestratorState::Idle);

        let outcome = orchestrator.run(EntityKind::Customer, records(230)).await;

        assert_eq!(orchestrator.state(), OrchestratorState::Completed);
        assert_eq!(*endpoint.calls.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(outcome.imported, 99 + 29);

        let mut synthetic: Vec<usize> = outcome
            .errors
            .iter()
            .filter(|e| e.message != "duplicate")
            .map(|e| e.line_number)
            .collect();
        synthetic.sort_unstable();
        assert_eq!(synthetic, (102..=201).collect::<Vec<_>>());

        let endpoint_errors: Vec<usize> = outcome
            .errors
            .iter()
            .filter(|e| e.message == "duplicate")
            .map(|e| e.line_number)
            .collect();
        assert_eq!(endpoint_errors, vec![2, 202]);
    }

    #[tokio::test]
    async fn test_progress_reported_per_batch_then_complete() {
        let endpoint = Arc::new(ScriptedEndpoint::new(&[]));
        let (reporter, mut rx) = ChannelProgressReporter::channel();
        let mut orchestrator =
            BatchOrchestrator::new(endpoint, settings(0)).with_reporter(Arc::new(reporter));

        orchestrator.run(EntityKind::Job, records(230)).await;

        let mut updates = Vec::new();
        while let Ok(p) = rx.try_recv() {
            updates.push(p);
        }
        let currents: Vec<usize> = updates.iter().map(|p| p.current).collect();
        assert_eq!(currents, vec![0, 100, 200, 230]);
        assert_eq!(updates[1].batch_info.as_ref().unwrap().start_line, 102);
        assert_eq!(updates[2].batch_info.as_ref().unwrap().batch_size, 30);
        assert_eq!(updates.last().unwrap().percentage, 100);
    }

    #[tokio::test]
    async fn test_transient_failure_retried_when_enabled() {
        let endpoint = Arc::new(ScriptedEndpoint::new(&[]));
        *endpoint.transient_failures.lock().unwrap() = 1;
        let mut orchestrator = BatchOrchestrator::new(endpoint.clone(), settings(2));

        let outcome = orchestrator.run(EntityKind::Customer, records(10)).await;

        assert_eq!(*endpoint.calls.lock().unwrap(), vec![0, 0]);
        assert_eq!(outcome.imported, 9);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let endpoint = Arc::new(ScriptedEndpoint::new(&[]));
        *endpoint.transient_failures.lock().unwrap() = 1;
        let mut orchestrator = BatchOrchestrator::new(endpoint.clone(), settings(0));

        let outcome = orchestrator.run(EntityKind::Customer, records(10)).await;

        assert_eq!(*endpoint.calls.lock().unwrap(), vec![0]);
        assert_eq!(outcome.imported, 0);
        assert_eq!(outcome.errors.len(), 10);
    }

    #[tokio::test]
    async fn test_empty_record_list_completes() {
        let endpoint = Arc::new(ScriptedEndpoint::new(&[]));
        let mut orchestrator = BatchOrchestrator::new(endpoint.clone(), settings(0));
        let outcome = orchestrator.run(EntityKind::Customer, Vec::new()).await;
        assert_eq!(outcome, ImportOutcome::default());
        assert!(endpoint.calls.lock().unwrap().is_empty());
        assert_eq!(orchestrator.state(), OrchestratorState::Completed);
    }
}
