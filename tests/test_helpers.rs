// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 模拟导入端点（记录批次 / 脚本化失败）、测试文件生成
// ==========================================
#![allow(dead_code)]

use async_trait::async_trait;
use field_service_import::config::ImportConfig;
use field_service_import::domain::{EntityKind, ImportBatch};
use field_service_import::importer::{
    EndpointResponse, EndpointRowError, ImportEndpoint, SubmissionError,
};
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// 模拟端点收到的一个批次
#[derive(Debug, Clone)]
pub struct RecordedBatch {
    pub kind: EntityKind,
    pub index: usize,
    pub start_line: usize,
    pub records: Vec<serde_json::Value>,
}

/// 模拟导入端点
///
/// - fail_batches: 这些批次整批返回 HTTP 500
/// - reject_lines: 这些源文件行号以 1 起 row 返回行错误
#[derive(Default)]
pub struct MockEndpoint {
    fail_batches: HashSet<usize>,
    reject_lines: HashSet<usize>,
    batches: Mutex<Vec<RecordedBatch>>,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_batches(mut self, batches: &[usize]) -> Self {
        self.fail_batches = batches.iter().copied().collect();
        self
    }

    pub fn rejecting_lines(mut self, lines: &[usize]) -> Self {
        self.reject_lines = lines.iter().copied().collect();
        self
    }

    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.lock().unwrap().clone()
    }

    /// 全部提交过的记录（按提交顺序）
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.batches()
            .into_iter()
            .flat_map(|b| b.records)
            .collect()
    }
}

#[async_trait]
impl ImportEndpoint for MockEndpoint {
    async fn submit(
        &self,
        kind: EntityKind,
        batch: &ImportBatch,
    ) -> Result<EndpointResponse, SubmissionError> {
        let records = batch
            .records
            .iter()
            .map(|r| serde_json::to_value(r).unwrap())
            .collect();
        self.batches.lock().unwrap().push(RecordedBatch {
            kind,
            index: batch.index,
            start_line: batch.start_line_number,
            records,
        });

        if self.fail_batches.contains(&batch.index) {
            return Err(SubmissionError::Server {
                status: 500,
                body: "internal error".to_string(),
            });
        }

        let errors: Vec<EndpointRowError> = batch
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.reject_lines.contains(&r.line_number()))
            .map(|(i, _)| EndpointRowError {
                index: None,
                row: Some(i + 1),
                message: "rejected by endpoint".to_string(),
            })
            .collect();

        Ok(EndpointResponse {
            imported: batch.len() - errors.len(),
            updated: 0,
            skipped: 0,
            errors,
        })
    }
}

/// 测试用配置: 无批间延迟
pub fn test_config(batch_size: usize) -> ImportConfig {
    ImportConfig {
        batch_size,
        inter_batch_delay_ms: 0,
        retry_backoff_ms: 0,
        ..ImportConfig::default()
    }
}

/// fixtures 目录下的文件路径
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// 生成 n 行 Jobber 风格客户 CSV（临时文件需要保持存活）
pub fn generate_customer_csv(n: usize) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .unwrap();
    writeln!(file, "Client name,E-mail,Billing street 1,Billing city").unwrap();
    for i in 0..n {
        writeln!(
            file,
            "Customer{} Test,customer{}@example.com,{} Main St,Springfield",
            i, i, i
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}
