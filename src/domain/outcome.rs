// ==========================================
// 批量导入管道 - 批次与导入结果
// ==========================================
// 职责: ImportBatch / ImportOutcome / 进度快照
// 红线: 错误行号始终是源文件行号，不是批内下标
// ==========================================

use crate::domain::record::CanonicalRecord;
use crate::i18n::t_with_args;
use serde::{Deserialize, Serialize};

// ==========================================
// ImportBatch - 提交批次
// ==========================================
// 连续、保序的标准记录切片
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub index: usize,                 // 批次序号（0 起）
    pub start_line_number: usize,     // 首条记录的源文件行号
    pub records: Vec<CanonicalRecord>,
}

impl ImportBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 批内 0 起下标 → 源文件行号
    pub fn line_for_index(&self, index: usize) -> usize {
        self.records
            .get(index)
            .map(|r| r.line_number())
            .unwrap_or(self.start_line_number + index)
    }
}

/// 按固定大小切分，保持顺序并记录每批起始行号
pub fn partition(records: Vec<CanonicalRecord>, batch_size: usize) -> Vec<ImportBatch> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(records.len().div_ceil(batch_size));
    let mut iter = records.into_iter().peekable();
    let mut index = 0;

    while iter.peek().is_some() {
        let chunk: Vec<CanonicalRecord> = iter.by_ref().take(batch_size).collect();
        let start_line_number = chunk[0].line_number();
        batches.push(ImportBatch {
            index,
            start_line_number,
            records: chunk,
        });
        index += 1;
    }

    batches
}

// ==========================================
// RowError - 行级错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub line_number: usize, // 源文件行号
    pub message: String,
}

// ==========================================
// ImportOutcome - 导入结果（跨批次单调累加）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

impl ImportOutcome {
    /// 累加一个批次的计数
    pub fn add_counts(&mut self, imported: usize, updated: usize, skipped: usize) {
        self.imported += imported;
        self.updated += updated;
        self.skipped += skipped;
    }

    pub fn push_error(&mut self, line_number: usize, message: impl Into<String>) {
        self.errors.push(RowError {
            line_number,
            message: message.into(),
        });
    }

    /// 生成可读汇总（计数 + 带行号的错误列表）
    pub fn summary_text(&self) -> String {
        let mut out = t_with_args(
            "import.summary",
            &[
                ("imported", &self.imported.to_string()),
                ("updated", &self.updated.to_string()),
                ("skipped", &self.skipped.to_string()),
                ("errors", &self.errors.len().to_string()),
            ],
        );
        for err in &self.errors {
            out.push('\n');
            out.push_str(&t_with_args(
                "import.error_line",
                &[
                    ("line", &err.line_number.to_string()),
                    ("message", &err.message),
                ],
            ));
        }
        out
    }
}

// ==========================================
// 进度快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInfo {
    pub batch_index: usize, // 当前批次序号（0 起）
    pub batch_count: usize,
    pub batch_size: usize,
    pub start_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub current: usize, // 已处理记录数
    pub total: usize,
    pub percentage: u8,
    pub batch_info: Option<BatchInfo>,
}

impl ImportProgress {
    pub fn new(current: usize, total: usize, batch_info: Option<BatchInfo>) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            ((current.min(total) * 100) / total) as u8
        };
        Self {
            current,
            total,
            percentage,
            batch_info,
        }
    }

    pub fn completed(total: usize) -> Self {
        Self::new(total, total, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::RawRow;

    fn records(n: usize) -> Vec<CanonicalRecord> {
        (0..n)
            .map(|i| CanonicalRecord::new(RawRow::new(vec![], i + 2)))
            .collect()
    }

    #[test]
    fn test_partition_sizes_and_start_lines() {
        let batches = partition(records(230), 100);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![100, 100, 30]);

        let starts: Vec<usize> = batches.iter().map(|b| b.start_line_number).collect();
        assert_eq!(starts, vec![2, 102, 202]);
        assert_eq!(batches[1].line_for_index(99), 201);
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition(Vec::new(), 50).is_empty());
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(ImportProgress::new(0, 230, None).percentage, 0);
        assert_eq!(ImportProgress::new(100, 230, None).percentage, 43);
        assert_eq!(ImportProgress::completed(230).percentage, 100);
        assert_eq!(ImportProgress::completed(0).percentage, 100);
    }

    #[test]
    fn test_outcome_accumulates() {
        let mut outcome = ImportOutcome::default();
        outcome.add_counts(10, 2, 1);
        outcome.add_counts(5, 0, 0);
        outcome.push_error(7, "bad email");
        assert_eq!(outcome.imported, 15);
        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.errors[0].line_number, 7);
    }
}
