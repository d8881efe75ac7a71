// ==========================================
// 批量导入管道 - 进度上报
// ==========================================
// 职责: 定义进度上报 trait，编排器只依赖 trait
// 实现: 空操作 / tokio 通道 / 日志
// ==========================================

use crate::domain::ImportProgress;
use tokio::sync::mpsc;
use tracing::{debug, info};

// ==========================================
// 进度上报 Trait
// ==========================================

/// 进度上报者
///
/// 每个批次提交前上报一次，全部批次结束后上报 100%
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: ImportProgress);
}

/// 空操作上报者
///
/// 用于不需要进度的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report(&self, progress: ImportProgress) {
        debug!(
            current = progress.current,
            total = progress.total,
            "NoOpProgressReporter: 跳过进度上报"
        );
    }
}

/// 通道上报者
///
/// 将进度推入无界通道，接收端关闭后静默丢弃
#[derive(Debug, Clone)]
pub struct ChannelProgressReporter {
    sender: mpsc::UnboundedSender<ImportProgress>,
}

impl ChannelProgressReporter {
    pub fn new(sender: mpsc::UnboundedSender<ImportProgress>) -> Self {
        Self { sender }
    }

    /// 创建上报者与对应接收端
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ImportProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ProgressReporter for ChannelProgressReporter {
    fn report(&self, progress: ImportProgress) {
        if self.sender.send(progress).is_err() {
            debug!("进度接收端已关闭");
        }
    }
}

/// 日志上报者
#[derive(Debug, Clone)]
pub struct LogProgressReporter {
    label: String, // 通常为文件名
}

impl LogProgressReporter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressReporter for LogProgressReporter {
    fn report(&self, progress: ImportProgress) {
        match &progress.batch_info {
            Some(batch) => info!(
                source = %self.label,
                current = progress.current,
                total = progress.total,
                percentage = progress.percentage,
                batch = batch.batch_index + 1,
                batch_count = batch.batch_count,
                "导入进度"
            ),
            None => info!(
                source = %self.label,
                current = progress.current,
                total = progress.total,
                percentage = progress.percentage,
                "导入进度"
            ),
        }
    }
}
