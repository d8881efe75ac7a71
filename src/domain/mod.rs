// ==========================================
// 批量导入管道 - 领域模型层
// ==========================================
// 职责: 定义实体种类、标准字段、行记录、批次与结果
// 红线: 不含解析逻辑，不含网络调用
// ==========================================

pub mod outcome;
pub mod record;
pub mod types;

// 重导出核心类型
pub use outcome::{partition, BatchInfo, ImportBatch, ImportOutcome, ImportProgress, RowError};
pub use record::{CanonicalRecord, FieldValue, RawRow, RawTable};
pub use types::{CanonicalField, EntityKind};
