// ==========================================
// 批量导入管道 - 导入层
// ==========================================
// 职责: 外部导出文件 → 标准记录 → 分批提交到导入端点
// 支持: CSV/TSV/TXT, XLSX/XLSM/XLS/ODS
// ==========================================

// 模块声明
pub mod batch_orchestrator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_endpoint;
pub mod import_job;
pub mod importer_trait;
pub mod normalizer;
pub mod profile_registry;
pub mod progress;
pub mod template;

// 重导出核心类型
pub use batch_orchestrator::{BatchOrchestrator, OrchestratorSettings, OrchestratorState};
pub use error::{ImportError, ImportResult, ParseError, SubmissionError};
pub use field_mapper::{FieldMapper, FieldMapping};
pub use file_parser::{CsvParser, ExcelParser, SourceFormat, UniversalFileParser};
pub use import_endpoint::{EndpointResponse, EndpointRowError, HttpImportEndpoint};
pub use import_job::{BulkImporterImpl, PreparedImport};
pub use normalizer::Normalizer;
pub use profile_registry::{ProfileRegistry, SchemaProfile, GENERIC_PROFILE_ID};
pub use progress::{
    ChannelProgressReporter, LogProgressReporter, NoOpProgressReporter, ProgressReporter,
};
pub use template::template_csv;

// 重导出 Trait 接口
pub use import_endpoint::ImportEndpoint;
pub use importer_trait::{BulkImporter, FileParser, ImportRequest, RecordNormalizer};
