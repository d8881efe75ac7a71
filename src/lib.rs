// ==========================================
// 现场服务批量导入 - 核心库
// ==========================================
// 定位: 将外部系统导出的客户/工单文件导入到后端
// 流程: 解码 → 来源识别 → 字段映射 → 标准化 → 分批提交
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体种类 / 标准字段 / 记录 / 结果
pub mod domain;

// 导入层 - 导入管道
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::ImportConfig;

pub use domain::{
    CanonicalField, CanonicalRecord, EntityKind, FieldValue, ImportOutcome, ImportProgress,
    RawRow, RawTable, RowError,
};

pub use importer::{
    BulkImporter, BulkImporterImpl, HttpImportEndpoint, ImportEndpoint, ImportError,
    ImportRequest, ImportResult,
};

// ==========================================
// 常量定义
// ==========================================

// 版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 名称
pub const APP_NAME: &str = "field-service-import";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
