// ==========================================
// 批量导入管道 - 配置层
// ==========================================
// 职责: 导入参数加载（默认值 / JSON 文件 / 环境变量）
// ==========================================

pub mod import_config;

pub use import_config::{config_keys, ImportConfig};
