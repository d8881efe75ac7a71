// ==========================================
// 批量导入管道 - 导入接口 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 流程: 解码 → 来源识别 → 字段映射 → 标准化 → 分批提交
// ==========================================

use crate::domain::{
    CanonicalField, CanonicalRecord, EntityKind, ImportOutcome, RawRow, RawTable,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapping;
use crate::importer::profile_registry::SchemaProfile;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解码接口（表头 + 有序数据行）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 从内存字节解码
    ///
    /// # 返回
    /// - Ok(RawTable): 空文件/仅表头文件返回零行
    /// - Err: 格式无效
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable>;

    /// 从文件路径解码
    fn parse_file(&self, file_path: &Path) -> ImportResult<RawTable> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }
        let bytes = std::fs::read(file_path)?;
        self.parse_bytes(&bytes)
    }
}

// ==========================================
// RecordNormalizer Trait
// ==========================================
// 用途: 单行标准化接口
// 实现者: Normalizer
// 红线: 永不失败，无法解析的字段降级为空值/默认值
pub trait RecordNormalizer: Send + Sync {
    fn normalize(
        &self,
        row: &RawRow,
        mapping: &FieldMapping,
        profile: &SchemaProfile,
    ) -> CanonicalRecord;

    /// 整表标准化，保持行顺序
    fn normalize_table(
        &self,
        table: &RawTable,
        mapping: &FieldMapping,
        profile: &SchemaProfile,
    ) -> Vec<CanonicalRecord> {
        table
            .rows
            .iter()
            .map(|row| self.normalize(row, mapping, profile))
            .collect()
    }
}

// ==========================================
// ImportRequest - 单次导入请求
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub kind: EntityKind,
    pub profile: Option<String>,                      // 显式指定来源配置（跳过识别）
    pub overrides: Vec<(CanonicalField, String)>,     // 单字段映射覆写
}

impl ImportRequest {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            profile: None,
            overrides: Vec::new(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_override(mut self, field: CanonicalField, header: impl Into<String>) -> Self {
        self.overrides.push((field, header.into()));
        self
    }
}

// ==========================================
// BulkImporter Trait
// ==========================================
// 用途: 导入主接口
// 实现者: BulkImporterImpl
#[async_trait]
pub trait BulkImporter: Send + Sync {
    /// 导入单个文件
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 即使部分批次失败也返回完整汇总
    /// - Err: 解析错误/映射参数错误（在任何提交之前）
    async fn import_file(&self, file_path: &Path, request: ImportRequest)
        -> ImportResult<ImportOutcome>;

    /// 批量导入多个文件（并发执行）
    ///
    /// # 说明
    /// - 每个文件拥有独立的导入上下文，互不影响
    /// - 某个文件失败不影响其他文件
    async fn import_many(
        &self,
        files: Vec<(std::path::PathBuf, ImportRequest)>,
    ) -> Vec<Result<ImportOutcome, String>>;
}
