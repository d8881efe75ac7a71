// ==========================================
// 批量导入管道 - 导入任务
// ==========================================
// 职责: 单次导入的上下文对象，贯穿 解码 → 映射 → 标准化 → 提交
// 流程: 解码 → 空文件检查 → 来源配置 → 字段映射 → 单字段覆写 → 标准化 → 分批提交
// 红线:
// - 无进程级可变状态，每个任务独占自己的表/映射/结果，可安全并发
// - 解析与参数错误在任何提交之前返回
// ==========================================

use crate::config::ImportConfig;
use crate::domain::{CanonicalRecord, EntityKind, ImportOutcome, RawTable};
use crate::importer::batch_orchestrator::{BatchOrchestrator, OrchestratorSettings};
use crate::importer::error::{ImportError, ImportResult, ParseError};
use crate::importer::field_mapper::{FieldMapper, FieldMapping};
use crate::importer::file_parser::{CsvParser, SourceFormat, UniversalFileParser};
use crate::importer::import_endpoint::ImportEndpoint;
use crate::importer::importer_trait::{BulkImporter, ImportRequest, RecordNormalizer};
use crate::importer::normalizer::Normalizer;
use crate::importer::profile_registry::{ProfileRegistry, SchemaProfile};
use crate::importer::progress::{NoOpProgressReporter, ProgressReporter};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// PreparedImport - 已标准化、待提交的任务上下文
// ==========================================
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub job_id: String,
    pub kind: EntityKind,
    pub profile: SchemaProfile,
    pub mapping: FieldMapping,
    pub records: Vec<CanonicalRecord>,
}

impl PreparedImport {
    /// 从已解码的表构建任务上下文（表在此被消费）
    ///
    /// # 返回
    /// - Err(Parse(EmptyFile)): 无数据行
    /// - Err(UnknownProfile / UnknownHeader): 调用方参数无效
    pub fn from_table(
        table: RawTable,
        request: &ImportRequest,
        normalizer: &dyn RecordNormalizer,
    ) -> ImportResult<Self> {
        let job_id = Uuid::new_v4().to_string();

        if table.is_empty() {
            return Err(ParseError::EmptyFile.into());
        }

        let registry = ProfileRegistry::new(request.kind);
        let profile = registry
            .resolve(request.profile.as_deref(), &table.headers)?
            .clone();

        let mut mapping = FieldMapper.build_mapping(request.kind, &profile, &table.headers);
        apply_overrides(&mut mapping, request, &table.headers)?;

        if !mapping.is_complete_for(request.kind.required_fields()) {
            warn!(
                job_id = %job_id,
                unmapped = ?mapping.unmapped_fields(),
                "必填字段未映射，交由端点校验"
            );
        }

        let records = normalizer.normalize_table(&table, &mapping, &profile);

        info!(
            job_id = %job_id,
            kind = %request.kind,
            profile = %profile.id,
            mapped = mapping.mapped_count(),
            records = records.len(),
            "导入任务准备完成"
        );

        Ok(Self {
            job_id,
            kind: request.kind,
            profile,
            mapping,
            records,
        })
    }
}

/// 应用单字段覆写，列名不区分大小写但绑定为实际表头
fn apply_overrides(
    mapping: &mut FieldMapping,
    request: &ImportRequest,
    headers: &[String],
) -> ImportResult<()> {
    for (field, wanted) in &request.overrides {
        if !request.kind.fields().contains(field) {
            return Err(ImportError::Config {
                key: field.key().to_string(),
                message: format!("{} 不包含该字段", request.kind),
            });
        }
        let header = headers
            .iter()
            .find(|h| h.trim().eq_ignore_ascii_case(wanted.trim()))
            .ok_or_else(|| ImportError::UnknownHeader {
                field: field.key().to_string(),
                header: wanted.clone(),
            })?;
        debug!(field = %field, header = %header, "字段映射覆写");
        mapping.override_field(*field, Some(header.clone()));
    }
    Ok(())
}

// ==========================================
// BulkImporterImpl - 导入器实现
// ==========================================
pub struct BulkImporterImpl {
    // 导入组件
    file_parser: UniversalFileParser,
    normalizer: Box<dyn RecordNormalizer>,

    // 外部协作者
    endpoint: Arc<dyn ImportEndpoint>,
    reporter: Arc<dyn ProgressReporter>,

    settings: OrchestratorSettings,
}

impl BulkImporterImpl {
    /// 创建导入器
    ///
    /// # 参数
    /// - config: 导入配置（分隔符 / 分批 / 重试）
    /// - endpoint: 外部导入端点
    pub fn new(config: &ImportConfig, endpoint: Arc<dyn ImportEndpoint>) -> Self {
        let csv = match config.delimiter_byte() {
            Some(d) => CsvParser::with_delimiter(d),
            None => CsvParser::new(),
        };
        Self {
            file_parser: UniversalFileParser::new(csv),
            normalizer: Box::new(Normalizer),
            endpoint,
            reporter: Arc::new(NoOpProgressReporter),
            settings: OrchestratorSettings::from(config),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// 解码并标准化文件，不提交（试运行）
    pub fn prepare(&self, file_path: &Path, request: &ImportRequest) -> ImportResult<PreparedImport> {
        let table = self.file_parser.parse(file_path)?;
        PreparedImport::from_table(table, request, self.normalizer.as_ref())
    }

    /// 从内存字节导入
    pub async fn import_bytes(
        &self,
        bytes: &[u8],
        format: SourceFormat,
        request: ImportRequest,
    ) -> ImportResult<ImportOutcome> {
        let table = self.file_parser.parse_bytes(bytes, format)?;
        let prepared = PreparedImport::from_table(table, &request, self.normalizer.as_ref())?;
        Ok(self.submit(prepared).await)
    }

    /// 提交已准备好的任务，始终返回完整汇总
    pub async fn submit(&self, prepared: PreparedImport) -> ImportOutcome {
        let mut orchestrator = BatchOrchestrator::new(self.endpoint.clone(), self.settings.clone())
            .with_reporter(self.reporter.clone());
        orchestrator.run(prepared.kind, prepared.records).await
    }
}

#[async_trait]
impl BulkImporter for BulkImporterImpl {
    #[instrument(skip(self, file_path, request), fields(kind = %request.kind))]
    async fn import_file(
        &self,
        file_path: &Path,
        request: ImportRequest,
    ) -> ImportResult<ImportOutcome> {
        let start_time = Instant::now();
        info!(file_path = %file_path.display(), "开始导入");

        let prepared = self.prepare(file_path, &request).map_err(|e| {
            error!(file_path = %file_path.display(), error = %e, "导入准备失败");
            e
        })?;
        let job_id = prepared.job_id.clone();
        let outcome = self.submit(prepared).await;

        info!(
            job_id = %job_id,
            imported = outcome.imported,
            updated = outcome.updated,
            skipped = outcome.skipped,
            errors = outcome.errors.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "导入完成"
        );
        Ok(outcome)
    }

    /// 批量导入多个文件（并发执行）
    async fn import_many(
        &self,
        files: Vec<(PathBuf, ImportRequest)>,
    ) -> Vec<Result<ImportOutcome, String>> {
        use futures::future::join_all;

        info!(count = files.len(), "开始批量导入文件");

        let import_tasks = files.into_iter().map(|(path, request)| async move {
            let path_str = path.display().to_string();
            match self.import_file(&path, request).await {
                Ok(outcome) => {
                    info!(file = %path_str, imported = outcome.imported, "文件导入成功");
                    Ok(outcome)
                }
                Err(e) => {
                    error!(file = %path_str, error = %e, "文件导入失败");
                    Err(format!("文件 {} 导入失败: {}", path_str, e))
                }
            }
        });

        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );

        results
    }
}
