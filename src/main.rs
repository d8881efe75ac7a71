// ==========================================
// 现场服务批量导入 - 命令行入口
// ==========================================
// 子命令:
// - import: 导入客户/工单文件（--dry-run 仅标准化并输出 JSON）
// - template: 输出导入模板 CSV
// ==========================================

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use field_service_import::domain::{CanonicalField, EntityKind};
use field_service_import::i18n::{set_locale, t_with_args};
use field_service_import::importer::{
    template_csv, BulkImporter, BulkImporterImpl, HttpImportEndpoint, ImportRequest,
    LogProgressReporter,
};
use field_service_import::{logging, ImportConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(
    name = "field-service-import",
    version,
    about = "Import customer and job exports from field-service tools into the backend"
)]
struct Args {
    /// Path to a JSON config file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Message language: zh-CN or en
    #[arg(long, global = true, default_value = "zh-CN")]
    locale: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import a CSV/TSV or spreadsheet export
    Import(ImportArgs),
    /// Print a template file with canonical headers and example rows
    Template(TemplateArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Customer,
    Job,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Customer => EntityKind::Customer,
            KindArg::Job => EntityKind::Job,
        }
    }
}

#[derive(Debug, Parser)]
struct ImportArgs {
    /// Export file to import
    file: PathBuf,

    #[arg(long, value_enum)]
    kind: KindArg,

    /// Source profile id (skips auto-detection), e.g. jobber, housecall_pro, generic
    #[arg(long, value_name = "ID")]
    profile: Option<String>,

    /// Bind one canonical field to a source column, e.g. --map email="E-mail Address"
    #[arg(long = "map", value_name = "FIELD=HEADER", value_parser = parse_override)]
    overrides: Vec<(CanonicalField, String)>,

    /// Import endpoint base URL (overrides config)
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Decode, map and normalize only; print records as JSON
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Parser)]
struct TemplateArgs {
    #[arg(long, value_enum)]
    kind: KindArg,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

fn parse_override(raw: &str) -> Result<(CanonicalField, String), String> {
    let (field, header) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=HEADER, got '{}'", raw))?;
    let field = field.parse::<CanonicalField>()?;
    let header = header.trim();
    if header.is_empty() {
        return Err(format!("empty header for field '{}'", field));
    }
    Ok((field, header.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.log_json {
        logging::init_json();
    } else {
        logging::init();
    }
    set_locale(&args.locale);

    match args.command {
        Commands::Import(import) => run_import(args.config, import).await,
        Commands::Template(template) => run_template(template),
    }
}

async fn run_import(config_path: Option<PathBuf>, args: ImportArgs) -> Result<()> {
    let mut config = ImportConfig::load(config_path.as_deref()).context("failed to load config")?;
    if let Some(url) = args.endpoint {
        config.endpoint_url = Some(url);
    }

    let mut request = ImportRequest::new(args.kind.into());
    if let Some(profile) = args.profile {
        request = request.with_profile(profile);
    }
    for (field, header) in args.overrides {
        request = request.with_override(field, header);
    }

    let label = args.file.display().to_string();

    if args.dry_run {
        // 试运行不需要端点，用占位地址构建
        let endpoint = HttpImportEndpoint::new("http://localhost", None, &config)?;
        let importer = BulkImporterImpl::new(&config, Arc::new(endpoint));
        let prepared = importer
            .prepare(&args.file, &request)
            .map_err(|e| anyhow!(e.localized_message(&label)))
            .with_context(|| format!("failed to prepare {}", label))?;

        println!("{}", serde_json::to_string_pretty(&prepared.records)?);
        eprintln!(
            "{}",
            t_with_args(
                "import.dry_run",
                &[
                    ("count", &prepared.records.len().to_string()),
                    ("profile", &prepared.profile.id),
                ],
            )
        );
        let unmapped: Vec<String> = request
            .kind
            .required_fields()
            .iter()
            .filter(|f| !prepared.mapping.is_mapped(**f))
            .map(|f| f.to_string())
            .collect();
        if !unmapped.is_empty() {
            eprintln!(
                "{}",
                t_with_args("import.unmapped_required", &[("fields", &unmapped.join(", "))])
            );
        }
        return Ok(());
    }

    let endpoint = HttpImportEndpoint::from_config(&config)?;
    let importer = BulkImporterImpl::new(&config, Arc::new(endpoint))
        .with_reporter(Arc::new(LogProgressReporter::new(label.clone())));

    let outcome = importer
        .import_file(&args.file, request)
        .await
        .map_err(|e| anyhow!(e.localized_message(&label)))
        .with_context(|| format!("failed to import {}", label))?;

    println!("{}", outcome.summary_text());
    Ok(())
}

fn run_template(args: TemplateArgs) -> Result<()> {
    let kind: EntityKind = args.kind.into();
    let csv = template_csv(kind)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{}",
                t_with_args(
                    "template.written",
                    &[("kind", kind.as_str()), ("path", &path.display().to_string())],
                )
            );
        }
        None => print!("{}", csv),
    }
    Ok(())
}
