// ==========================================
// 导入管道集成测试
// ==========================================
// 测试目标: 文件 → 来源识别 → 映射 → 标准化 → 分批提交 → 汇总
// ==========================================

mod test_helpers;

use field_service_import::domain::{CanonicalField, EntityKind};
use field_service_import::importer::*;
use field_service_import::logging;
use std::io::Write;
use std::sync::Arc;
use test_helpers::{fixture, generate_customer_csv, test_config, MockEndpoint};

fn importer_with(endpoint: Arc<MockEndpoint>, batch_size: usize) -> BulkImporterImpl {
    BulkImporterImpl::new(&test_config(batch_size), endpoint)
}

#[tokio::test]
async fn test_jobber_customers_end_to_end() {
    logging::init_test();

    let endpoint = Arc::new(MockEndpoint::new());
    let importer = importer_with(endpoint.clone(), 100);

    let outcome = importer
        .import_file(
            &fixture("jobber_customers.csv"),
            ImportRequest::new(EntityKind::Customer),
        )
        .await
        .expect("导入失败");

    assert_eq!(outcome.imported, 3);
    assert!(outcome.errors.is_empty());

    let batches = endpoint.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].kind, EntityKind::Customer);

    let records = endpoint.records();
    assert_eq!(records[0]["first_name"], "Jane");
    assert_eq!(records[0]["last_name"], "Smith");
    assert_eq!(records[0]["email"], "jane@example.com");
    assert_eq!(records[0]["city"], "Springfield");
    assert_eq!(records[0]["notes"], "Gate code 12, ring twice");
    assert_eq!(records[1]["first_name"], "Madonna");
    assert_eq!(records[1]["last_name"], serde_json::Value::Null);
    assert_eq!(records[2]["notes"], "Prefers \"text\" over calls");

    // 空行不计入行号
    let lines: Vec<u64> = records
        .iter()
        .map(|r| r["line_number"].as_u64().unwrap())
        .collect();
    assert_eq!(lines, vec![2, 3, 4]);
}

#[tokio::test]
async fn test_service_titan_combined_name_and_address() {
    let endpoint = Arc::new(MockEndpoint::new());
    let importer = importer_with(endpoint.clone(), 100);

    let prepared = importer
        .prepare(
            &fixture("service_titan_customers.csv"),
            &ImportRequest::new(EntityKind::Customer),
        )
        .unwrap();
    assert_eq!(prepared.profile.id, "service_titan");

    let jane = &prepared.records[0];
    assert_eq!(jane.text(CanonicalField::FirstName), "Jane");
    assert_eq!(jane.text(CanonicalField::LastName), "Smith");
    assert_eq!(jane.text(CanonicalField::Street), "123 Main St");
    assert_eq!(jane.text(CanonicalField::City), "Springfield");
    assert_eq!(jane.text(CanonicalField::State), "IL");
    assert_eq!(jane.text(CanonicalField::Zip), "62704");
    assert_eq!(jane.text(CanonicalField::Country), "USA");

    let madonna = &prepared.records[1];
    assert_eq!(madonna.text(CanonicalField::FirstName), "Madonna");
    assert_eq!(madonna.text(CanonicalField::LastName), "");
    assert_eq!(madonna.text(CanonicalField::Street), "PO Box 12");
    assert_eq!(madonna.text(CanonicalField::City), "");

    // 试运行不提交
    assert!(endpoint.batches().is_empty());
}

#[tokio::test]
async fn test_housecall_pro_jobs_schedule_and_price() {
    let endpoint = Arc::new(MockEndpoint::new());
    let importer = importer_with(endpoint.clone(), 100);

    let outcome = importer
        .import_file(
            &fixture("housecall_pro_jobs.csv"),
            ImportRequest::new(EntityKind::Job),
        )
        .await
        .unwrap();
    assert_eq!(outcome.imported, 2);

    let records = endpoint.records();
    assert_eq!(records[0]["job_number"], "J-501");
    assert_eq!(records[0]["scheduled_date"], "2024-03-15");
    assert_eq!(records[0]["scheduled_time"], "09:00");
    assert_eq!(records[0]["scheduled_at"], "2024-03-15T09:00:00-05:00");
    assert_eq!(records[0]["price"], 149.0);
    assert_eq!(records[0]["zip"], "62704");
    assert_eq!(records[0]["country"], "US");

    // 无法解析的排期降级为空，不影响同行其他字段
    assert!(records[1].get("scheduled_date").is_none());
    assert!(records[1].get("scheduled_at").is_none());
    assert_eq!(records[1]["price"], 1250.0);
    assert_eq!(records[1]["first_name"], "Carlos");
}

#[tokio::test]
async fn test_jobber_jobs_tsv_discrete_schedule() {
    let endpoint = Arc::new(MockEndpoint::new());
    let importer = importer_with(endpoint.clone(), 100);

    importer
        .import_file(&fixture("jobber_jobs.tsv"), ImportRequest::new(EntityKind::Job))
        .await
        .unwrap();

    let records = endpoint.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["title"], "Gutter cleaning");
    assert_eq!(records[0]["scheduled_at"], "2024-03-18T14:30:00");
    assert_eq!(records[0]["price"], 89.5);
    assert_eq!(records[1]["first_name"], "Bob");
    assert_eq!(records[1]["scheduled_date"], "2024-03-19");
    assert_eq!(records[1]["scheduled_time"], "09:00");
    assert_eq!(records[1]["price"], -10.0);
}

#[tokio::test]
async fn test_failed_batch_reports_file_relative_lines() {
    let file = generate_customer_csv(230);
    let endpoint = Arc::new(MockEndpoint::new().failing_batches(&[1]));
    let importer = importer_with(endpoint.clone(), 100);

    let outcome = importer
        .import_file(file.path(), ImportRequest::new(EntityKind::Customer))
        .await
        .unwrap();

    let sizes: Vec<usize> = endpoint.batches().iter().map(|b| b.records.len()).collect();
    assert_eq!(sizes, vec![100, 100, 30]);
    let starts: Vec<usize> = endpoint.batches().iter().map(|b| b.start_line).collect();
    assert_eq!(starts, vec![2, 102, 202]);

    assert_eq!(outcome.imported, 130);
    assert_eq!(outcome.errors.len(), 100);
    let lines: Vec<usize> = outcome.errors.iter().map(|e| e.line_number).collect();
    assert_eq!(lines, (102..=201).collect::<Vec<_>>());

    let summary = outcome.summary_text();
    assert!(summary.contains("102"));
    assert!(summary.contains("201"));
}

#[tokio::test]
async fn test_endpoint_row_errors_reoffset_to_file_lines() {
    let file = generate_customer_csv(25);
    let endpoint = Arc::new(MockEndpoint::new().rejecting_lines(&[3, 14, 26]));
    let importer = importer_with(endpoint, 10);

    let outcome = importer
        .import_file(file.path(), ImportRequest::new(EntityKind::Customer))
        .await
        .unwrap();

    assert_eq!(outcome.imported, 22);
    let lines: Vec<usize> = outcome.errors.iter().map(|e| e.line_number).collect();
    assert_eq!(lines, vec![3, 14, 26]);
}

#[tokio::test]
async fn test_header_only_file_aborts_before_submission() {
    let endpoint = Arc::new(MockEndpoint::new());
    let importer = importer_with(endpoint.clone(), 100);

    let err = importer
        .import_file(&fixture("header_only.csv"), ImportRequest::new(EntityKind::Customer))
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Parse(ParseError::EmptyFile)));
    assert!(endpoint.batches().is_empty());
}

#[tokio::test]
async fn test_unsupported_extension() {
    let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    writeln!(file, "not a table").unwrap();

    let importer = importer_with(Arc::new(MockEndpoint::new()), 100);
    let err = importer
        .import_file(file.path(), ImportRequest::new(EntityKind::Customer))
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat(_)));
}

#[tokio::test]
async fn test_xlsx_generic_profile_with_overrides() {
    let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Given").unwrap();
    sheet.write_string(0, 1, "Family").unwrap();
    sheet.write_string(0, 2, "Postcode").unwrap();
    sheet.write_string(1, 0, "Jane").unwrap();
    sheet.write_string(1, 1, "Smith").unwrap();
    sheet.write_number(1, 2, 62704.0).unwrap();
    workbook.save(file.path()).unwrap();

    let endpoint = Arc::new(MockEndpoint::new());
    let importer = importer_with(endpoint.clone(), 100);
    let request = ImportRequest::new(EntityKind::Customer)
        .with_profile("generic")
        .with_override(CanonicalField::FirstName, "Given")
        .with_override(CanonicalField::LastName, "Family")
        .with_override(CanonicalField::Zip, "Postcode");

    let outcome = importer.import_file(file.path(), request).await.unwrap();
    assert_eq!(outcome.imported, 1);

    let records = endpoint.records();
    assert_eq!(records[0]["first_name"], "Jane");
    assert_eq!(records[0]["last_name"], "Smith");
    assert_eq!(records[0]["zip"], "62704");
}

#[tokio::test]
async fn test_progress_stream() {
    let file = generate_customer_csv(45);
    let (reporter, mut rx) = ChannelProgressReporter::channel();
    let importer =
        importer_with(Arc::new(MockEndpoint::new()), 20).with_reporter(Arc::new(reporter));

    importer
        .import_file(file.path(), ImportRequest::new(EntityKind::Customer))
        .await
        .unwrap();

    let mut updates = Vec::new();
    while let Ok(p) = rx.try_recv() {
        updates.push(p);
    }
    let percentages: Vec<u8> = updates.iter().map(|p| p.percentage).collect();
    assert_eq!(percentages, vec![0, 44, 88, 100]);
    let batch = updates[2].batch_info.as_ref().unwrap();
    assert_eq!(batch.batch_count, 3);
    assert_eq!(batch.batch_size, 5);
    assert_eq!(batch.start_line, 42);
}
