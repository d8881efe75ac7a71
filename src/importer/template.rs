// ==========================================
// 批量导入管道 - 导入模板导出
// ==========================================
// 职责: 生成标准列名 + 两行示例数据的 CSV 模板
// 说明: 纯文档用途，管道本身从不读取
// ==========================================

use crate::domain::{CanonicalField, EntityKind};
use crate::importer::error::ImportResult;

fn example_value(field: CanonicalField, row: usize) -> &'static str {
    use CanonicalField::*;
    let pair: [&'static str; 2] = match field {
        FirstName => ["Jane", "Carlos"],
        LastName => ["Smith", "Rivera"],
        CompanyName => ["", "Rivera Plumbing LLC"],
        Email => ["jane@example.com", "carlos@example.com"],
        Phone => ["(555) 123-4567", "555-987-6543"],
        Street => ["123 Main St", "500 Oak Ave, Suite 2"],
        City => ["Springfield", "Austin"],
        State => ["IL", "TX"],
        Zip => ["62704", "78701"],
        Country => ["USA", "USA"],
        Notes => ["Gate code 1234", ""],
        JobNumber => ["1001", "1002"],
        Title => ["Spring AC tune-up", "Water heater install"],
        Description => ["Annual maintenance visit", "Replace 40 gal tank"],
        ScheduledAt => ["2024-03-15T09:00:00-05:00", ""],
        ScheduledDate => ["", "03/18/2024"],
        ScheduledTime => ["", "2:30 PM"],
        Price => ["149.00", "1250.00"],
        Status => ["scheduled", "unscheduled"],
    };
    pair[row]
}

/// 生成指定实体种类的 CSV 模板
pub fn template_csv(kind: EntityKind) -> ImportResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(kind.fields().iter().map(|f| f.key()))?;
    for row in 0..2 {
        writer.write_record(kind.fields().iter().map(|f| example_value(*f, row)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("模板写出失败: {}", e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::CsvParser;

    #[test]
    fn test_template_has_headers_and_two_rows() {
        let text = template_csv(EntityKind::Job).unwrap();
        let table = CsvParser::with_delimiter(b',').parse_str(&text).unwrap();

        let expected: Vec<String> = EntityKind::Job
            .fields()
            .iter()
            .map(|f| f.key().to_string())
            .collect();
        assert_eq!(table.headers, expected);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].value("street"), Some("500 Oak Ave, Suite 2"));
    }

    #[test]
    fn test_customer_template_excludes_job_fields() {
        let text = template_csv(EntityKind::Customer).unwrap();
        let header_line = text.lines().next().unwrap();
        assert!(header_line.starts_with("first_name,last_name"));
        assert!(!header_line.contains("price"));
    }
}
