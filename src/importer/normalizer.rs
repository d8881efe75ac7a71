// ==========================================
// 批量导入管道 - 记录标准化器实现
// ==========================================
// 职责: 原始行 + 字段映射 → 标准记录（姓名 / 地址 / 排期 / 金额）
// 红线: 永不失败；单个字段无法解析时只降级该字段，不中断整行
// ==========================================

pub mod address;
pub mod datetime;

use crate::domain::{CanonicalField, CanonicalRecord, FieldValue, RawRow};
use crate::importer::field_mapper::FieldMapping;
use crate::importer::importer_trait::RecordNormalizer;
use crate::importer::profile_registry::SchemaProfile;
use address::{parse_address, AddressParts};
use datetime::{parse_schedule, ScheduleInput, ScheduleTimestamp};
use tracing::debug;

use CanonicalField::*;

// 由专门规则处理的字段，其余字段按去空白文本处理
const STRUCTURED_FIELDS: &[CanonicalField] = &[
    FirstName,
    LastName,
    Email,
    Street,
    City,
    State,
    Zip,
    Country,
    ScheduledAt,
    ScheduledDate,
    ScheduledTime,
    Price,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl RecordNormalizer for Normalizer {
    fn normalize(
        &self,
        row: &RawRow,
        mapping: &FieldMapping,
        profile: &SchemaProfile,
    ) -> CanonicalRecord {
        let kind = mapping.kind();
        let mut record = CanonicalRecord::new(row.clone());

        let (first, last) = normalize_name(row, mapping);
        record.set(FirstName, FieldValue::text(first));
        record.set(LastName, FieldValue::text(last));

        if let Some(email) = mapping.value_of(row, Email) {
            record.set(Email, FieldValue::text(email.to_lowercase()));
        }

        let mut parts = normalize_address(row, mapping);
        if parts.country.is_empty() {
            if let Some(country) = &profile.default_country {
                parts.country = country.clone();
            }
        }
        record.set(Street, FieldValue::text(parts.street));
        record.set(City, FieldValue::text(parts.city));
        record.set(State, FieldValue::text(parts.state));
        record.set(Zip, FieldValue::text(parts.zip));
        record.set(Country, FieldValue::text(parts.country));

        if kind.fields().contains(&ScheduledDate) {
            normalize_schedule(row, mapping, &mut record);
        }

        if kind.fields().contains(&Price) {
            let amount = mapping.value_of(row, Price).map(parse_money).unwrap_or(0.0);
            record.set(Price, FieldValue::Money(amount));
        }

        for field in kind.fields() {
            if STRUCTURED_FIELDS.contains(field) {
                continue;
            }
            if let Some(value) = mapping.value_of(row, *field) {
                record.set(*field, FieldValue::text(value));
            }
        }

        record
    }
}

// ==========================================
// 姓名
// ==========================================

/// 名/姓绑定到同一列时按空白拆分完整姓名，否则分别取值
fn normalize_name(row: &RawRow, mapping: &FieldMapping) -> (String, String) {
    if mapping.shares_header(FirstName, LastName) {
        return mapping
            .value_of(row, FirstName)
            .map(split_full_name)
            .unwrap_or_default();
    }
    (
        mapping.value_of(row, FirstName).unwrap_or_default().to_string(),
        mapping.value_of(row, LastName).unwrap_or_default().to_string(),
    )
}

/// "Jane Smith" → ("Jane", "Smith")；"Madonna" → ("Madonna", "")
pub fn split_full_name(full: &str) -> (String, String) {
    let mut tokens = full.split_whitespace();
    let first = tokens.next().unwrap_or_default().to_string();
    let last = tokens.collect::<Vec<_>>().join(" ");
    (first, last)
}

// ==========================================
// 地址
// ==========================================

/// street 已映射，且 city/state/zip 与其共用一列或未映射时视为组合地址
fn is_combined_address(mapping: &FieldMapping) -> bool {
    if !mapping.is_mapped(Street) {
        return false;
    }
    [City, State, Zip]
        .iter()
        .all(|f| !mapping.is_mapped(*f) || mapping.shares_header(Street, *f))
}

fn normalize_address(row: &RawRow, mapping: &FieldMapping) -> AddressParts {
    let text = |field| mapping.value_of(row, field).unwrap_or_default().to_string();

    if !is_combined_address(mapping) {
        return AddressParts {
            street: text(Street),
            city: text(City),
            state: text(State),
            zip: text(Zip),
            country: text(Country),
        };
    }

    let mut parts = parse_address(mapping.value_of(row, Street).unwrap_or_default());
    // 国家列独立映射时优先
    if !mapping.shares_header(Street, Country) {
        if let Some(country) = mapping.value_of(row, Country) {
            parts.country = country.to_string();
        }
    }
    parts
}

// ==========================================
// 排期
// ==========================================

fn normalize_schedule(row: &RawRow, mapping: &FieldMapping, record: &mut CanonicalRecord) {
    let input = ScheduleInput {
        combined: mapping.value_of(row, ScheduledAt),
        date: mapping.value_of(row, ScheduledDate),
        time: mapping.value_of(row, ScheduledTime),
    };
    if input.combined.is_none() && input.date.is_none() {
        return;
    }

    let parts = parse_schedule(&input);
    if parts.date.is_none() {
        debug!(line = row.line_number(), "排期无法解析，置空");
    }
    if let Some(date) = parts.date {
        record.set(ScheduledDate, FieldValue::Date(date));
    }
    if let Some(time) = parts.time {
        record.set(ScheduledTime, FieldValue::Time(time));
    }
    match parts.timestamp {
        Some(ScheduleTimestamp::Offset(ts)) => record.set(ScheduledAt, FieldValue::Timestamp(ts)),
        Some(ScheduleTimestamp::Local(ts)) => {
            record.set(ScheduledAt, FieldValue::LocalTimestamp(ts))
        }
        None => {}
    }
}

// ==========================================
// 金额
// ==========================================

/// "$1,234.50" → 1234.5；"(20.00)" → -20.0；无法解析 → 0.0
pub fn parse_money(value: &str) -> f64 {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    let (negative, digits) = match cleaned
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };
    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() => {
            if negative {
                -v
            } else {
                v
            }
        }
        _ => 0.0,
    }
}
