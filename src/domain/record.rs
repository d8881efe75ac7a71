// ==========================================
// 批量导入管道 - 行记录模型
// ==========================================
// 职责: 原始表 (RawTable/RawRow) 与标准记录 (CanonicalRecord)
// 红线: 行号始终是源文件行号（表头 = 1），构造后不可修改
// ==========================================

use crate::domain::types::CanonicalField;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

// ==========================================
// RawRow - 原始行
// ==========================================
// 有序关联表: 表头 → 原始字符串值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
    line_number: usize,
}

impl RawRow {
    pub fn new(cells: Vec<(String, String)>, line_number: usize) -> Self {
        Self { cells, line_number }
    }

    /// 源文件行号（表头为 1，首个数据行为 2）
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// 按表头精确取值
    pub fn value(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn cells(&self) -> &[(String, String)] {
        &self.cells
    }

    /// 是否所有单元格为空
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_empty())
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (header, value) in &self.cells {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

// ==========================================
// RawTable - 原始表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ==========================================
// FieldValue - 标准化后的字段值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<FixedOffset>), // 源数据带时区偏移
    LocalTimestamp(NaiveDateTime),    // 由分离的日期+时间组合而来
    Money(f64),
}

impl FieldValue {
    /// 空字符串视为 Empty
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 渲染为端点/展示使用的字符串
    pub fn render(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Time(t) => t.format("%H:%M").to_string(),
            FieldValue::Timestamp(ts) => ts.to_rfc3339(),
            FieldValue::LocalTimestamp(ts) => ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
            FieldValue::Money(m) => format!("{:.2}", m),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Empty => serializer.serialize_none(),
            FieldValue::Money(m) => serializer.serialize_f64(*m),
            other => serializer.serialize_str(&other.render()),
        }
    }
}

// ==========================================
// CanonicalRecord - 标准记录
// ==========================================
// 保留源行引用，供错误报告与端点侧回退查找
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    values: BTreeMap<CanonicalField, FieldValue>,
    source: RawRow,
}

impl CanonicalRecord {
    pub fn new(source: RawRow) -> Self {
        Self {
            values: BTreeMap::new(),
            source,
        }
    }

    pub fn line_number(&self) -> usize {
        self.source.line_number()
    }

    pub fn source(&self) -> &RawRow {
        &self.source
    }

    pub fn set(&mut self, field: CanonicalField, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: CanonicalField) -> &FieldValue {
        self.values.get(&field).unwrap_or(&FieldValue::Empty)
    }

    /// 文本视图，缺失/非文本时渲染后返回
    pub fn text(&self, field: CanonicalField) -> String {
        self.get(field).render()
    }

    pub fn values(&self) -> &BTreeMap<CanonicalField, FieldValue> {
        &self.values
    }
}

impl Serialize for CanonicalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 2))?;
        for (field, value) in &self.values {
            map.serialize_entry(field.key(), value)?;
        }
        map.serialize_entry("line_number", &self.line_number())?;
        map.serialize_entry("raw", &self.source)?;
        map.end()
    }
}
