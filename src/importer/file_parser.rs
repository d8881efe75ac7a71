// ==========================================
// 批量导入管道 - 文件解析器实现
// ==========================================
// 职责: 原始字节 → 表头 + 有序数据行 (RawTable)
// 支持: 分隔文本 (.csv/.tsv/.txt) / 表格 (.xlsx/.xlsm/.xls/.ods)
// 行号: 表头 = 1，空白行不计数
// ==========================================

use crate::domain::{RawRow, RawTable};
use crate::importer::error::{ImportError, ImportResult, ParseError};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// 源文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Spreadsheet,
}

impl SourceFormat {
    /// 根据扩展名判断格式
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(SourceFormat::Delimited),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(SourceFormat::Spreadsheet),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

// ==========================================
// 公共: 行修复与编号
// ==========================================

/// 去除首尾空白，整体被引号包裹时去掉包裹引号
fn clean_field(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// 由表头 + 原始值行构建 RawTable
///
/// - 少于表头的行补空串，多于表头的行截断
/// - 全空行丢弃且不占行号
fn build_table<I>(headers: Vec<String>, rows: I) -> RawTable
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut table_rows = Vec::new();
    let mut line_number = 1;

    for mut values in rows {
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        values.resize(headers.len(), String::new());
        line_number += 1;

        let cells = headers.iter().cloned().zip(values).collect();
        table_rows.push(RawRow::new(cells, line_number));
    }

    RawTable::new(headers, table_rows)
}

/// 拆分首个非空行为表头，其余为数据行
fn split_header<I>(rows: I) -> RawTable
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut iter = rows
        .into_iter()
        .skip_while(|r| r.iter().all(|v| v.is_empty()));

    match iter.next() {
        Some(headers) => build_table(headers, iter),
        None => RawTable::default(),
    }
}

// ==========================================
// 文本解码
// ==========================================

/// 字节 → UTF-8 文本（去 BOM，非法 UTF-8 回退 Windows-1252）
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            // Excel 导出的 CSV 常见编码
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// 按前若干行字段数一致性推断分隔符
///
/// 候选: 制表符 / 分号 / 逗号 / 竖线；首行必须产生 >1 个字段
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = match counts.first() {
            Some(&c) if c > 1 => c,
            _ => continue,
        };

        // 一致行数 × 字段数，字段数多者优先
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// 单遍字符状态机: 文本 → 原始值行
///
/// - 引号在任意位置切换 in_quotes，本身不进入字段
/// - 引号区内的 "" 为一个字面引号
/// - 引号区外: 分隔符结束字段，\r / \n / \r\n 结束行
/// - 引号区内的分隔符与换行原样保留
fn split_records(content: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => in_quotes = !in_quotes,
            c if in_quotes => field.push(c),
            c if c == delimiter => row.push(clean_field(&std::mem::take(&mut field))),
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(clean_field(&std::mem::take(&mut field)));
                rows.push(std::mem::take(&mut row));
            }
            c => field.push(c),
        }
    }

    // 末行无换行符
    if !field.is_empty() || !row.is_empty() {
        row.push(clean_field(&field));
        rows.push(row);
    }
    rows
}

// ==========================================
// CSV Parser 实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CsvParser {
    delimiter: Option<u8>, // None = 自动推断
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
        }
    }

    /// 解码已是文本的内容（状态机本身不会失败）
    pub fn parse_str(&self, content: &str) -> ImportResult<RawTable> {
        let delimiter = self.delimiter.unwrap_or_else(|| sniff_delimiter(content));

        let rows = split_records(content, delimiter as char);

        let table = split_header(rows);
        debug!(
            delimiter = %(delimiter as char).escape_default(),
            headers = table.headers.len(),
            rows = table.rows.len(),
            "分隔文本解码完成"
        );
        Ok(table)
    }
}

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable> {
        self.parse_str(&decode_text(bytes))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ExcelParser;

/// 单元格 → 字符串
fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // 整数值不带小数
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match dt.as_datetime() {
                Some(ndt) if serial < 1.0 => ndt.format("%H:%M:%S").to_string(),
                Some(ndt) if serial.fract() == 0.0 => ndt.format("%Y-%m-%d").to_string(),
                Some(ndt) => ndt.format("%Y-%m-%dT%H:%M:%S").to_string(),
                None => serial.to_string(),
            }
        }
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| ParseError::FormatInvalid(e.to_string()))?;

        // 始终读取第一个工作表
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ParseError::FormatInvalid("工作簿无工作表".to_string()))?
            .map_err(|e| ParseError::FormatInvalid(e.to_string()))?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(|c| clean_field(&render_cell(c))).collect::<Vec<_>>());

        let table = split_header(rows);
        debug!(
            headers = table.headers.len(),
            rows = table.rows.len(),
            "表格解码完成"
        );
        Ok(table)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct UniversalFileParser {
    csv: CsvParser,
}

impl UniversalFileParser {
    pub fn new(csv: CsvParser) -> Self {
        Self { csv }
    }

    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RawTable> {
        let path = file_path.as_ref();
        match SourceFormat::from_path(path)? {
            SourceFormat::Delimited => self.csv.parse_file(path),
            SourceFormat::Spreadsheet => ExcelParser.parse_file(path),
        }
    }

    pub fn parse_bytes(&self, bytes: &[u8], format: SourceFormat) -> ImportResult<RawTable> {
        match format {
            SourceFormat::Delimited => self.csv.parse_bytes(bytes),
            SourceFormat::Spreadsheet => ExcelParser.parse_bytes(bytes),
        }
    }
}
