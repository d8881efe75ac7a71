// ==========================================
// 批量导入管道 - 日期时间解析
// ==========================================
// 两类输入:
// 1. 单列带时区偏移的时间戳 → 拆为日期 + 时间
// 2. 分离的 月/日/年 日期 + 12 小时制(AM/PM) 时间 → 组合为时间戳
// 无法解析时日期与时间均为空，不报错
// ==========================================

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

/// 排期解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleParts {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub timestamp: Option<ScheduleTimestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleTimestamp {
    Offset(DateTime<FixedOffset>),
    Local(NaiveDateTime),
}

/// 排期原始输入
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleInput<'a> {
    pub combined: Option<&'a str>,
    pub date: Option<&'a str>,
    pub time: Option<&'a str>,
}

type ScheduleParser = fn(&ScheduleInput<'_>) -> Option<ScheduleParts>;

const PARSERS: &[ScheduleParser] = &[
    from_offset_timestamp,
    from_combined_local,
    from_discrete_fields,
];

// ==========================================
// 基础解析
// ==========================================

/// 带偏移时间戳（RFC 3339 及常见变体）
pub fn parse_offset_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts);
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S %:z",
        "%Y-%m-%d %H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%d %H:%M%:z",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
}

/// 月/日/年（两位年份按 20xx），兼容 YYYY-MM-DD
pub fn parse_slash_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let parts: Vec<&str> = value.split('/').map(str::trim).collect();
    if parts.len() == 3 {
        let month: u32 = parts[0].parse().ok()?;
        let day: u32 = parts[1].parse().ok()?;
        let mut year: i32 = parts[2].parse().ok()?;
        if parts[2].len() <= 2 {
            year += 2000;
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// 12 小时制带 AM/PM（"2:30 PM"、"2:30pm"、"2 p.m."），兼容 24 小时制
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    let cleaned = value.trim().to_uppercase().replace('.', "");
    let spaced = match cleaned.strip_suffix("AM").or_else(|| cleaned.strip_suffix("PM")) {
        Some(head) => format!("{} {}", head.trim(), &cleaned[cleaned.len() - 2..]),
        None => cleaned.clone(),
    };

    const MERIDIEM_FORMATS: &[&str] = &["%I:%M %p", "%I:%M:%S %p"];
    const CLOCK_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S"];

    MERIDIEM_FORMATS
        .iter()
        .chain(CLOCK_FORMATS)
        .find_map(|fmt| NaiveTime::parse_from_str(&spaced, fmt).ok())
        .or_else(|| {
            // "2 PM" 无分钟
            let (hour, meridiem) = spaced.split_once(' ')?;
            NaiveTime::parse_from_str(&format!("{}:00 {}", hour, meridiem), "%I:%M %p").ok()
        })
}

// ==========================================
// 候选解析器
// ==========================================

fn from_offset_timestamp(input: &ScheduleInput<'_>) -> Option<ScheduleParts> {
    let ts = parse_offset_timestamp(input.combined?)?;
    Some(ScheduleParts {
        date: Some(ts.date_naive()),
        time: Some(ts.time()),
        timestamp: Some(ScheduleTimestamp::Offset(ts)),
    })
}

/// 单列 "03/15/2024 2:30 PM" 之类的本地时间
fn from_combined_local(input: &ScheduleInput<'_>) -> Option<ScheduleParts> {
    let combined = input.combined?.trim();
    let (date_part, time_part) = combined.split_once(|c: char| c.is_whitespace() || c == 'T')?;
    let date = parse_slash_date(date_part)?;
    let time = parse_clock_time(time_part)?;
    Some(ScheduleParts {
        date: Some(date),
        time: Some(time),
        timestamp: Some(ScheduleTimestamp::Local(date.and_time(time))),
    })
}

fn from_discrete_fields(input: &ScheduleInput<'_>) -> Option<ScheduleParts> {
    let date = parse_slash_date(input.date?)?;
    match input.time {
        Some(raw) => {
            let time = parse_clock_time(raw)?;
            Some(ScheduleParts {
                date: Some(date),
                time: Some(time),
                timestamp: Some(ScheduleTimestamp::Local(date.and_time(time))),
            })
        }
        None => Some(ScheduleParts {
            date: Some(date),
            time: None,
            timestamp: None,
        }),
    }
}

/// 解析排期，首个成功的候选解析器胜出；永不失败
pub fn parse_schedule(input: &ScheduleInput<'_>) -> ScheduleParts {
    PARSERS
        .iter()
        .find_map(|parse| parse(input))
        .unwrap_or_default()
}
