// ==========================================
// 批量导入管道 - 领域类型定义
// ==========================================
// 职责: 实体种类 (客户/工单) 与标准字段枚举
// 说明: 映射/标准化机制与实体种类无关，仅字段集合不同
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 实体种类 (Entity Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer, // 客户
    Job,      // 工单
}

impl EntityKind {
    /// 转换为字符串标识（与端点路径一致）
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Job => "job",
        }
    }

    /// 该实体种类定义的全部标准字段（顺序即模板列顺序）
    pub fn fields(&self) -> &'static [CanonicalField] {
        use CanonicalField::*;
        match self {
            EntityKind::Customer => &[
                FirstName,
                LastName,
                CompanyName,
                Email,
                Phone,
                Street,
                City,
                State,
                Zip,
                Country,
                Notes,
            ],
            EntityKind::Job => &[
                JobNumber,
                Title,
                Description,
                FirstName,
                LastName,
                Email,
                Phone,
                Street,
                City,
                State,
                Zip,
                Country,
                ScheduledAt,
                ScheduledDate,
                ScheduledTime,
                Price,
                Status,
            ],
        }
    }

    /// 结构上必须映射的字段（用于判断是否需要人工补全映射）
    pub fn required_fields(&self) -> &'static [CanonicalField] {
        match self {
            EntityKind::Customer => &[CanonicalField::FirstName],
            EntityKind::Job => &[CanonicalField::Title],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" | "customers" => Ok(EntityKind::Customer),
            "job" | "jobs" => Ok(EntityKind::Job),
            other => Err(format!("未知实体种类: {}", other)),
        }
    }
}

// ==========================================
// 标准字段 (Canonical Field)
// ==========================================
// 组合值约定:
// - 完整姓名: first_name 与 last_name 绑定到同一列
// - 完整地址: street 所在列被 city/state/zip 共用或后者均未映射
// - 完整时间戳: scheduled_at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    FirstName,
    LastName,
    CompanyName,
    Email,
    Phone,
    Street,
    City,
    State,
    Zip,
    Country,
    Notes,
    JobNumber,
    Title,
    Description,
    ScheduledAt,   // 带时区偏移的完整时间戳
    ScheduledDate, // 仅日期
    ScheduledTime, // 仅时间
    Price,
    Status,
}

impl CanonicalField {
    /// 字段键（snake_case，用于端点载荷与模板表头）
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalField::FirstName => "first_name",
            CanonicalField::LastName => "last_name",
            CanonicalField::CompanyName => "company_name",
            CanonicalField::Email => "email",
            CanonicalField::Phone => "phone",
            CanonicalField::Street => "street",
            CanonicalField::City => "city",
            CanonicalField::State => "state",
            CanonicalField::Zip => "zip",
            CanonicalField::Country => "country",
            CanonicalField::Notes => "notes",
            CanonicalField::JobNumber => "job_number",
            CanonicalField::Title => "title",
            CanonicalField::Description => "description",
            CanonicalField::ScheduledAt => "scheduled_at",
            CanonicalField::ScheduledDate => "scheduled_date",
            CanonicalField::ScheduledTime => "scheduled_time",
            CanonicalField::Price => "price",
            CanonicalField::Status => "status",
        }
    }

    /// 全部字段（用于按键反查）
    pub fn all() -> &'static [CanonicalField] {
        use CanonicalField::*;
        &[
            FirstName,
            LastName,
            CompanyName,
            Email,
            Phone,
            Street,
            City,
            State,
            Zip,
            Country,
            Notes,
            JobNumber,
            Title,
            Description,
            ScheduledAt,
            ScheduledDate,
            ScheduledTime,
            Price,
            Status,
        ]
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for CanonicalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        CanonicalField::all()
            .iter()
            .copied()
            .find(|f| f.key() == wanted)
            .ok_or_else(|| format!("未知标准字段: {}", s))
    }
}
