// ==========================================
// 批量导入管道 - 来源配置注册表
// ==========================================
// 职责: 已知来源系统导出格式目录 + 通用兜底
// 识别: 按固定优先级，签名词全部（不区分大小写）出现在表头文本中即命中
// ==========================================

use crate::domain::{CanonicalField, EntityKind};
use crate::importer::error::{ImportError, ImportResult};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// 通用兜底配置 ID
pub const GENERIC_PROFILE_ID: &str = "generic";

// ==========================================
// SchemaProfile - 来源配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaProfile {
    pub id: String,
    pub detection_signature: Vec<String>,                       // 表头子串，须全部出现
    pub candidates: BTreeMap<CanonicalField, Vec<String>>,      // 优先 → 次选 的列名变体
    pub default_country: Option<String>,                        // 来源未给出国家时的补全值
}

impl SchemaProfile {
    pub fn new(id: impl Into<String>, signature: &[&str]) -> Self {
        Self {
            id: id.into(),
            detection_signature: signature.iter().map(|s| s.to_string()).collect(),
            candidates: BTreeMap::new(),
            default_country: None,
        }
    }

    /// 通用配置：无签名，无候选列名
    pub fn generic() -> Self {
        Self::new(GENERIC_PROFILE_ID, &[])
    }

    pub fn is_generic(&self) -> bool {
        self.id == GENERIC_PROFILE_ID
    }

    /// 追加（或替换）某字段的候选列名
    pub fn with_candidates(mut self, field: CanonicalField, names: &[&str]) -> Self {
        self.candidates
            .insert(field, names.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_default_country(mut self, country: &str) -> Self {
        self.default_country = Some(country.to_string());
        self
    }

    pub fn candidates_for(&self, field: CanonicalField) -> &[String] {
        self.candidates
            .get(&field)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// 签名词是否全部出现在表头文本中
    pub fn matches(&self, headers: &[String]) -> bool {
        if self.detection_signature.is_empty() {
            return false;
        }
        let haystack = headers
            .iter()
            .map(|h| h.to_lowercase())
            .collect::<Vec<_>>()
            .join("\u{1f}");
        self.detection_signature
            .iter()
            .all(|token| haystack.contains(&token.to_lowercase()))
    }
}

// ==========================================
// ProfileRegistry - 注册表
// ==========================================
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    kind: EntityKind,
    profiles: Vec<SchemaProfile>, // 固定优先级顺序
    generic: SchemaProfile,
}

impl ProfileRegistry {
    /// 构建指定实体种类的内置目录
    pub fn new(kind: EntityKind) -> Self {
        let profiles = match kind {
            EntityKind::Customer => customer_profiles(),
            EntityKind::Job => job_profiles(),
        };
        Self {
            kind,
            profiles,
            generic: SchemaProfile::generic(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// 按 ID 查找（含 generic）
    pub fn get(&self, id: &str) -> Option<&SchemaProfile> {
        if id.eq_ignore_ascii_case(GENERIC_PROFILE_ID) {
            return Some(&self.generic);
        }
        self.profiles.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    /// 自动识别来源配置，未命中返回 generic
    pub fn detect(&self, headers: &[String]) -> &SchemaProfile {
        let found = self
            .profiles
            .iter()
            .find(|p| p.matches(headers))
            .unwrap_or(&self.generic);
        debug!(kind = %self.kind, profile = %found.id, "来源配置识别");
        found
    }

    /// 显式指定优先，否则自动识别
    pub fn resolve(&self, explicit: Option<&str>, headers: &[String]) -> ImportResult<&SchemaProfile> {
        match explicit {
            Some(id) => {
                let profile = self
                    .get(id)
                    .ok_or_else(|| ImportError::UnknownProfile(id.to_string()))?;
                info!(profile = %profile.id, "使用显式指定的来源配置");
                Ok(profile)
            }
            None => Ok(self.detect(headers)),
        }
    }
}

// ==========================================
// 内置目录: 客户
// ==========================================
fn customer_profiles() -> Vec<SchemaProfile> {
    use CanonicalField::*;
    vec![
        SchemaProfile::new("jobber", &["client", "billing street"])
            .with_candidates(FirstName, &["First name", "Client name"])
            .with_candidates(LastName, &["Last name", "Client name"])
            .with_candidates(CompanyName, &["Company name"])
            .with_candidates(Email, &["E-mail", "Email"])
            .with_candidates(Phone, &["Main phone", "Mobile phone", "Phone"])
            .with_candidates(Street, &["Billing street 1", "Billing street"])
            .with_candidates(City, &["Billing city"])
            .with_candidates(State, &["Billing province", "Billing state"])
            .with_candidates(Zip, &["Billing postal code", "Billing zip"])
            .with_candidates(Country, &["Billing country"])
            .with_candidates(Notes, &["Notes"]),
        SchemaProfile::new("housecall_pro", &["mobile number", "customer tags"])
            .with_candidates(FirstName, &["First Name"])
            .with_candidates(LastName, &["Last Name"])
            .with_candidates(CompanyName, &["Company"])
            .with_candidates(Email, &["Email"])
            .with_candidates(Phone, &["Mobile Number", "Home Number", "Work Number"])
            .with_candidates(Street, &["Street"])
            .with_candidates(City, &["City"])
            .with_candidates(State, &["State"])
            .with_candidates(Zip, &["Zip"])
            .with_candidates(Notes, &["Customer Notes", "Notes"])
            .with_default_country("US"),
        SchemaProfile::new("service_titan", &["customer id", "full address"])
            .with_candidates(FirstName, &["Full Name", "Customer Name"])
            .with_candidates(LastName, &["Full Name", "Customer Name"])
            .with_candidates(Email, &["Email"])
            .with_candidates(Phone, &["Phone Number", "Phone"])
            .with_candidates(Street, &["Full Address"])
            .with_candidates(City, &["Full Address"])
            .with_candidates(State, &["Full Address"])
            .with_candidates(Zip, &["Full Address"])
            .with_candidates(Country, &["Full Address"]),
    ]
}

// ==========================================
// 内置目录: 工单
// ==========================================
fn job_profiles() -> Vec<SchemaProfile> {
    use CanonicalField::*;
    vec![
        SchemaProfile::new("jobber", &["job #", "client name"])
            .with_candidates(JobNumber, &["Job #"])
            .with_candidates(Title, &["Title", "Job title"])
            .with_candidates(Description, &["Instructions", "Description"])
            .with_candidates(FirstName, &["Client name"])
            .with_candidates(LastName, &["Client name"])
            .with_candidates(Email, &["Client email"])
            .with_candidates(Phone, &["Client phone"])
            .with_candidates(Street, &["Service street", "Property street"])
            .with_candidates(City, &["Service city", "Property city"])
            .with_candidates(State, &["Service province", "Service state", "Property state"])
            .with_candidates(Zip, &["Service postal code", "Service zip", "Property zip"])
            .with_candidates(Country, &["Service country"])
            .with_candidates(ScheduledDate, &["Visit date", "Scheduled date"])
            .with_candidates(ScheduledTime, &["Visit time", "Scheduled time"])
            .with_candidates(Price, &["Total ($)", "Total"])
            .with_candidates(Status, &["Job status", "Status"]),
        SchemaProfile::new("housecall_pro", &["job", "scheduled start"])
            .with_candidates(JobNumber, &["Job #", "Job Number"])
            .with_candidates(Title, &["Job Name", "Job Description"])
            .with_candidates(Description, &["Job Notes", "Notes"])
            .with_candidates(FirstName, &["Customer First Name", "Customer Name"])
            .with_candidates(LastName, &["Customer Last Name", "Customer Name"])
            .with_candidates(Email, &["Customer Email"])
            .with_candidates(Phone, &["Customer Phone", "Mobile Number"])
            .with_candidates(Street, &["Service Address", "Street"])
            .with_candidates(City, &["City", "Service Address"])
            .with_candidates(State, &["State", "Service Address"])
            .with_candidates(Zip, &["Zip", "Service Address"])
            .with_candidates(Country, &["Country", "Service Address"])
            .with_candidates(ScheduledAt, &["Scheduled Start"])
            .with_candidates(Price, &["Job Amount", "Amount"])
            .with_candidates(Status, &["Job Status", "Status"])
            .with_default_country("US"),
    ]
}
