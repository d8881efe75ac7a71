// ==========================================
// 批量导入管道 - 字段映射器实现
// ==========================================
// 职责: 来源配置 + 实际表头 → 每个标准字段绑定的源列
// 规则: 按候选顺序，先精确（不区分大小写）后双向子串，首个命中即绑定
// 红线: 映射一旦建立，只允许单字段覆写，不做隐式全量重算
// ==========================================

use crate::domain::{CanonicalField, EntityKind, RawRow};
use crate::importer::profile_registry::SchemaProfile;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

// ==========================================
// FieldMapping - 字段映射
// ==========================================
// 多个标准字段可合法绑定到同一列（如完整姓名列同时支撑名/姓）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    kind: EntityKind,
    entries: BTreeMap<CanonicalField, Option<String>>,
}

impl FieldMapping {
    /// 全部字段未映射
    pub fn unmapped(kind: EntityKind) -> Self {
        Self {
            kind,
            entries: kind.fields().iter().map(|f| (*f, None)).collect(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// 字段绑定的源列
    pub fn header_for(&self, field: CanonicalField) -> Option<&str> {
        self.entries.get(&field).and_then(|h| h.as_deref())
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.header_for(field).is_some()
    }

    /// 两个字段是否绑定到同一列
    pub fn shares_header(&self, a: CanonicalField, b: CanonicalField) -> bool {
        match (self.header_for(a), self.header_for(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// 单字段覆写，其余条目保持不变
    pub fn override_field(&mut self, field: CanonicalField, header: Option<String>) {
        self.entries.insert(field, header);
    }

    pub fn entries(&self) -> &BTreeMap<CanonicalField, Option<String>> {
        &self.entries
    }

    pub fn unmapped_fields(&self) -> Vec<CanonicalField> {
        self.entries
            .iter()
            .filter(|(_, h)| h.is_none())
            .map(|(f, _)| *f)
            .collect()
    }

    pub fn mapped_count(&self) -> usize {
        self.entries.values().filter(|h| h.is_some()).count()
    }

    /// 给定必填字段是否全部已映射
    pub fn is_complete_for(&self, required: &[CanonicalField]) -> bool {
        required.iter().all(|f| self.is_mapped(*f))
    }

    /// 取字段在该行的值（统一查找入口，去空白，空串视为缺失）
    pub fn value_of<'a>(&self, row: &'a RawRow, field: CanonicalField) -> Option<&'a str> {
        let header = self.header_for(field)?;
        row.value(header)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

// ==========================================
// FieldMapper - 映射构建器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMapper;

impl FieldMapper {
    /// 为实体种类的每个标准字段解析源列
    pub fn build_mapping(
        &self,
        kind: EntityKind,
        profile: &SchemaProfile,
        headers: &[String],
    ) -> FieldMapping {
        let mut mapping = FieldMapping::unmapped(kind);

        for field in kind.fields() {
            let bound = profile
                .candidates_for(*field)
                .iter()
                .find_map(|candidate| find_header(candidate, headers));
            mapping.entries.insert(*field, bound.map(str::to_string));
        }

        debug!(
            profile = %profile.id,
            mapped = mapping.mapped_count(),
            unmapped = mapping.unmapped_fields().len(),
            "字段映射构建完成"
        );
        mapping
    }
}

/// 单个候选名 → 表头: 先精确（不区分大小写），再双向子串
fn find_header<'h>(candidate: &str, headers: &'h [String]) -> Option<&'h str> {
    let wanted = candidate.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    let exact = headers
        .iter()
        .find(|h| h.trim().to_lowercase() == wanted);
    if let Some(h) = exact {
        return Some(h.as_str());
    }

    headers
        .iter()
        .find(|h| {
            let h = h.trim().to_lowercase();
            !h.is_empty() && (h.contains(&wanted) || wanted.contains(&h))
        })
        .map(|h| h.as_str())
}
