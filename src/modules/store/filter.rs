use std::cmp::Ordering;

use serde::Deserialize;
use utoipa::ToSchema;

use crate::features::regions::models::{Region, RegionKind};

/// Conjunction of optional equality constraints plus a case-insensitive
/// substring match on `name`. The default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionFilter {
    pub kind: Option<RegionKind>,
    pub full_code: Option<String>,
    pub province_code: Option<String>,
    pub regency_full_code: Option<String>,
    pub district_full_code: Option<String>,
    pub name_contains: Option<String>,
}

impl RegionFilter {
    pub fn kind(kind: RegionKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn code(kind: RegionKind, full_code: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            full_code: Some(full_code.into()),
            ..Self::default()
        }
    }

    /// Children of `parent_full_code`, matched on the denormalised ancestor
    /// slot that `child_kind` keeps for its parent level.
    pub fn children(child_kind: RegionKind, parent_full_code: impl Into<String>) -> Self {
        let parent = Some(parent_full_code.into());
        let mut filter = Self::kind(child_kind);
        match child_kind {
            RegionKind::Province => {}
            RegionKind::Regency => filter.province_code = parent,
            RegionKind::District => filter.regency_full_code = parent,
            RegionKind::Village => filter.district_full_code = parent,
        }
        filter
    }

    pub fn matches(&self, region: &Region) -> bool {
        fn eq(expected: &Option<String>, actual: Option<&str>) -> bool {
            expected.as_deref().is_none_or(|e| Some(e) == actual)
        }

        self.kind.is_none_or(|k| k == region.kind)
            && eq(&self.full_code, Some(region.full_code.as_str()))
            && eq(&self.province_code, region.parents.province_code.as_deref())
            && eq(
                &self.regency_full_code,
                region.parents.regency_full_code.as_deref(),
            )
            && eq(
                &self.district_full_code,
                region.parents.district_full_code.as_deref(),
            )
            && self
                .name_contains
                .as_deref()
                .is_none_or(|term| region.name.to_lowercase().contains(&term.to_lowercase()))
    }
}

/// Result ordering. Every key ends with `full_code` so ties are deterministic.
///
/// Names compare byte-wise in both stores; Postgres sorts them under the
/// `"C"` collation so a page never depends on the database locale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegionSort {
    /// Local code, the natural order of siblings
    #[default]
    LocalCode,
    Name,
    /// Full code. Local codes repeat under every parent, so `code` orders
    /// by the composite key; `local_code` keeps the sibling order.
    #[serde(alias = "full_code")]
    Code,
    /// Hierarchy level, then name
    #[serde(alias = "type")]
    KindName,
}

impl RegionSort {
    pub fn compare(&self, a: &Region, b: &Region) -> Ordering {
        let primary = match self {
            RegionSort::LocalCode => a.local_code.cmp(&b.local_code),
            RegionSort::Name => a.name.cmp(&b.name),
            RegionSort::Code => Ordering::Equal,
            RegionSort::KindName => a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)),
        };
        primary.then_with(|| a.full_code.cmp(&b.full_code))
    }

    /// SQL `ORDER BY` body for the `regions` table
    pub fn order_by(&self) -> &'static str {
        match self {
            RegionSort::LocalCode => "local_code ASC, full_code ASC",
            RegionSort::Name => r#"name COLLATE "C" ASC, full_code ASC"#,
            RegionSort::Code => "full_code ASC",
            RegionSort::KindName => r#"kind ASC, name COLLATE "C" ASC, full_code ASC"#,
        }
    }
}

/// Window over a result set; `limit: None` means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    pub fn one() -> Self {
        Self::new(1, 0)
    }
}

/// Escapes LIKE metacharacters and wraps the term for a substring match
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
