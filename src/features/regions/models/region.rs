use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::kind::RegionKind;

/// Ancestor codes denormalised onto every region so children can be filtered
/// without joins. Empty for provinces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentCodes {
    pub province_code: Option<String>,
    pub regency_local_code: Option<String>,
    pub district_local_code: Option<String>,
    pub regency_full_code: Option<String>,
    pub district_full_code: Option<String>,
}

impl ParentCodes {
    /// Full code of the ancestor at `kind`'s level, if this region has one
    pub fn full_code_at(&self, kind: RegionKind) -> Option<&str> {
        match kind {
            RegionKind::Province => self.province_code.as_deref(),
            RegionKind::Regency => self.regency_full_code.as_deref(),
            RegionKind::District => self.district_full_code.as_deref(),
            RegionKind::Village => None,
        }
    }
}

/// A region of any level, as produced by assembly and before it has a
/// storage identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub local_code: String,
    pub full_code: String,
    pub name: String,
    pub parents: ParentCodes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Region {
    /// Full code of the immediate parent, `None` for provinces
    pub fn parent_full_code(&self) -> Option<&str> {
        self.kind
            .parent()
            .and_then(|parent| self.parents.full_code_at(parent))
    }
}

/// A region as persisted, carrying the surrogate id assigned at insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRegion {
    pub id: Uuid,
    pub region: Region,
}

/// Row shape of the `regions` table
#[derive(Debug, Clone, FromRow)]
pub struct RegionRecord {
    pub id: Uuid,
    pub kind: RegionKind,
    pub local_code: String,
    pub full_code: String,
    pub name: String,
    pub province_code: Option<String>,
    pub regency_local_code: Option<String>,
    pub district_local_code: Option<String>,
    pub regency_full_code: Option<String>,
    pub district_full_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RegionRecord> for StoredRegion {
    fn from(record: RegionRecord) -> Self {
        Self {
            id: record.id,
            region: Region {
                kind: record.kind,
                local_code: record.local_code,
                full_code: record.full_code,
                name: record.name,
                parents: ParentCodes {
                    province_code: record.province_code,
                    regency_local_code: record.regency_local_code,
                    district_local_code: record.district_local_code,
                    regency_full_code: record.regency_full_code,
                    district_full_code: record.district_full_code,
                },
                created_at: record.created_at,
                updated_at: record.updated_at,
            },
        }
    }
}

/// A region together with its resolved ancestors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionHierarchy {
    pub region: StoredRegion,
    pub province: Option<StoredRegion>,
    pub regency: Option<StoredRegion>,
    pub district: Option<StoredRegion>,
}
