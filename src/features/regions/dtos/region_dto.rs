use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::regions::models::{KindCounts, RegionHierarchy, RegionKind, StoredRegion};
use crate::modules::store::RegionSort;

// =============================================================================
// QUERY DTOs
// =============================================================================

/// Query parameters for listing regencies of a province
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RegencyQuery {
    /// Province code (2 digits)
    #[param(example = "11")]
    pub province_code: String,
}

/// Query parameters for listing districts of a regency
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DistrictQuery {
    /// Regency full code (4 digits)
    #[param(example = "1101")]
    pub regency_code: String,
}

/// Query parameters for listing villages of a district
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct VillageQuery {
    /// District full code
    #[param(example = "110101")]
    pub district_code: String,
}

/// Query parameters for the generic region listing
#[derive(Debug, Clone, Default, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegionListQuery {
    /// Restrict to one level
    pub kind: Option<RegionKind>,
    pub province_code: Option<String>,
    /// Regency full code
    pub regency_code: Option<String>,
    /// District full code
    pub district_code: Option<String>,
    /// Case-insensitive partial match on name
    #[validate(length(min = 2, message = "Search term must be at least 2 characters"))]
    pub search: Option<String>,
    /// Items per page (default: 100)
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    #[param(minimum = 1, maximum = 1000)]
    pub limit: Option<i64>,
    #[validate(range(min = 0, message = "offset must not be negative"))]
    #[param(minimum = 0)]
    pub offset: Option<i64>,
    /// Sort key (default: local_code)
    pub sort: Option<RegionSort>,
}

/// Query parameters for name search
#[derive(Debug, Clone, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Search term (case-insensitive, partial match, at least 2 characters)
    #[param(example = "aceh")]
    #[validate(length(min = 2, message = "Search term must be at least 2 characters"))]
    pub q: String,
    pub kind: Option<RegionKind>,
    /// Items per page (default: 100)
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    #[param(minimum = 1, maximum = 1000)]
    pub limit: Option<i64>,
    #[validate(range(min = 0, message = "offset must not be negative"))]
    #[param(minimum = 0)]
    pub offset: Option<i64>,
    /// Sort key (default: name)
    pub sort: Option<RegionSort>,
}

// =============================================================================
// RESPONSE DTOs
// =============================================================================

/// A region of any level
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegionResponseDto {
    pub id: Uuid,
    pub kind: RegionKind,
    pub local_code: String,
    pub full_code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regency_local_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_local_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regency_full_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_full_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredRegion> for RegionResponseDto {
    fn from(stored: StoredRegion) -> Self {
        let region = stored.region;
        Self {
            id: stored.id,
            kind: region.kind,
            local_code: region.local_code,
            full_code: region.full_code,
            name: region.name,
            province_code: region.parents.province_code,
            regency_local_code: region.parents.regency_local_code,
            district_local_code: region.parents.district_local_code,
            regency_full_code: region.parents.regency_full_code,
            district_full_code: region.parents.district_full_code,
            created_at: region.created_at,
            updated_at: region.updated_at,
        }
    }
}

/// A region with its resolved ancestors
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegionHierarchyDto {
    #[serde(rename = "self")]
    pub region: RegionResponseDto,
    pub province: Option<RegionResponseDto>,
    pub regency: Option<RegionResponseDto>,
    pub district: Option<RegionResponseDto>,
}

impl From<RegionHierarchy> for RegionHierarchyDto {
    fn from(hierarchy: RegionHierarchy) -> Self {
        Self {
            region: hierarchy.region.into(),
            province: hierarchy.province.map(Into::into),
            regency: hierarchy.regency.map(Into::into),
            district: hierarchy.district.map(Into::into),
        }
    }
}

/// Stored region count per level
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegionStatsDto {
    pub province: u64,
    pub regency: u64,
    pub district: u64,
    pub village: u64,
    pub total: u64,
}

impl From<KindCounts> for RegionStatsDto {
    fn from(counts: KindCounts) -> Self {
        Self {
            province: counts.province,
            regency: counts.regency,
            district: counts.district,
            village: counts.village,
            total: counts.total(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponseDto {
    /// `ok` or `error`
    pub status: String,
    /// `connected` or `disconnected`
    pub database: String,
}
