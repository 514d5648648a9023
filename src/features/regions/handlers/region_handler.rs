use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppQuery;
use crate::features::regions::dtos::{
    DistrictQuery, HealthResponseDto, RegencyQuery, RegionHierarchyDto, RegionListQuery,
    RegionResponseDto, RegionStatsDto, SearchQuery, VillageQuery,
};
use crate::features::regions::models::{RegionKind, StoredRegion};
use crate::features::regions::services::{
    page_window, RegionListFilter, RegionPage, RegionService,
};
use crate::modules::store::RegionSort;
use crate::shared::types::{ApiResponse, Meta};

fn list_response(regions: Vec<StoredRegion>) -> Json<ApiResponse<Vec<RegionResponseDto>>> {
    let total = regions.len() as i64;
    let dtos: Vec<RegionResponseDto> = regions.into_iter().map(Into::into).collect();
    Json(ApiResponse::success(Some(dtos), None, Some(Meta::total(total))))
}

fn page_response(page: RegionPage) -> Json<ApiResponse<Vec<RegionResponseDto>>> {
    let meta = Meta::page(page.total as i64, page.limit, page.offset);
    let dtos: Vec<RegionResponseDto> = page.items.into_iter().map(Into::into).collect();
    Json(ApiResponse::success(Some(dtos), None, Some(meta)))
}

// ==================== Level Handlers ====================

/// List all provinces
#[utoipa::path(
    get,
    path = "/api/provinces",
    responses(
        (status = 200, description = "Provinces ordered by code", body = ApiResponse<Vec<RegionResponseDto>>),
        (status = 503, description = "Store unavailable")
    ),
    tag = "regions"
)]
pub async fn list_provinces(
    State(service): State<Arc<RegionService>>,
) -> Result<Json<ApiResponse<Vec<RegionResponseDto>>>> {
    let provinces = service.by_kind(RegionKind::Province).await?;
    Ok(list_response(provinces))
}

/// List regencies of a province
#[utoipa::path(
    get,
    path = "/api/regencies",
    params(RegencyQuery),
    responses(
        (status = 200, description = "Regencies of the province", body = ApiResponse<Vec<RegionResponseDto>>),
        (status = 400, description = "Missing or malformed province code")
    ),
    tag = "regions"
)]
pub async fn list_regencies(
    State(service): State<Arc<RegionService>>,
    AppQuery(query): AppQuery<RegencyQuery>,
) -> Result<Json<ApiResponse<Vec<RegionResponseDto>>>> {
    let regencies = service
        .children_of(&query.province_code, RegionKind::Regency)
        .await?;
    Ok(list_response(regencies))
}

/// List districts of a regency
#[utoipa::path(
    get,
    path = "/api/districts",
    params(DistrictQuery),
    responses(
        (status = 200, description = "Districts of the regency", body = ApiResponse<Vec<RegionResponseDto>>),
        (status = 400, description = "Missing or malformed regency code")
    ),
    tag = "regions"
)]
pub async fn list_districts(
    State(service): State<Arc<RegionService>>,
    AppQuery(query): AppQuery<DistrictQuery>,
) -> Result<Json<ApiResponse<Vec<RegionResponseDto>>>> {
    let districts = service
        .children_of(&query.regency_code, RegionKind::District)
        .await?;
    Ok(list_response(districts))
}

/// List villages of a district
#[utoipa::path(
    get,
    path = "/api/villages",
    params(VillageQuery),
    responses(
        (status = 200, description = "Villages of the district", body = ApiResponse<Vec<RegionResponseDto>>),
        (status = 400, description = "Missing or malformed district code")
    ),
    tag = "regions"
)]
pub async fn list_villages(
    State(service): State<Arc<RegionService>>,
    AppQuery(query): AppQuery<VillageQuery>,
) -> Result<Json<ApiResponse<Vec<RegionResponseDto>>>> {
    let villages = service
        .children_of(&query.district_code, RegionKind::Village)
        .await?;
    Ok(list_response(villages))
}

// ==================== Region Handlers ====================

/// List regions with optional filters
#[utoipa::path(
    get,
    path = "/api/regions",
    params(RegionListQuery),
    responses(
        (status = 200, description = "Page of matching regions", body = ApiResponse<Vec<RegionResponseDto>>),
        (status = 400, description = "Invalid filter or paging parameters")
    ),
    tag = "regions"
)]
pub async fn list_regions(
    State(service): State<Arc<RegionService>>,
    AppQuery(query): AppQuery<RegionListQuery>,
) -> Result<Json<ApiResponse<Vec<RegionResponseDto>>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let page = page_window(query.limit, query.offset)?;
    let filter = RegionListFilter {
        kind: query.kind,
        province_code: query.province_code,
        regency_code: query.regency_code,
        district_code: query.district_code,
        search: query.search,
    };

    let result = service
        .list(&filter, page, query.sort.unwrap_or_default())
        .await?;
    Ok(page_response(result))
}

/// Get a region by kind and full code
#[utoipa::path(
    get,
    path = "/api/regions/{kind}/{code}",
    params(
        ("kind" = RegionKind, Path, description = "Region level"),
        ("code" = String, Path, description = "Full code")
    ),
    responses(
        (status = 200, description = "Region details", body = ApiResponse<RegionResponseDto>),
        (status = 400, description = "Unknown kind or malformed code"),
        (status = 404, description = "Region not found")
    ),
    tag = "regions"
)]
pub async fn get_region(
    State(service): State<Arc<RegionService>>,
    Path((kind, code)): Path<(String, String)>,
) -> Result<Json<ApiResponse<RegionResponseDto>>> {
    let kind = kind.parse::<RegionKind>().map_err(AppError::BadRequest)?;
    let region = service.get_by_code(kind, &code).await?;
    Ok(Json(ApiResponse::success(Some(region.into()), None, None)))
}

/// Search regions by name
#[utoipa::path(
    get,
    path = "/api/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Page of matching regions", body = ApiResponse<Vec<RegionResponseDto>>),
        (status = 400, description = "Search term too short or invalid paging")
    ),
    tag = "regions"
)]
pub async fn search_regions(
    State(service): State<Arc<RegionService>>,
    State(shutdown): State<CancellationToken>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<RegionResponseDto>>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let page = page_window(query.limit, query.offset)?;
    let result = service
        .search(
            &query.q,
            query.kind,
            page,
            query.sort.unwrap_or(RegionSort::Name),
            &shutdown,
        )
        .await?;
    Ok(page_response(result))
}

/// Resolve a region and its ancestors
#[utoipa::path(
    get,
    path = "/api/hierarchy/{code}",
    params(
        ("code" = String, Path, description = "Full code of any level")
    ),
    responses(
        (status = 200, description = "Region with its ancestors", body = ApiResponse<RegionHierarchyDto>),
        (status = 400, description = "Code matches no region shape"),
        (status = 404, description = "Region not found")
    ),
    tag = "regions"
)]
pub async fn get_hierarchy(
    State(service): State<Arc<RegionService>>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<RegionHierarchyDto>>> {
    let hierarchy = service.hierarchy_of(&code).await?;
    Ok(Json(ApiResponse::success(
        Some(hierarchy.into()),
        None,
        None,
    )))
}

// ==================== Stats Handlers ====================

/// Count stored regions per level
#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Region counts", body = ApiResponse<RegionStatsDto>)
    ),
    tag = "regions"
)]
pub async fn get_stats(
    State(service): State<Arc<RegionService>>,
) -> Result<Json<ApiResponse<RegionStatsDto>>> {
    let counts = service.aggregate_counts().await?;
    Ok(Json(ApiResponse::success(Some(counts.into()), None, None)))
}

/// Store connectivity check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Store reachable", body = ApiResponse<HealthResponseDto>),
        (status = 503, description = "Store unreachable", body = ApiResponse<HealthResponseDto>)
    ),
    tag = "health"
)]
pub async fn health_check(
    State(service): State<Arc<RegionService>>,
) -> (StatusCode, Json<ApiResponse<HealthResponseDto>>) {
    match service.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(HealthResponseDto {
                    status: "ok".to_string(),
                    database: "connected".to_string(),
                }),
                None,
                None,
            )),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    success: false,
                    data: Some(HealthResponseDto {
                        status: "error".to_string(),
                        database: "disconnected".to_string(),
                    }),
                    message: Some(e.to_string()),
                    meta: None,
                    errors: None,
                }),
            )
        }
    }
}
