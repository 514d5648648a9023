use utoipa::{Modify, OpenApi};

use crate::features::regions::models::RegionKind;
use crate::features::regions::{dtos as regions_dtos, handlers as regions_handlers};
use crate::modules::store::RegionSort;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Levels
        regions_handlers::list_provinces,
        regions_handlers::list_regencies,
        regions_handlers::list_districts,
        regions_handlers::list_villages,
        // Lookup and search
        regions_handlers::list_regions,
        regions_handlers::get_region,
        regions_handlers::search_regions,
        regions_handlers::get_hierarchy,
        regions_handlers::get_stats,
        // Health
        regions_handlers::health_check,
    ),
    components(
        schemas(
            ApiResponse<regions_dtos::RegionResponseDto>,
            ApiResponse<Vec<regions_dtos::RegionResponseDto>>,
            ApiResponse<regions_dtos::RegionHierarchyDto>,
            ApiResponse<regions_dtos::RegionStatsDto>,
            ApiResponse<regions_dtos::HealthResponseDto>,
            Meta,
            RegionKind,
            RegionSort,
            regions_dtos::RegionResponseDto,
            regions_dtos::RegionHierarchyDto,
            regions_dtos::RegionStatsDto,
            regions_dtos::HealthResponseDto,
        )
    ),
    tags(
        (name = "regions", description = "Indonesian administrative regions (provinces, regencies, districts, villages)"),
        (name = "health", description = "Store connectivity"),
    ),
    info(
        title = "Wilayah API",
        version = "0.1.0",
        description = "Read-only API over the Indonesian administrative region hierarchy",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/api/provinces",
            "/api/regencies",
            "/api/districts",
            "/api/villages",
            "/api/regions",
            "/api/regions/{kind}/{code}",
            "/api/search",
            "/api/hierarchy/{code}",
            "/api/stats",
            "/health",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {}",
                expected
            );
        }
    }

    #[test]
    fn test_info_modifier_overrides_title() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Custom".to_string(),
            version: "9.9.9".to_string(),
            description: "desc".to_string(),
        }
        .modify(&mut doc);
        assert_eq!(doc.info.title, "Custom");
        assert_eq!(doc.info.version, "9.9.9");
    }
}
