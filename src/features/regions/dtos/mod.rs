pub mod region_dto;

pub use region_dto::{
    DistrictQuery, HealthResponseDto, RegencyQuery, RegionHierarchyDto, RegionListQuery,
    RegionResponseDto, RegionStatsDto, SearchQuery, VillageQuery,
};
