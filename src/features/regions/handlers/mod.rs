pub mod region_handler;

pub use region_handler::{
    __path_get_hierarchy, __path_get_region, __path_get_stats, __path_health_check,
    __path_list_districts, __path_list_provinces, __path_list_regencies, __path_list_regions,
    __path_list_villages, __path_search_regions, get_hierarchy, get_region, get_stats,
    health_check, list_districts, list_provinces, list_regencies, list_regions, list_villages,
    search_regions,
};
