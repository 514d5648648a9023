/// Default page size for region listings and search
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Shortest search term accepted; shorter terms would degrade into a full scan
pub const MIN_SEARCH_LENGTH: usize = 2;

// =============================================================================
// EXPORT ARTIFACTS
// =============================================================================

/// File stem of the artifact holding every kind
pub const COMBINED_EXPORT_STEM: &str = "wilayah_combined";
