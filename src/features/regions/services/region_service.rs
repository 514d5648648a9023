use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::error::{AppError, Result};
use crate::features::regions::models::{KindCounts, RegionHierarchy, RegionKind, StoredRegion};
use crate::modules::store::{Page, RegionFilter, RegionSort, RegionStore};
use crate::shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_SEARCH_LENGTH};
use crate::shared::validation::is_region_code;

/// One page of a filtered result set plus the count before paging
#[derive(Debug, Clone)]
pub struct RegionPage {
    pub items: Vec<StoredRegion>,
    pub total: u64,
    pub limit: i64,
    pub offset: i64,
}

impl RegionPage {
    pub fn has_more(&self) -> bool {
        (self.offset + self.limit) < self.total as i64
    }
}

/// Filters of the generic region listing. Codes are full codes.
#[derive(Debug, Clone, Default)]
pub struct RegionListFilter {
    pub kind: Option<RegionKind>,
    pub province_code: Option<String>,
    pub regency_code: Option<String>,
    pub district_code: Option<String>,
    pub search: Option<String>,
}

/// Builds a page window, applying the default size and rejecting
/// out-of-range values.
pub fn page_window(limit: Option<i64>, offset: Option<i64>) -> Result<Page> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = offset.unwrap_or(0);

    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    if offset < 0 {
        return Err(AppError::Validation(
            "offset must not be negative".to_string(),
        ));
    }

    Ok(Page::new(limit, offset))
}

fn search_term(term: &str) -> Result<String> {
    let term = term.trim();
    if term.chars().count() < MIN_SEARCH_LENGTH {
        return Err(AppError::Validation(format!(
            "Search term must be at least {} characters",
            MIN_SEARCH_LENGTH
        )));
    }
    Ok(term.to_string())
}

fn code_of_kind(code: &str, kind: RegionKind) -> Result<()> {
    if RegionKind::from_code_shape(code) == Some(kind) {
        Ok(())
    } else {
        Err(AppError::InvalidCodeFormat(format!(
            "'{}' is not a {} code",
            code, kind
        )))
    }
}

fn digits(code: &str) -> Result<String> {
    if is_region_code(code) {
        Ok(code.to_string())
    } else {
        Err(AppError::InvalidCodeFormat(format!(
            "'{}' is not a region code",
            code
        )))
    }
}

/// Read side of the hierarchy. Every lookup goes through the denormalised
/// parent codes, so no query needs a join.
///
/// Reads are not isolated from an in-flight load: during clear-then-load a
/// caller may see a partially repopulated collection.
#[derive(Clone)]
pub struct RegionService {
    store: Arc<dyn RegionStore>,
}

impl RegionService {
    pub fn new(store: Arc<dyn RegionStore>) -> Self {
        Self { store }
    }

    // ==================== Level Methods ====================

    /// Every region of one level, ordered by local code
    pub async fn by_kind(&self, kind: RegionKind) -> Result<Vec<StoredRegion>> {
        self.store
            .find(&RegionFilter::kind(kind), RegionSort::LocalCode, Page::all())
            .await
    }

    /// Direct children of `parent_full_code`, ordered by local code. An
    /// unknown parent yields an empty list.
    pub async fn children_of(
        &self,
        parent_full_code: &str,
        child_kind: RegionKind,
    ) -> Result<Vec<StoredRegion>> {
        let parent_kind = child_kind.parent().ok_or_else(|| {
            AppError::InvalidCodeFormat("provinces have no parent region".to_string())
        })?;
        code_of_kind(parent_full_code, parent_kind)?;

        self.store
            .find(
                &RegionFilter::children(child_kind, parent_full_code),
                RegionSort::LocalCode,
                Page::all(),
            )
            .await
    }

    // ==================== Lookup Methods ====================

    pub async fn get_by_code(&self, kind: RegionKind, full_code: &str) -> Result<StoredRegion> {
        let full_code = digits(full_code)?;
        self.store
            .find_one(&RegionFilter::code(kind, full_code.as_str()))
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("{} with code '{}' not found", kind, full_code))
            })
    }

    /// Resolves a region by full code and walks its parent codes upward.
    /// Ancestors missing from the store come back as `None`.
    pub async fn hierarchy_of(&self, full_code: &str) -> Result<RegionHierarchy> {
        let kind = RegionKind::from_code_shape(full_code).ok_or_else(|| {
            AppError::InvalidCodeFormat(format!(
                "'{}' does not match any region code shape",
                full_code
            ))
        })?;

        let region = self
            .store
            .find_one(&RegionFilter::code(kind, full_code))
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("{} with code '{}' not found", kind, full_code))
            })?;

        let parents = region.region.parents.clone();
        let province = self
            .ancestor(RegionKind::Province, parents.province_code)
            .await?;
        let regency = self
            .ancestor(RegionKind::Regency, parents.regency_full_code)
            .await?;
        let district = self
            .ancestor(RegionKind::District, parents.district_full_code)
            .await?;

        Ok(RegionHierarchy {
            region,
            province,
            regency,
            district,
        })
    }

    async fn ancestor(
        &self,
        kind: RegionKind,
        full_code: Option<String>,
    ) -> Result<Option<StoredRegion>> {
        match full_code {
            Some(code) => self.store.find_one(&RegionFilter::code(kind, code)).await,
            None => Ok(None),
        }
    }

    // ==================== Search Methods ====================

    /// Case-insensitive substring match on name. `total` is counted
    /// separately from the page and may drift under concurrent writes.
    pub async fn search(
        &self,
        term: &str,
        kind: Option<RegionKind>,
        page: Page,
        sort: RegionSort,
        cancel: &CancellationToken,
    ) -> Result<RegionPage> {
        let filter = RegionFilter {
            kind,
            name_contains: Some(search_term(term)?),
            ..RegionFilter::default()
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            found = self.page(&filter, page, sort) => found,
        }
    }

    /// Generic filtered listing
    pub async fn list(
        &self,
        filter: &RegionListFilter,
        page: Page,
        sort: RegionSort,
    ) -> Result<RegionPage> {
        let filter = RegionFilter {
            kind: filter.kind,
            full_code: None,
            province_code: filter.province_code.as_deref().map(digits).transpose()?,
            regency_full_code: filter.regency_code.as_deref().map(digits).transpose()?,
            district_full_code: filter.district_code.as_deref().map(digits).transpose()?,
            name_contains: filter.search.as_deref().map(search_term).transpose()?,
        };

        self.page(&filter, page, sort).await
    }

    async fn page(&self, filter: &RegionFilter, page: Page, sort: RegionSort) -> Result<RegionPage> {
        let total = self.store.count(filter).await?;
        let items = self.store.find(filter, sort, page).await?;

        Ok(RegionPage {
            items,
            total,
            limit: page.limit.unwrap_or(total as i64),
            offset: page.offset,
        })
    }

    // ==================== Stats Methods ====================

    pub async fn aggregate_counts(&self) -> Result<KindCounts> {
        self.store.count_by_kind().await
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::regions::services::{BulkLoader, LoadOptions, SourceReader};
    use crate::modules::store::MemoryRegionStore;
    use crate::shared::test_helpers::{seeded_store, write_unit};

    async fn service() -> RegionService {
        RegionService::new(seeded_store().await)
    }

    fn codes(regions: &[StoredRegion]) -> Vec<&str> {
        regions.iter().map(|r| r.region.full_code.as_str()).collect()
    }

    #[tokio::test]
    async fn test_by_kind_orders_by_local_code() {
        let provinces = service().await.by_kind(RegionKind::Province).await.unwrap();
        assert_eq!(codes(&provinces), vec!["11", "12"]);
    }

    #[tokio::test]
    async fn test_children_of_regency() {
        let districts = service()
            .await
            .children_of("1101", RegionKind::District)
            .await
            .unwrap();
        assert_eq!(codes(&districts), vec!["110101", "110102"]);
        assert!(districts
            .iter()
            .all(|d| d.region.parents.regency_full_code.as_deref() == Some("1101")));
    }

    #[tokio::test]
    async fn test_children_of_unknown_parent_is_empty() {
        let villages = service()
            .await
            .children_of("119999", RegionKind::Village)
            .await
            .unwrap();
        assert!(villages.is_empty());
    }

    #[tokio::test]
    async fn test_children_of_rejects_wrong_parent_shape() {
        let service = service().await;
        assert!(matches!(
            service.children_of("11", RegionKind::District).await,
            Err(AppError::InvalidCodeFormat(_))
        ));
        assert!(matches!(
            service.children_of("11", RegionKind::Province).await,
            Err(AppError::InvalidCodeFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_search_rejects_short_terms() {
        let service = service().await;
        let cancel = CancellationToken::new();
        for term in ["", "a", "  b  "] {
            let result = service
                .search(term, None, Page::new(10, 0), RegionSort::Name, &cancel)
                .await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{:?}", term);
        }
    }

    #[tokio::test]
    async fn test_search_counts_before_paging() {
        let service = service().await;
        let page = service
            .search(
                "aceh",
                None,
                Page::new(1, 0),
                RegionSort::Name,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(codes(&page.items), vec!["11"]);
        assert!(page.has_more());
    }

    #[tokio::test]
    async fn test_search_by_kind_and_kind_name_sort() {
        let service = service().await;
        let cancel = CancellationToken::new();

        let regencies = service
            .search(
                "ACEH",
                Some(RegionKind::Regency),
                Page::new(10, 0),
                RegionSort::Name,
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(codes(&regencies.items), vec!["1101", "1102"]);

        let mixed = service
            .search("la", None, Page::new(10, 0), RegionSort::KindName, &cancel)
            .await
            .unwrap();
        let kinds: Vec<_> = mixed.items.iter().map(|r| r.region.kind).collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        assert_eq!(kinds, sorted);
    }

    #[tokio::test]
    async fn test_cancelled_search() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = service()
            .await
            .search("aceh", None, Page::new(10, 0), RegionSort::Name, &cancel)
            .await;
        assert!(matches!(result, Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn test_hierarchy_of_district() {
        let hierarchy = service().await.hierarchy_of("110101").await.unwrap();
        assert_eq!(hierarchy.region.region.kind, RegionKind::District);
        assert_eq!(hierarchy.region.region.name, "Bakongan");
        assert_eq!(
            hierarchy.regency.map(|r| r.region.full_code),
            Some("1101".to_string())
        );
        assert_eq!(
            hierarchy.province.map(|r| r.region.full_code),
            Some("11".to_string())
        );
        assert!(hierarchy.district.is_none());
    }

    #[tokio::test]
    async fn test_hierarchy_of_village_under_three_digit_district() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_unit(root, "provinsi", "provinsi.json", r#"{"11": "Aceh"}"#);
        write_unit(root, "kabupaten_kota", "kab-11.json", r#"{"01": "Aceh Selatan"}"#);
        write_unit(root, "kecamatan", "kec-11-01.json", r#"{"010": "Trumon"}"#);
        write_unit(
            root,
            "kelurahan_desa",
            "keldesa-11-01-010.json",
            r#"{"2001": "Keude Trumon"}"#,
        );

        let store = Arc::new(MemoryRegionStore::new());
        let report = BulkLoader::new(store.clone())
            .load_source(
                SourceReader::new(root),
                &LoadOptions::default(),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(report.inserted, 4);

        let hierarchy = RegionService::new(store)
            .hierarchy_of("11010102001")
            .await
            .unwrap();
        assert_eq!(hierarchy.region.region.kind, RegionKind::Village);
        assert_eq!(
            hierarchy.district.map(|r| r.region.full_code),
            Some("1101010".to_string())
        );
        assert_eq!(
            hierarchy.regency.map(|r| r.region.full_code),
            Some("1101".to_string())
        );
    }

    #[tokio::test]
    async fn test_hierarchy_of_errors() {
        let service = service().await;
        assert!(matches!(
            service.hierarchy_of("123").await,
            Err(AppError::InvalidCodeFormat(_))
        ));
        assert!(matches!(
            service.hierarchy_of("11x1").await,
            Err(AppError::InvalidCodeFormat(_))
        ));
        assert!(matches!(
            service.hierarchy_of("9999").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_province() {
        let service = service().await;
        let filter = RegionListFilter {
            kind: Some(RegionKind::Village),
            province_code: Some("11".into()),
            ..RegionListFilter::default()
        };
        let page = service
            .list(&filter, page_window(None, None).unwrap(), RegionSort::Code)
            .await
            .unwrap();
        assert_eq!(page.total, 4);
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn test_get_by_code() {
        let service = service().await;
        let regency = service.get_by_code(RegionKind::Regency, "1102").await.unwrap();
        assert_eq!(regency.region.name, "Aceh Tenggara");
        assert!(matches!(
            service.get_by_code(RegionKind::Regency, "1199").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_aggregate_counts() {
        let counts = service().await.aggregate_counts().await.unwrap();
        assert_eq!(counts.total(), 11);
        assert_eq!(counts.village, 4);
    }

    #[test]
    fn test_page_window_bounds() {
        assert_eq!(page_window(None, None).unwrap(), Page::new(100, 0));
        assert!(page_window(Some(0), None).is_err());
        assert!(page_window(Some(1001), None).is_err());
        assert!(page_window(Some(10), Some(-1)).is_err());
    }
}
