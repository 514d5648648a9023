use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::filter::{Page, RegionFilter, RegionSort};
use super::RegionStore;
use crate::core::error::{AppError, Result};
use crate::features::regions::models::{KindCounts, Region, RegionKind, StoredRegion};

#[derive(Default)]
struct Collection {
    rows: Vec<StoredRegion>,
    keys: HashSet<(RegionKind, String)>,
}

/// In-process region store. Backs dry-run loads and tests; enforces the same
/// `(kind, full_code)` uniqueness and per-call atomicity as the database.
pub struct MemoryRegionStore {
    collection: RwLock<Collection>,
    available: AtomicBool,
}

impl MemoryRegionStore {
    pub fn new() -> Self {
        Self {
            collection: RwLock::new(Collection::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates losing (or regaining) the store connection
    #[cfg(test)]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::StoreUnavailable(
                "memory store is offline".to_string(),
            ))
        }
    }
}

impl Default for MemoryRegionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegionStore for MemoryRegionStore {
    async fn insert_many(&self, regions: &[Region]) -> Result<u64> {
        self.check_available()?;
        let mut collection = self.collection.write().await;

        let mut incoming = HashSet::with_capacity(regions.len());
        for region in regions {
            let key = (region.kind, region.full_code.clone());
            if collection.keys.contains(&key) || !incoming.insert(key) {
                return Err(AppError::Conflict(format!(
                    "duplicate {} full code '{}'",
                    region.kind, region.full_code
                )));
            }
        }

        collection.keys.extend(incoming);
        collection
            .rows
            .extend(regions.iter().cloned().map(|region| StoredRegion {
                id: Uuid::now_v7(),
                region,
            }));

        Ok(regions.len() as u64)
    }

    async fn delete_many(&self, filter: &RegionFilter) -> Result<u64> {
        self.check_available()?;
        let mut collection = self.collection.write().await;

        let before = collection.rows.len();
        collection.rows.retain(|row| !filter.matches(&row.region));
        let deleted = before - collection.rows.len();

        let remaining: HashSet<_> = collection
            .rows
            .iter()
            .map(|row| (row.region.kind, row.region.full_code.clone()))
            .collect();
        collection.keys = remaining;

        Ok(deleted as u64)
    }

    async fn find(
        &self,
        filter: &RegionFilter,
        sort: RegionSort,
        page: Page,
    ) -> Result<Vec<StoredRegion>> {
        self.check_available()?;
        let collection = self.collection.read().await;

        let mut matched: Vec<&StoredRegion> = collection
            .rows
            .iter()
            .filter(|row| filter.matches(&row.region))
            .collect();
        matched.sort_by(|a, b| sort.compare(&a.region, &b.region));

        let skip = page.offset.max(0) as usize;
        let take = page.limit.map_or(usize::MAX, |l| l.max(0) as usize);

        Ok(matched.into_iter().skip(skip).take(take).cloned().collect())
    }

    async fn count(&self, filter: &RegionFilter) -> Result<u64> {
        self.check_available()?;
        let collection = self.collection.read().await;
        Ok(collection
            .rows
            .iter()
            .filter(|row| filter.matches(&row.region))
            .count() as u64)
    }

    async fn count_by_kind(&self) -> Result<KindCounts> {
        self.check_available()?;
        let collection = self.collection.read().await;

        let mut counts = KindCounts::default();
        for row in &collection.rows {
            counts.add(row.region.kind, 1);
        }
        Ok(counts)
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::regions::models::ParentCodes;
    use chrono::Utc;

    fn province(code: &str, name: &str) -> Region {
        Region {
            kind: RegionKind::Province,
            local_code: code.to_string(),
            full_code: code.to_string(),
            name: name.to_string(),
            parents: ParentCodes::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_is_all_or_nothing() {
        let store = MemoryRegionStore::new();
        store
            .insert_many(&[province("11", "Aceh")])
            .await
            .unwrap();

        let result = store
            .insert_many(&[province("12", "Sumatera Utara"), province("11", "Aceh")])
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(store.count(&RegionFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_frees_keys() {
        let store = MemoryRegionStore::new();
        store
            .insert_many(&[province("11", "Aceh")])
            .await
            .unwrap();
        assert_eq!(store.delete_many(&RegionFilter::default()).await.unwrap(), 1);
        assert_eq!(
            store.insert_many(&[province("11", "Aceh")]).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_find_sorts_and_pages() {
        let store = MemoryRegionStore::new();
        store
            .insert_many(&[
                province("13", "Sumatera Barat"),
                province("11", "Aceh"),
                province("12", "Sumatera Utara"),
            ])
            .await
            .unwrap();

        let page = store
            .find(
                &RegionFilter::kind(RegionKind::Province),
                RegionSort::LocalCode,
                Page::new(2, 1),
            )
            .await
            .unwrap();
        let codes: Vec<_> = page.iter().map(|r| r.region.full_code.as_str()).collect();
        assert_eq!(codes, vec!["12", "13"]);
    }

    #[tokio::test]
    async fn test_offline_store_is_unavailable() {
        let store = MemoryRegionStore::new();
        store.set_available(false);
        assert!(matches!(
            store.ping().await,
            Err(AppError::StoreUnavailable(_))
        ));
    }
}
