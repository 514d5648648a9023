//! Region store contract and its adapters.
//!
//! The rest of the crate sees the store only through [`RegionStore`]: a small
//! document-store style surface (insert many, delete many, find, count,
//! group-by-kind) over one flat collection of regions.

mod filter;
mod memory;
mod postgres;

pub use filter::{like_pattern, Page, RegionFilter, RegionSort};
pub use memory::MemoryRegionStore;
pub use postgres::PgRegionStore;

use async_trait::async_trait;

use crate::core::error::Result;
use crate::features::regions::models::{KindCounts, Region, StoredRegion};

#[async_trait]
pub trait RegionStore: Send + Sync {
    /// Inserts all regions or none of them. Assigns surrogate ids.
    async fn insert_many(&self, regions: &[Region]) -> Result<u64>;

    async fn delete_many(&self, filter: &RegionFilter) -> Result<u64>;

    async fn find(
        &self,
        filter: &RegionFilter,
        sort: RegionSort,
        page: Page,
    ) -> Result<Vec<StoredRegion>>;

    async fn count(&self, filter: &RegionFilter) -> Result<u64>;

    async fn count_by_kind(&self) -> Result<KindCounts>;

    /// Cheap connectivity probe
    async fn ping(&self) -> Result<()>;

    async fn find_one(&self, filter: &RegionFilter) -> Result<Option<StoredRegion>> {
        Ok(self
            .find(filter, RegionSort::Code, Page::one())
            .await?
            .into_iter()
            .next())
    }
}
