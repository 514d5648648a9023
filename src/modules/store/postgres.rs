use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::filter::{like_pattern, Page, RegionFilter, RegionSort};
use super::RegionStore;
use crate::core::error::{AppError, Result};
use crate::features::regions::models::{KindCounts, Region, RegionKind, RegionRecord, StoredRegion};

const COLUMNS: &str = "id, kind, local_code, full_code, name, province_code, \
    regency_local_code, district_local_code, regency_full_code, district_full_code, \
    created_at, updated_at";

/// Postgres caps bind parameters per statement at 65535; 12 per row.
const MAX_ROWS_PER_STATEMENT: usize = 5000;

/// PostgreSQL-backed region store over the `regions` table
#[derive(Clone)]
pub struct PgRegionStore {
    pool: PgPool,
}

impl PgRegionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &RegionFilter) {
        qb.push(" WHERE TRUE");
        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ").push_bind(kind);
        }
        if let Some(code) = &filter.full_code {
            qb.push(" AND full_code = ").push_bind(code.clone());
        }
        if let Some(code) = &filter.province_code {
            qb.push(" AND province_code = ").push_bind(code.clone());
        }
        if let Some(code) = &filter.regency_full_code {
            qb.push(" AND regency_full_code = ").push_bind(code.clone());
        }
        if let Some(code) = &filter.district_full_code {
            qb.push(" AND district_full_code = ").push_bind(code.clone());
        }
        if let Some(term) = &filter.name_contains {
            qb.push(" AND name ILIKE ").push_bind(like_pattern(term));
        }
    }

    fn select_statement(
        filter: &RegionFilter,
        sort: RegionSort,
        page: Page,
    ) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM regions", COLUMNS));
        Self::push_filter(&mut qb, filter);
        qb.push(" ORDER BY ").push(sort.order_by());
        if let Some(limit) = page.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if page.offset > 0 {
            qb.push(" OFFSET ").push_bind(page.offset);
        }
        qb
    }

    fn insert_statement(regions: &[Region]) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("INSERT INTO regions ({}) ", COLUMNS));
        qb.push_values(regions, |mut row, region| {
            row.push_bind(Uuid::now_v7())
                .push_bind(region.kind)
                .push_bind(region.local_code.clone())
                .push_bind(region.full_code.clone())
                .push_bind(region.name.clone())
                .push_bind(region.parents.province_code.clone())
                .push_bind(region.parents.regency_local_code.clone())
                .push_bind(region.parents.district_local_code.clone())
                .push_bind(region.parents.regency_full_code.clone())
                .push_bind(region.parents.district_full_code.clone())
                .push_bind(region.created_at)
                .push_bind(region.updated_at);
        });
        qb
    }
}

fn store_error(context: &str, err: sqlx::Error) -> AppError {
    tracing::error!("{}: {:?}", context, err);
    AppError::from_store(err)
}

#[async_trait]
impl RegionStore for PgRegionStore {
    async fn insert_many(&self, regions: &[Region]) -> Result<u64> {
        if regions.is_empty() {
            return Ok(0);
        }

        if regions.len() <= MAX_ROWS_PER_STATEMENT {
            let result = Self::insert_statement(regions)
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| store_error("Failed to insert regions", e))?;
            return Ok(result.rows_affected());
        }

        // Oversized batches are split across statements inside one
        // transaction so the batch stays all-or-nothing.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin insert transaction", e))?;
        let mut inserted = 0;
        for chunk in regions.chunks(MAX_ROWS_PER_STATEMENT) {
            let result = Self::insert_statement(chunk)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| store_error("Failed to insert regions", e))?;
            inserted += result.rows_affected();
        }
        tx.commit()
            .await
            .map_err(|e| store_error("Failed to commit insert transaction", e))?;

        Ok(inserted)
    }

    async fn delete_many(&self, filter: &RegionFilter) -> Result<u64> {
        let mut qb = QueryBuilder::new("DELETE FROM regions");
        Self::push_filter(&mut qb, filter);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to delete regions", e))?;

        Ok(result.rows_affected())
    }

    async fn find(
        &self,
        filter: &RegionFilter,
        sort: RegionSort,
        page: Page,
    ) -> Result<Vec<StoredRegion>> {
        let records = Self::select_statement(filter, sort, page)
            .build_query_as::<RegionRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("Failed to fetch regions", e))?;

        Ok(records.into_iter().map(StoredRegion::from).collect())
    }

    async fn count(&self, filter: &RegionFilter) -> Result<u64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM regions");
        Self::push_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("Failed to count regions", e))?;

        Ok(count.max(0) as u64)
    }

    async fn count_by_kind(&self) -> Result<KindCounts> {
        let rows: Vec<(RegionKind, i64)> =
            sqlx::query_as("SELECT kind, COUNT(*) FROM regions GROUP BY kind ORDER BY kind")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| store_error("Failed to aggregate region counts", e))?;

        let mut counts = KindCounts::default();
        for (kind, count) in rows {
            counts.add(kind, count.max(0) as u64);
        }
        Ok(counts)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Store ping failed", e))?;
        Ok(())
    }
}
