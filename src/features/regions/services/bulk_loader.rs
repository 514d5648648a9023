use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::hierarchy_assembler::HierarchyAssembler;
use super::source_reader::SourceReader;
use crate::core::config::IngestConfig;
use crate::core::error::{AppError, Result};
use crate::features::regions::models::{
    BatchFailure, LoadReport, OrphanEntity, Region, RegionKind,
};
use crate::modules::store::{Page, RegionFilter, RegionSort, RegionStore};

/// Children fetched per page during the referential pass
const VERIFY_PAGE_SIZE: i64 = 10_000;

/// Assembled regions buffered between the source reader and the batcher
const STREAM_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub batch_size: usize,
    /// Bulk inserts in flight at once
    pub concurrency: usize,
    /// Delete every stored region before loading (full replace)
    pub clear_existing: bool,
    /// Report regions whose parent did not end up stored
    pub verify_references: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: IngestConfig::DEFAULT_BATCH_SIZE,
            concurrency: IngestConfig::DEFAULT_LOAD_CONCURRENCY,
            clear_existing: true,
            verify_references: true,
        }
    }
}

impl From<&IngestConfig> for LoadOptions {
    fn from(config: &IngestConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            concurrency: config.load_concurrency,
            ..Self::default()
        }
    }
}

/// Outcome of one spawned bulk insert
struct BatchOutcome {
    kind: RegionKind,
    number: usize,
    first_code: String,
    last_code: String,
    size: usize,
    result: Result<u64>,
}

/// Bounded pool of in-flight bulk inserts. Batch numbers restart at 1 for
/// every kind.
struct BatchPipeline {
    store: Arc<dyn RegionStore>,
    inflight: Arc<Semaphore>,
    tasks: JoinSet<BatchOutcome>,
    kind: Option<RegionKind>,
    number: usize,
}

impl BatchPipeline {
    fn new(store: Arc<dyn RegionStore>, concurrency: usize) -> Self {
        Self {
            store,
            inflight: Arc::new(Semaphore::new(concurrency.max(1))),
            tasks: JoinSet::new(),
            kind: None,
            number: 0,
        }
    }

    /// Waits for a free slot and spawns the insert. Returns `false` when
    /// cancellation fired first; the batch is then dropped unsent.
    async fn submit(&mut self, regions: Vec<Region>, cancel: &CancellationToken) -> Result<bool> {
        let Some(first) = regions.first() else {
            return Ok(true);
        };
        let kind = first.kind;
        let first_code = first.full_code.clone();
        let last_code = regions
            .last()
            .map(|r| r.full_code.clone())
            .unwrap_or_default();

        if self.kind != Some(kind) {
            self.kind = Some(kind);
            self.number = 0;
        }
        self.number += 1;
        let number = self.number;

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(false),
            permit = self.inflight.clone().acquire_owned() => permit
                .map_err(|e| AppError::Internal(format!("Batch pool closed: {}", e)))?,
        };

        let store = Arc::clone(&self.store);
        self.tasks.spawn(async move {
            let result = store.insert_many(&regions).await;
            drop(permit);
            BatchOutcome {
                kind,
                number,
                first_code,
                last_code,
                size: regions.len(),
                result,
            }
        });

        Ok(true)
    }

    /// Non-blocking drain of finished inserts
    fn collect_completed(&mut self, report: &mut LoadReport) -> Result<()> {
        while let Some(joined) = self.tasks.try_join_next() {
            record_outcome(report, joined)?;
        }
        Ok(())
    }

    /// Waits for every in-flight insert. Keeps draining after a fatal
    /// outcome so no batch is left running; returns the first fatal error.
    async fn drain(&mut self, report: &mut LoadReport) -> Result<()> {
        let mut fatal = None;
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = record_outcome(report, joined) {
                fatal.get_or_insert(e);
            }
        }
        fatal.map_or(Ok(()), Err)
    }
}

fn record_outcome(
    report: &mut LoadReport,
    joined: std::result::Result<BatchOutcome, tokio::task::JoinError>,
) -> Result<()> {
    let outcome =
        joined.map_err(|e| AppError::Internal(format!("Batch insert task failed: {}", e)))?;

    match outcome.result {
        Ok(inserted) => {
            report.inserted_by_kind.add(outcome.kind, inserted);
            report.inserted += inserted;
            tracing::info!(
                "Inserted {} batch {} ({} records, {} {} so far, {} total)",
                outcome.kind,
                outcome.number,
                inserted,
                report.inserted_by_kind.get(outcome.kind),
                outcome.kind,
                report.inserted
            );
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                "Failed to insert {} batch {} ({}..{}): {}",
                outcome.kind,
                outcome.number,
                outcome.first_code,
                outcome.last_code,
                e
            );
            report.errors.push(BatchFailure {
                kind: outcome.kind,
                batch: outcome.number,
                first_code: outcome.first_code,
                last_code: outcome.last_code,
                size: outcome.size,
                message: e.to_string(),
            });
            if e.is_fatal() {
                Err(e)
            } else {
                Ok(())
            }
        }
    }
}

/// Moves an assembled generation into the store.
///
/// Batches never mix kinds and each one is a single atomic insert. A
/// rejected batch is recorded and the load moves on; losing the store or a
/// composition error upstream aborts the generation. Every call ends in a
/// [`LoadReport`], aborted ones included, so callers always learn how much
/// was stored.
#[derive(Clone)]
pub struct BulkLoader {
    store: Arc<dyn RegionStore>,
}

impl BulkLoader {
    pub fn new(store: Arc<dyn RegionStore>) -> Self {
        Self { store }
    }

    /// Reads, assembles and loads one generation from `reader`, folding the
    /// skipped source units into the report.
    pub async fn load_source(
        &self,
        reader: SourceReader,
        options: &LoadOptions,
        cancel: &CancellationToken,
    ) -> LoadReport {
        tracing::info!("Loading generation from {}", reader.root().display());
        let assembler = HierarchyAssembler::new(reader, Utc::now());
        tracing::debug!("Generation timestamp {}", assembler.generated_at());

        let started = Instant::now();
        let (mut report, stream) = self.run(assembler.assemble(), options, cancel).await;
        if let Some(stream) = stream {
            report.record_source_issues(stream.into_summary().skipped);
        }
        report.duration_ms = started.elapsed().as_millis() as u64;

        report
    }

    pub async fn load_generation<I>(
        &self,
        stream: I,
        options: &LoadOptions,
        cancel: &CancellationToken,
    ) -> LoadReport
    where
        I: IntoIterator<Item = Result<Region>>,
        I::IntoIter: Send + 'static,
    {
        self.run(stream.into_iter(), options, cancel).await.0
    }

    /// Drives `stream` on the blocking pool and batches what it yields.
    /// Hands the stream back once it is no longer being read, so the caller
    /// can collect its accounting.
    async fn run<S>(
        &self,
        stream: S,
        options: &LoadOptions,
        cancel: &CancellationToken,
    ) -> (LoadReport, Option<S>)
    where
        S: Iterator<Item = Result<Region>> + Send + 'static,
    {
        let started = Instant::now();
        let mut report = LoadReport::new(Utc::now());

        if cancel.is_cancelled() {
            tracing::warn!("Load cancelled before it started");
            report.mark_cancelled();
            return (report, Some(stream));
        }

        if options.clear_existing {
            match self.store.delete_many(&RegionFilter::default()).await {
                Ok(cleared) => {
                    report.cleared = cleared;
                    tracing::info!("Cleared {} existing regions", cleared);
                }
                Err(e) => {
                    tracing::error!("Failed to clear existing regions: {}", e);
                    report.mark_aborted(&e);
                    report.duration_ms = started.elapsed().as_millis() as u64;
                    return (report, Some(stream));
                }
            }
        }

        let batch_size = options.batch_size.max(1);

        // Source reads and JSON decoding are blocking; they run off the
        // runtime and feed the batcher through a bounded channel.
        let (tx, mut rx) = mpsc::channel::<Result<Region>>(STREAM_BUFFER);
        let producer = tokio::task::spawn_blocking(move || {
            let mut stream = stream;
            for item in stream.by_ref() {
                if tx.blocking_send(item).is_err() {
                    break;
                }
            }
            stream
        });

        let mut pipeline = BatchPipeline::new(Arc::clone(&self.store), options.concurrency);
        let mut batch: Vec<Region> = Vec::with_capacity(batch_size);
        let mut failure: Option<AppError> = None;
        let mut cancelled = false;

        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                item = rx.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            let region = match item {
                Ok(region) => region,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            if batch.last().is_some_and(|last| last.kind != region.kind) {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                match pipeline.submit(full, cancel).await {
                    Ok(true) => {}
                    Ok(false) => {
                        cancelled = true;
                        break;
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }

            batch.push(region);

            if batch.len() >= batch_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                match pipeline.submit(full, cancel).await {
                    Ok(true) => {}
                    Ok(false) => {
                        cancelled = true;
                        break;
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }

            if let Err(e) = pipeline.collect_completed(&mut report) {
                failure = Some(e);
                break;
            }
        }

        // Closing the receiver stops the producer at its next send
        drop(rx);

        if failure.is_none() && !cancelled && !batch.is_empty() {
            match pipeline.submit(std::mem::take(&mut batch), cancel).await {
                Ok(sent) => cancelled = !sent,
                Err(e) => failure = Some(e),
            }
        }
        if cancelled && !batch.is_empty() {
            tracing::debug!("Dropping {} buffered regions after cancel", batch.len());
        }

        if let Err(e) = pipeline.drain(&mut report).await {
            failure.get_or_insert(e);
        }

        let stream = match producer.await {
            Ok(stream) => Some(stream),
            Err(e) => {
                failure.get_or_insert(AppError::Internal(format!(
                    "Source reader task failed: {}",
                    e
                )));
                None
            }
        };

        if let Some(e) = failure {
            tracing::error!("Load aborted after {} regions: {}", report.inserted, e);
            report.mark_aborted(&e);
        } else if cancelled {
            tracing::warn!("Load cancelled after {} regions", report.inserted);
            report.mark_cancelled();
        } else if options.verify_references {
            if let Err(e) = self.verify_references(&mut report, cancel).await {
                tracing::error!("Reference verification failed: {}", e);
                report.mark_aborted(&e);
            }
        }

        report.refresh_status();
        report.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            "Load finished: {:?}, {} inserted, {} failed batches, {} orphans in {}ms",
            report.status,
            report.inserted,
            report.errors.len(),
            report.orphans.len(),
            report.duration_ms
        );

        (report, stream)
    }

    /// Records every stored region whose parent full code resolves to
    /// nothing. Orphans stay stored.
    async fn verify_references(
        &self,
        report: &mut LoadReport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for child in RegionKind::ALL {
            let Some(parent) = child.parent() else {
                continue;
            };
            if cancel.is_cancelled() {
                report.mark_cancelled();
                return Ok(());
            }

            let parents: HashSet<String> = self
                .store
                .find(&RegionFilter::kind(parent), RegionSort::Code, Page::all())
                .await?
                .into_iter()
                .map(|stored| stored.region.full_code)
                .collect();

            let before = report.orphans.len();
            let mut offset = 0;
            loop {
                let page = self
                    .store
                    .find(
                        &RegionFilter::kind(child),
                        RegionSort::Code,
                        Page::new(VERIFY_PAGE_SIZE, offset),
                    )
                    .await?;
                let fetched = page.len() as i64;

                for stored in page {
                    let region = stored.region;
                    let missing = match region.parent_full_code() {
                        Some(code) if parents.contains(code) => None,
                        Some(code) => Some(code.to_string()),
                        None => Some(String::new()),
                    };
                    if let Some(missing_parent) = missing {
                        report.orphans.push(OrphanEntity {
                            kind: child,
                            full_code: region.full_code,
                            missing_parent,
                        });
                    }
                }

                if fetched < VERIFY_PAGE_SIZE {
                    break;
                }
                offset += VERIFY_PAGE_SIZE;
            }

            let found = report.orphans.len() - before;
            if found > 0 {
                tracing::warn!("{} {} regions have no stored {}", found, child, parent);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::regions::models::{KindCounts, LoadStatus, ParentCodes, StoredRegion};
    use crate::modules::store::MemoryRegionStore;
    use crate::shared::test_helpers::{aceh_fixture, write_unit};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use fake::faker::address::en::CityName;
    use fake::Fake;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory store that runs a hook after every successful bulk insert,
    /// given the number of inserts so far.
    struct HookedStore {
        inner: Arc<MemoryRegionStore>,
        inserts: AtomicUsize,
        after_insert: Box<dyn Fn(usize) + Send + Sync>,
    }

    impl HookedStore {
        fn new(
            inner: Arc<MemoryRegionStore>,
            after_insert: impl Fn(usize) + Send + Sync + 'static,
        ) -> Self {
            Self {
                inner,
                inserts: AtomicUsize::new(0),
                after_insert: Box::new(after_insert),
            }
        }
    }

    #[async_trait]
    impl RegionStore for HookedStore {
        async fn insert_many(&self, regions: &[Region]) -> Result<u64> {
            let inserted = self.inner.insert_many(regions).await?;
            let count = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
            (self.after_insert)(count);
            Ok(inserted)
        }

        async fn delete_many(&self, filter: &RegionFilter) -> Result<u64> {
            self.inner.delete_many(filter).await
        }

        async fn find(
            &self,
            filter: &RegionFilter,
            sort: RegionSort,
            page: Page,
        ) -> Result<Vec<StoredRegion>> {
            self.inner.find(filter, sort, page).await
        }

        async fn count(&self, filter: &RegionFilter) -> Result<u64> {
            self.inner.count(filter).await
        }

        async fn count_by_kind(&self) -> Result<KindCounts> {
            self.inner.count_by_kind().await
        }

        async fn ping(&self) -> Result<()> {
            self.inner.ping().await
        }
    }

    fn village(index: usize, generated_at: DateTime<Utc>) -> Region {
        let local_code = format!("{:04}", 2001 + index);
        Region {
            kind: RegionKind::Village,
            full_code: format!("110101{}", local_code),
            local_code,
            name: CityName().fake(),
            parents: ParentCodes {
                province_code: Some("11".into()),
                regency_local_code: Some("01".into()),
                district_local_code: Some("01".into()),
                regency_full_code: Some("1101".into()),
                district_full_code: Some("110101".into()),
            },
            created_at: generated_at,
            updated_at: generated_at,
        }
    }

    fn villages(count: usize) -> Vec<Region> {
        let now = Utc::now();
        (0..count).map(|i| village(i, now)).collect()
    }

    fn options(batch_size: usize, concurrency: usize) -> LoadOptions {
        LoadOptions {
            batch_size,
            concurrency,
            clear_existing: true,
            verify_references: false,
        }
    }

    fn fixture_loader() -> (tempfile::TempDir, Arc<MemoryRegionStore>, BulkLoader) {
        let dir = tempfile::tempdir().unwrap();
        aceh_fixture(dir.path());
        let store = Arc::new(MemoryRegionStore::new());
        let loader = BulkLoader::new(store.clone());
        (dir, store, loader)
    }

    #[tokio::test]
    async fn test_loads_every_level() {
        let (dir, store, loader) = fixture_loader();

        let report = loader
            .load_source(
                SourceReader::new(dir.path()),
                &LoadOptions::default(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.status, LoadStatus::Complete);
        assert_eq!(report.inserted, 11);
        assert_eq!(report.inserted_by_kind.province, 2);
        assert_eq!(report.inserted_by_kind.regency, 2);
        assert_eq!(report.inserted_by_kind.district, 3);
        assert_eq!(report.inserted_by_kind.village, 4);
        assert!(report.orphans.is_empty());
        assert!(report.fatal.is_none());
        assert_eq!(store.count(&RegionFilter::default()).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_load() {
        let store = Arc::new(MemoryRegionStore::new());
        let loader = BulkLoader::new(store.clone());

        let mut stream = villages(3000);
        // 500th record of the second batch repeats its first record
        stream[1499] = stream[1000].clone();

        let report = loader
            .load_generation(
                stream.into_iter().map(Ok),
                &options(1000, 4),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.status, LoadStatus::Partial);
        assert_eq!(report.inserted_by_kind.village, 2000);
        assert_eq!(report.errors.len(), 1);

        let failure = &report.errors[0];
        assert_eq!(failure.kind, RegionKind::Village);
        assert_eq!(failure.batch, 2);
        assert_eq!(failure.size, 1000);
        assert_eq!(failure.first_code, "1101013001");
        assert_eq!(store.count(&RegionFilter::default()).await.unwrap(), 2000);
    }

    #[tokio::test]
    async fn test_batches_never_mix_kinds() {
        let store = Arc::new(MemoryRegionStore::new());
        let loader = BulkLoader::new(store.clone());

        let now = Utc::now();
        let mut aceh = village(0, now);
        aceh.kind = RegionKind::Province;
        aceh.full_code = "11".into();
        aceh.parents = ParentCodes::default();

        let mut stream = vec![aceh.clone(), aceh];
        stream.extend(villages(3));

        let report = loader
            .load_generation(
                stream.into_iter().map(Ok),
                &options(100, 1),
                &CancellationToken::new(),
            )
            .await;

        // The duplicate province sinks only the province batch
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, RegionKind::Province);
        assert_eq!(report.errors[0].size, 2);
        assert_eq!(report.inserted_by_kind.village, 3);
    }

    #[tokio::test]
    async fn test_reload_is_idempotent() {
        let (dir, store, loader) = fixture_loader();
        let reader = SourceReader::new(dir.path());
        let cancel = CancellationToken::new();

        let first = loader
            .load_source(reader.clone(), &LoadOptions::default(), &cancel)
            .await;
        let second = loader
            .load_source(reader, &LoadOptions::default(), &cancel)
            .await;

        assert_eq!(second.cleared, 11);
        assert_eq!(first.inserted_by_kind, second.inserted_by_kind);
        assert_eq!(
            store.count_by_kind().await.unwrap(),
            second.inserted_by_kind
        );
    }

    #[tokio::test]
    async fn test_orphans_are_reported_not_rolled_back() {
        let (dir, store, loader) = fixture_loader();
        write_unit(
            dir.path(),
            "kelurahan_desa",
            "keldesa-11-01-09.json",
            r#"{"2001": "Tanpa Induk"}"#,
        );

        let report = loader
            .load_source(
                SourceReader::new(dir.path()),
                &LoadOptions::default(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.status, LoadStatus::Partial);
        assert_eq!(
            report.orphans,
            vec![OrphanEntity {
                kind: RegionKind::Village,
                full_code: "1101092001".into(),
                missing_parent: "110109".into(),
            }]
        );
        assert_eq!(report.inserted_by_kind.village, 5);
        assert!(store
            .find_one(&RegionFilter::code(RegionKind::Village, "1101092001"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_skipped_units_make_load_partial() {
        let (dir, _store, loader) = fixture_loader();
        write_unit(dir.path(), "kabupaten_kota", "kab-12.json", "[1, 2]");

        let report = loader
            .load_source(
                SourceReader::new(dir.path()),
                &LoadOptions::default(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.status, LoadStatus::Partial);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.inserted, 11);
    }

    #[tokio::test]
    async fn test_cancel_before_start_loads_nothing() {
        let store = Arc::new(MemoryRegionStore::new());
        let loader = BulkLoader::new(store.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = loader
            .load_generation(villages(10).into_iter().map(Ok), &options(5, 1), &cancel)
            .await;

        assert_eq!(report.status, LoadStatus::Cancelled);
        assert_eq!(report.inserted, 0);
        assert_eq!(store.count(&RegionFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_midway_keeps_whole_batches() {
        let inner = Arc::new(MemoryRegionStore::new());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        let store = HookedStore::new(inner.clone(), move |_| trigger.cancel());
        let loader = BulkLoader::new(Arc::new(store));

        let report = loader
            .load_generation(
                villages(3000).into_iter().map(Ok),
                &options(1000, 1),
                &cancel,
            )
            .await;

        assert_eq!(report.status, LoadStatus::Cancelled);
        assert_eq!(report.inserted, 1000);
        assert_eq!(inner.count(&RegionFilter::default()).await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn test_store_outage_aborts_with_report() {
        let store = Arc::new(MemoryRegionStore::new());
        store.set_available(false);
        let loader = BulkLoader::new(store.clone());

        let report = loader
            .load_generation(
                villages(10).into_iter().map(Ok),
                &LoadOptions {
                    clear_existing: false,
                    ..options(5, 2)
                },
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.status, LoadStatus::Aborted);
        assert_eq!(report.inserted, 0);
        assert!(!report.errors.is_empty());
        assert!(report.fatal.is_some());
    }

    #[tokio::test]
    async fn test_outage_midway_keeps_stored_counts() {
        let inner = Arc::new(MemoryRegionStore::new());
        let outage = inner.clone();
        let store = HookedStore::new(inner.clone(), move |count| {
            if count == 2 {
                outage.set_available(false);
            }
        });
        let loader = BulkLoader::new(Arc::new(store));

        let report = loader
            .load_generation(
                villages(10).into_iter().map(Ok),
                &options(2, 1),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.status, LoadStatus::Aborted);
        assert_eq!(report.inserted, 4);
        assert_eq!(report.inserted_by_kind.village, 4);
        assert!(report.errors.iter().all(|e| e.batch >= 3));
        assert!(report.fatal.is_some());

        inner.set_available(true);
        assert_eq!(inner.count(&RegionFilter::default()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_clear_failure_aborts_before_insert() {
        let store = Arc::new(MemoryRegionStore::new());
        store.set_available(false);
        let loader = BulkLoader::new(store.clone());

        let report = loader
            .load_generation(
                villages(3).into_iter().map(Ok),
                &options(2, 1),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.status, LoadStatus::Aborted);
        assert_eq!(report.cleared, 0);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_composition_error_aborts_load() {
        let store = Arc::new(MemoryRegionStore::new());
        let loader = BulkLoader::new(store.clone());

        let mut stream: Vec<Result<Region>> = villages(3).into_iter().map(Ok).collect();
        stream.push(Err(AppError::Internal("empty local code".into())));

        let report = loader
            .load_generation(stream, &options(2, 1), &CancellationToken::new())
            .await;

        assert_eq!(report.status, LoadStatus::Aborted);
        assert_eq!(report.inserted, 2);
        assert!(report
            .fatal
            .as_deref()
            .is_some_and(|m| m.contains("empty local code")));
    }
}
