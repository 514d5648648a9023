use chrono::{DateTime, Utc};

use super::code_composer::{compose_full_code, derive_parent_codes};
use super::source_reader::{SourceReader, SourceRecords};
use crate::core::error::{AppError, Result};
use crate::features::regions::models::{Region, RegionKind, SourceRecord, SourceSummary};

/// Turns the per-level source into one canonical region stream:
/// provinces, then regencies, then districts, then villages, each level in
/// source emission order.
///
/// Assembly is a single forward pass. Parent existence is not checked here;
/// the loader's referential pass reports orphans after the fact.
#[derive(Debug, Clone)]
pub struct HierarchyAssembler {
    reader: SourceReader,
    generated_at: DateTime<Utc>,
}

impl HierarchyAssembler {
    /// `generated_at` stamps `created_at`/`updated_at` of every region in
    /// the generation.
    pub fn new(reader: SourceReader, generated_at: DateTime<Utc>) -> Self {
        Self {
            reader,
            generated_at,
        }
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn assemble(&self) -> AssembledRegions {
        AssembledRegions {
            reader: self.reader.clone(),
            generated_at: self.generated_at,
            pending: RegionKind::ALL.into_iter(),
            current: None,
            summary: SourceSummary::default(),
            failed: false,
        }
    }
}

/// Builds one region from a source record. Fails only when the record
/// cannot be composed at all.
pub fn assemble_record(record: SourceRecord, generated_at: DateTime<Utc>) -> Result<Region> {
    let kind = record.scope.kind();
    if record.local_code.trim().is_empty() {
        return Err(AppError::Internal(format!(
            "{} '{}' in scope {:?} has an empty local code",
            kind, record.name, record.scope
        )));
    }

    let scope = &record.scope;
    let parents = derive_parent_codes(kind, scope.province(), scope.regency(), scope.district());
    let parent_full_code = kind.parent().and_then(|parent| parents.full_code_at(parent));
    let full_code = compose_full_code(parent_full_code, &record.local_code);

    Ok(Region {
        kind,
        local_code: record.local_code,
        full_code,
        name: record.name,
        parents,
        created_at: generated_at,
        updated_at: generated_at,
    })
}

/// Lazy canonical stream. Stops after the first composition error.
pub struct AssembledRegions {
    reader: SourceReader,
    generated_at: DateTime<Utc>,
    pending: std::array::IntoIter<RegionKind, 4>,
    current: Option<SourceRecords>,
    summary: SourceSummary,
    failed: bool,
}

impl AssembledRegions {
    /// Source accounting of the levels finished so far
    pub fn summary(&self) -> &SourceSummary {
        &self.summary
    }

    /// Source accounting including any level still in progress
    pub fn into_summary(mut self) -> SourceSummary {
        if let Some(records) = self.current.take() {
            self.absorb(records);
        }
        self.summary
    }

    fn absorb(&mut self, records: SourceRecords) {
        let kind = records.kind();
        let level = records.into_summary();
        tracing::info!(
            "Assembled {} {} records from {} units ({} skipped)",
            level.records,
            kind,
            level.units_read,
            level.skipped_count()
        );
        self.summary.units_read += level.units_read;
        self.summary.records += level.records;
        self.summary.skipped.extend(level.skipped);
    }
}

impl Iterator for AssembledRegions {
    type Item = Result<Region>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some(records) = self.current.as_mut() {
                if let Some(record) = records.next() {
                    let assembled = assemble_record(record, self.generated_at);
                    self.failed = assembled.is_err();
                    return Some(assembled);
                }
                if let Some(finished) = self.current.take() {
                    self.absorb(finished);
                }
            }

            let kind = self.pending.next()?;
            self.current = Some(self.reader.read(kind));
        }
    }
}
