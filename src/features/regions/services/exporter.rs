use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, Result};
use crate::features::regions::models::{KindCounts, ParentCodes, Region, RegionKind};
use crate::modules::store::{Page, RegionFilter, RegionSort, RegionStore};
use crate::shared::constants::COMBINED_EXPORT_STEM;

/// Regions fetched per page when exporting from the store
const STORE_PAGE_SIZE: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Header row plus one RFC 4180 record per region
    Csv,
    /// One JSON object per line
    Jsonl,
    /// A JSON array, one row object per line
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The single row schema shared by every kind and every format. Absent
/// optional values are empty strings, so rows are structurally uniform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub kind: String,
    pub local_code: String,
    pub full_code: String,
    pub name: String,
    pub province_code: String,
    pub regency_local_code: String,
    pub district_local_code: String,
    pub regency_full_code: String,
    pub district_full_code: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ExportRow {
    pub const HEADER: [&'static str; 11] = [
        "kind",
        "localCode",
        "fullCode",
        "name",
        "provinceCode",
        "regencyLocalCode",
        "districtLocalCode",
        "regencyFullCode",
        "districtFullCode",
        "createdAt",
        "updatedAt",
    ];
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl From<&Region> for ExportRow {
    fn from(region: &Region) -> Self {
        let parents = &region.parents;
        Self {
            kind: region.kind.to_string(),
            local_code: region.local_code.clone(),
            full_code: region.full_code.clone(),
            name: region.name.clone(),
            province_code: parents.province_code.clone().unwrap_or_default(),
            regency_local_code: parents.regency_local_code.clone().unwrap_or_default(),
            district_local_code: parents.district_local_code.clone().unwrap_or_default(),
            regency_full_code: parents.regency_full_code.clone().unwrap_or_default(),
            district_full_code: parents.district_full_code.clone().unwrap_or_default(),
            created_at: timestamp(&region.created_at),
            updated_at: timestamp(&region.updated_at),
        }
    }
}

impl TryFrom<ExportRow> for Region {
    type Error = AppError;

    fn try_from(row: ExportRow) -> Result<Self> {
        let kind = row.kind.parse::<RegionKind>().map_err(AppError::Validation)?;
        let parse_time = |value: &str| {
            DateTime::parse_from_rfc3339(value)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|e| AppError::Validation(format!("invalid timestamp '{}': {}", value, e)))
        };

        Ok(Region {
            kind,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
            parents: ParentCodes {
                province_code: optional(&row.province_code),
                regency_local_code: optional(&row.regency_local_code),
                district_local_code: optional(&row.district_local_code),
                regency_full_code: optional(&row.regency_full_code),
                district_full_code: optional(&row.district_full_code),
            },
            local_code: row.local_code,
            full_code: row.full_code,
            name: row.name,
        })
    }
}

/// Which artifacts one export run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// One file per kind, `<kind>.<ext>`
    pub per_kind: bool,
    /// One file with every kind, `wilayah_combined.<ext>`
    pub combined: bool,
}

impl ExportOptions {
    pub fn all(format: ExportFormat) -> Self {
        Self {
            format,
            per_kind: true,
            combined: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    pub path: PathBuf,
    /// `None` for the combined artifact
    pub kind: Option<RegionKind>,
    pub rows: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub format: ExportFormat,
    pub rows_by_kind: KindCounts,
    pub rows: u64,
    pub artifacts: Vec<ExportArtifact>,
    pub duration_ms: u64,
}

enum Sink {
    Csv(csv::Writer<BufWriter<File>>),
    Jsonl(BufWriter<File>),
    Json { out: BufWriter<File>, first: bool },
}

impl Sink {
    fn create(path: &Path, format: ExportFormat) -> Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        let sink = match format {
            ExportFormat::Csv => {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(out);
                writer.write_record(ExportRow::HEADER)?;
                Sink::Csv(writer)
            }
            ExportFormat::Jsonl => Sink::Jsonl(out),
            ExportFormat::Json => {
                out.write_all(b"[")?;
                Sink::Json { out, first: true }
            }
        };
        Ok(sink)
    }

    fn write(&mut self, row: &ExportRow) -> Result<()> {
        match self {
            Sink::Csv(writer) => writer.serialize(row)?,
            Sink::Jsonl(out) => {
                serde_json::to_writer(&mut *out, row)?;
                out.write_all(b"\n")?;
            }
            Sink::Json { out, first } => {
                let separator: &[u8] = if *first { b"\n" } else { b",\n" };
                *first = false;
                out.write_all(separator)?;
                serde_json::to_writer(&mut *out, row)?;
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        match self {
            Sink::Csv(mut writer) => writer.flush()?,
            Sink::Jsonl(mut out) => out.flush()?,
            Sink::Json { mut out, .. } => {
                out.write_all(b"\n]\n")?;
                out.flush()?;
            }
        }
        Ok(())
    }
}

struct Artifact {
    path: PathBuf,
    kind: Option<RegionKind>,
    rows: u64,
    sink: Sink,
}

impl Artifact {
    fn open(dir: &Path, stem: &str, kind: Option<RegionKind>, format: ExportFormat) -> Result<Self> {
        let path = dir.join(format!("{}.{}", stem, format.extension()));
        Ok(Self {
            sink: Sink::create(&path, format)?,
            path,
            kind,
            rows: 0,
        })
    }

    fn write(&mut self, row: &ExportRow) -> Result<()> {
        self.sink.write(row)?;
        self.rows += 1;
        Ok(())
    }

    fn finish(self) -> Result<ExportArtifact> {
        self.sink.finish()?;
        Ok(ExportArtifact {
            path: self.path,
            kind: self.kind,
            rows: self.rows,
        })
    }
}

/// Writes region streams to interchange files under one output directory
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every requested artifact in one pass over `stream`. Rows keep
    /// stream order.
    pub fn export<I>(&self, stream: I, options: &ExportOptions) -> Result<ExportReport>
    where
        I: IntoIterator<Item = Result<Region>>,
    {
        if !options.per_kind && !options.combined {
            return Err(AppError::Validation(
                "export needs per-kind or combined artifacts".to_string(),
            ));
        }

        let started = Instant::now();
        fs::create_dir_all(&self.output_dir)?;

        let mut per_kind = BTreeMap::new();
        if options.per_kind {
            for kind in RegionKind::ALL {
                let artifact =
                    Artifact::open(&self.output_dir, kind.as_str(), Some(kind), options.format)?;
                per_kind.insert(kind, artifact);
            }
        }
        let mut combined = if options.combined {
            Some(Artifact::open(
                &self.output_dir,
                COMBINED_EXPORT_STEM,
                None,
                options.format,
            )?)
        } else {
            None
        };

        let mut rows_by_kind = KindCounts::default();
        for region in stream {
            let region = region?;
            let row = ExportRow::from(&region);
            if let Some(artifact) = per_kind.get_mut(&region.kind) {
                artifact.write(&row)?;
            }
            if let Some(artifact) = combined.as_mut() {
                artifact.write(&row)?;
            }
            rows_by_kind.add(region.kind, 1);
        }

        let mut artifacts = Vec::with_capacity(per_kind.len() + 1);
        for artifact in per_kind.into_values() {
            artifacts.push(artifact.finish()?);
        }
        if let Some(artifact) = combined {
            artifacts.push(artifact.finish()?);
        }

        let report = ExportReport {
            format: options.format,
            rows: rows_by_kind.total(),
            rows_by_kind,
            artifacts,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Exported {} regions as {} to {} ({} artifacts)",
            report.rows,
            report.format,
            self.output_dir.display(),
            report.artifacts.len()
        );

        Ok(report)
    }

    /// Exports the stored generation, level by level in full-code order
    pub async fn export_store(
        &self,
        store: &dyn RegionStore,
        options: &ExportOptions,
    ) -> Result<ExportReport> {
        let mut regions = Vec::new();
        for kind in RegionKind::ALL {
            let mut offset = 0;
            loop {
                let page = store
                    .find(
                        &RegionFilter::kind(kind),
                        RegionSort::Code,
                        Page::new(STORE_PAGE_SIZE, offset),
                    )
                    .await?;
                let fetched = page.len() as i64;
                regions.extend(page.into_iter().map(|stored| stored.region));
                if fetched < STORE_PAGE_SIZE {
                    break;
                }
                offset += STORE_PAGE_SIZE;
            }
        }

        self.export(regions.into_iter().map(Ok), options)
    }
}

/// Parses a line-delimited export back into regions. Blank lines are
/// ignored; any other unreadable line fails the import with its line number.
pub fn import_jsonl(path: &Path) -> Result<Vec<Region>> {
    let reader = BufReader::new(File::open(path)?);
    let mut regions = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: ExportRow = serde_json::from_str(&line).map_err(|e| {
            AppError::Validation(format!("{}:{}: {}", path.display(), index + 1, e))
        })?;
        let region = Region::try_from(row).map_err(|e| {
            AppError::Validation(format!("{}:{}: {}", path.display(), index + 1, e))
        })?;
        regions.push(region);
    }

    tracing::info!("Imported {} regions from {}", regions.len(), path.display());
    Ok(regions)
}
