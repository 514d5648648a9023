use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::features::regions::models::{
    RegionKind, SourceEntries, SourceError, SourceRecord, SourceScope, SourceSummary,
};

/// Units between progress log lines
const PROGRESS_EVERY_UNITS: usize = 1000;

/// Reads the per-level source collection:
///
/// ```text
/// <root>/provinsi/provinsi.json
/// <root>/kabupaten_kota/kab-{province}.json
/// <root>/kecamatan/kec-{province}-{regency}.json
/// <root>/kelurahan_desa/keldesa-{province}-{regency}-{district}.json
/// ```
///
/// Each unit is a JSON object of `local code → name`. A unit that cannot be
/// opened or parsed is skipped and recorded; reading never fails as a whole.
#[derive(Debug, Clone)]
pub struct SourceReader {
    root: PathBuf,
}

impl SourceReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazy pass over every unit of `kind`. Each call re-opens the source.
    pub fn read(&self, kind: RegionKind) -> SourceRecords {
        SourceRecords::new(kind, self.root.join(kind.source_dir()))
    }

    pub fn read_provinces(&self) -> SourceRecords {
        self.read(RegionKind::Province)
    }

    pub fn read_regencies(&self) -> SourceRecords {
        self.read(RegionKind::Regency)
    }

    pub fn read_districts(&self) -> SourceRecords {
        self.read(RegionKind::District)
    }

    pub fn read_villages(&self) -> SourceRecords {
        self.read(RegionKind::Village)
    }
}

/// Iterator over the records of one level. Units are visited in file-name
/// order and opened only when the previous unit is exhausted.
pub struct SourceRecords {
    kind: RegionKind,
    dir: PathBuf,
    units: Option<std::vec::IntoIter<PathBuf>>,
    current: std::vec::IntoIter<SourceRecord>,
    summary: SourceSummary,
}

impl SourceRecords {
    fn new(kind: RegionKind, dir: PathBuf) -> Self {
        Self {
            kind,
            dir,
            units: None,
            current: Vec::new().into_iter(),
            summary: SourceSummary::default(),
        }
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Accounting so far; complete once the iterator is exhausted
    pub fn summary(&self) -> &SourceSummary {
        &self.summary
    }

    pub fn into_summary(self) -> SourceSummary {
        self.summary
    }

    fn skip(&mut self, error: SourceError) {
        tracing::warn!("Skipping {} source unit: {}", self.kind, error);
        self.summary.skipped.push(error);
    }

    fn list_units(&mut self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.skip(SourceError::Unavailable {
                    unit: self.dir.display().to_string(),
                    reason: e.to_string(),
                });
                return Vec::new();
            }
        };

        let mut units: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        units.sort();

        tracing::info!(
            "Found {} {} source units in {}",
            units.len(),
            self.kind,
            self.dir.display()
        );
        units
    }

    fn open_unit(&self, path: &Path) -> Result<Vec<SourceRecord>, SourceError> {
        let unit = path.display().to_string();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SourceError::Malformed {
                unit: unit.clone(),
                reason: "file name is not valid UTF-8".to_string(),
            })?;

        let scope =
            SourceScope::parse(self.kind, file_name).ok_or_else(|| SourceError::Malformed {
                unit: unit.clone(),
                reason: format!("unrecognised {} scope key", self.kind),
            })?;

        let file = File::open(path).map_err(|e| SourceError::Unavailable {
            unit: unit.clone(),
            reason: e.to_string(),
        })?;

        let entries: SourceEntries =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                if e.is_io() {
                    SourceError::Unavailable {
                        unit: unit.clone(),
                        reason: e.to_string(),
                    }
                } else {
                    SourceError::Malformed {
                        unit: unit.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        Ok(entries
            .0
            .into_iter()
            .map(|(local_code, name)| SourceRecord {
                scope: scope.clone(),
                local_code,
                name,
            })
            .collect())
    }
}

impl Iterator for SourceRecords {
    type Item = SourceRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.current.next() {
                self.summary.records += 1;
                return Some(record);
            }

            if self.units.is_none() {
                let listed = self.list_units();
                self.units = Some(listed.into_iter());
            }

            let path = self.units.as_mut()?.next()?;
            match self.open_unit(&path) {
                Ok(records) => {
                    self.summary.units_read += 1;
                    if self.summary.units_read % PROGRESS_EVERY_UNITS == 0 {
                        tracing::info!(
                            "Read {} {} source units ({} records)",
                            self.summary.units_read,
                            self.kind,
                            self.summary.records
                        );
                    }
                    self.current = records.into_iter();
                }
                Err(error) => self.skip(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{aceh_fixture, write_unit};

    #[test]
    fn test_reads_provinces_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        aceh_fixture(dir.path());

        let reader = SourceReader::new(dir.path());
        let provinces: Vec<_> = reader
            .read_provinces()
            .map(|r| (r.local_code, r.name))
            .collect();
        assert_eq!(
            provinces,
            vec![
                ("11".to_string(), "Aceh".to_string()),
                ("12".to_string(), "Sumatera Utara".to_string())
            ]
        );
    }

    #[test]
    fn test_scope_comes_from_unit_key() {
        let dir = tempfile::tempdir().unwrap();
        aceh_fixture(dir.path());

        let reader = SourceReader::new(dir.path());
        let villages: Vec<_> = reader.read_villages().collect();
        assert_eq!(villages.len(), 4);
        assert_eq!(
            villages[0].scope,
            SourceScope::Villages {
                province: "11".into(),
                regency: "01".into(),
                district: "01".into()
            }
        );
        assert_eq!(villages[3].scope.regency(), Some("02"));
    }

    #[test]
    fn test_bad_units_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_unit(dir.path(), "kabupaten_kota", "kab-11.json", r#"{"01": "A"}"#);
        write_unit(dir.path(), "kabupaten_kota", "kab-x1.json", r#"{"01": "B"}"#);
        write_unit(dir.path(), "kabupaten_kota", "kab-12.json", "not json");
        write_unit(dir.path(), "kabupaten_kota", "kab-13.json", r#"{"01": "C"}"#);
        write_unit(dir.path(), "kabupaten_kota", "README.md", "ignored");

        let mut records = SourceReader::new(dir.path()).read_regencies();
        let names: Vec<_> = records.by_ref().map(|r| r.name).collect();
        assert_eq!(names, vec!["A", "C"]);

        let summary = records.into_summary();
        assert_eq!(summary.units_read, 2);
        assert_eq!(summary.records, 2);
        assert_eq!(summary.skipped_count(), 2);
        assert!(summary
            .skipped
            .iter()
            .all(|e| matches!(e, SourceError::Malformed { .. })));
    }

    #[test]
    fn test_missing_level_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = SourceReader::new(dir.path()).read_districts();
        assert!(records.next().is_none());
        assert!(matches!(
            records.summary().skipped[..],
            [SourceError::Unavailable { .. }]
        ));
    }

    #[test]
    fn test_reading_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        aceh_fixture(dir.path());

        let reader = SourceReader::new(dir.path());
        let first: Vec<_> = reader.read_districts().collect();
        let second: Vec<_> = reader.read_districts().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
