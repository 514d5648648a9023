use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::kind::RegionKind;

lazy_static! {
    static ref PROVINCE_UNIT: Regex = Regex::new(r"^provinsi\.json$").unwrap();
    static ref REGENCY_UNIT: Regex = Regex::new(r"^kab-(\d+)\.json$").unwrap();
    static ref DISTRICT_UNIT: Regex = Regex::new(r"^kec-(\d+)-(\d+)\.json$").unwrap();
    static ref VILLAGE_UNIT: Regex = Regex::new(r"^keldesa-(\d+)-(\d+)-(\d+)\.json$").unwrap();
}

/// Which parent(s) a source unit's records belong to. Produced once from the
/// unit's identifying key when it is read; nothing downstream looks at file
/// names again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceScope {
    Provinces,
    Regencies {
        province: String,
    },
    Districts {
        province: String,
        regency: String,
    },
    Villages {
        province: String,
        regency: String,
        district: String,
    },
}

impl SourceScope {
    pub fn kind(&self) -> RegionKind {
        match self {
            SourceScope::Provinces => RegionKind::Province,
            SourceScope::Regencies { .. } => RegionKind::Regency,
            SourceScope::Districts { .. } => RegionKind::District,
            SourceScope::Villages { .. } => RegionKind::Village,
        }
    }

    /// Parses a unit's file name into the scope for `kind`.
    pub fn parse(kind: RegionKind, unit_name: &str) -> Option<SourceScope> {
        match kind {
            RegionKind::Province => PROVINCE_UNIT
                .is_match(unit_name)
                .then_some(SourceScope::Provinces),
            RegionKind::Regency => {
                let caps = REGENCY_UNIT.captures(unit_name)?;
                Some(SourceScope::Regencies {
                    province: caps[1].to_string(),
                })
            }
            RegionKind::District => {
                let caps = DISTRICT_UNIT.captures(unit_name)?;
                Some(SourceScope::Districts {
                    province: caps[1].to_string(),
                    regency: caps[2].to_string(),
                })
            }
            RegionKind::Village => {
                let caps = VILLAGE_UNIT.captures(unit_name)?;
                Some(SourceScope::Villages {
                    province: caps[1].to_string(),
                    regency: caps[2].to_string(),
                    district: caps[3].to_string(),
                })
            }
        }
    }

    pub fn province(&self) -> Option<&str> {
        match self {
            SourceScope::Provinces => None,
            SourceScope::Regencies { province }
            | SourceScope::Districts { province, .. }
            | SourceScope::Villages { province, .. } => Some(province),
        }
    }

    pub fn regency(&self) -> Option<&str> {
        match self {
            SourceScope::Districts { regency, .. } | SourceScope::Villages { regency, .. } => {
                Some(regency)
            }
            _ => None,
        }
    }

    pub fn district(&self) -> Option<&str> {
        match self {
            SourceScope::Villages { district, .. } => Some(district),
            _ => None,
        }
    }
}

/// One leaf entry of a source unit, tagged with the unit's scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub scope: SourceScope,
    pub local_code: String,
    pub name: String,
}

/// `(local code, name)` pairs of one unit, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceEntries(pub Vec<(String, String)>);

impl<'de> Deserialize<'de> for SourceEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = SourceEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping local codes to names")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((code, name)) = map.next_entry::<String, String>()? {
                    entries.push((code, name));
                }
                Ok(SourceEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Why a source unit was skipped. Recorded, never raised past the reader.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum SourceError {
    #[error("source unit unavailable: {unit}: {reason}")]
    Unavailable { unit: String, reason: String },

    #[error("malformed source unit: {unit}: {reason}")]
    Malformed { unit: String, reason: String },
}

/// Accounting for one pass over the source collection
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub units_read: usize,
    pub records: usize,
    pub skipped: Vec<SourceError>,
}

impl SourceSummary {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope_keys() {
        assert_eq!(
            SourceScope::parse(RegionKind::Province, "provinsi.json"),
            Some(SourceScope::Provinces)
        );
        assert_eq!(
            SourceScope::parse(RegionKind::Regency, "kab-11.json"),
            Some(SourceScope::Regencies {
                province: "11".into()
            })
        );
        assert_eq!(
            SourceScope::parse(RegionKind::District, "kec-11-01.json"),
            Some(SourceScope::Districts {
                province: "11".into(),
                regency: "01".into()
            })
        );
        assert_eq!(
            SourceScope::parse(RegionKind::Village, "keldesa-11-01-010.json"),
            Some(SourceScope::Villages {
                province: "11".into(),
                regency: "01".into(),
                district: "010".into()
            })
        );
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        assert_eq!(SourceScope::parse(RegionKind::Regency, "kab-aa.json"), None);
        assert_eq!(SourceScope::parse(RegionKind::Regency, "kec-11-01.json"), None);
        assert_eq!(SourceScope::parse(RegionKind::District, "kec-11.json"), None);
        assert_eq!(
            SourceScope::parse(RegionKind::Village, "keldesa-11-01.json"),
            None
        );
    }

    #[test]
    fn test_entries_keep_file_order() {
        let entries: SourceEntries =
            serde_json::from_str(r#"{"02": "Simeulue", "01": "Aceh Selatan"}"#).unwrap();
        assert_eq!(
            entries.0,
            vec![
                ("02".to_string(), "Simeulue".to_string()),
                ("01".to_string(), "Aceh Selatan".to_string())
            ]
        );
    }

    #[test]
    fn test_entries_reject_non_string_names() {
        assert!(serde_json::from_str::<SourceEntries>(r#"{"01": 5}"#).is_err());
        assert!(serde_json::from_str::<SourceEntries>(r#"["01"]"#).is_err());
    }
}
