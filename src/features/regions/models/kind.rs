use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use utoipa::ToSchema;

use crate::shared::validation::is_region_code;

/// Administrative level, top to bottom. Declaration order is hierarchy order
/// and matches the order of the `region_kind` database enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type, ToSchema,
)]
#[sqlx(type_name = "region_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum RegionKind {
    /// Provinsi
    Province,
    /// Kabupaten/Kota
    Regency,
    /// Kecamatan
    District,
    /// Kelurahan/Desa
    Village,
}

impl RegionKind {
    pub const ALL: [RegionKind; 4] = [
        RegionKind::Province,
        RegionKind::Regency,
        RegionKind::District,
        RegionKind::Village,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Province => "province",
            RegionKind::Regency => "regency",
            RegionKind::District => "district",
            RegionKind::Village => "village",
        }
    }

    /// Depth in the hierarchy, provinces at 0
    pub fn depth(&self) -> usize {
        match self {
            RegionKind::Province => 0,
            RegionKind::Regency => 1,
            RegionKind::District => 2,
            RegionKind::Village => 3,
        }
    }

    pub fn parent(&self) -> Option<RegionKind> {
        match self {
            RegionKind::Province => None,
            RegionKind::Regency => Some(RegionKind::Province),
            RegionKind::District => Some(RegionKind::Regency),
            RegionKind::Village => Some(RegionKind::District),
        }
    }

    /// Infers the kind from the structural form of a full code.
    ///
    /// Province codes are 2 digits and regencies 4. District local codes are
    /// 2 or 3 digits in the published data, so districts are 6-7 digits.
    /// Anything from 8 digits up is a village; its width is the district's
    /// plus its own local code and is not bounded.
    pub fn from_code_shape(full_code: &str) -> Option<RegionKind> {
        if !is_region_code(full_code) {
            return None;
        }

        match full_code.len() {
            2 => Some(RegionKind::Province),
            4 => Some(RegionKind::Regency),
            6..=7 => Some(RegionKind::District),
            8.. => Some(RegionKind::Village),
            _ => None,
        }
    }

    /// Name of the source directory holding this kind's units
    pub fn source_dir(&self) -> &'static str {
        match self {
            RegionKind::Province => "provinsi",
            RegionKind::Regency => "kabupaten_kota",
            RegionKind::District => "kecamatan",
            RegionKind::Village => "kelurahan_desa",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for RegionKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for RegionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "province" | "provinsi" => Ok(RegionKind::Province),
            "regency" | "kabupaten_kota" => Ok(RegionKind::Regency),
            "district" | "kecamatan" => Ok(RegionKind::District),
            "village" | "kelurahan_desa" => Ok(RegionKind::Village),
            other => Err(format!(
                "Unknown region kind '{}' (expected province, regency, district or village)",
                other
            )),
        }
    }
}

/// One counter per kind, plus the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KindCounts {
    pub province: u64,
    pub regency: u64,
    pub district: u64,
    pub village: u64,
}

impl KindCounts {
    pub fn get(&self, kind: RegionKind) -> u64 {
        match kind {
            RegionKind::Province => self.province,
            RegionKind::Regency => self.regency,
            RegionKind::District => self.district,
            RegionKind::Village => self.village,
        }
    }

    pub fn add(&mut self, kind: RegionKind, n: u64) {
        match kind {
            RegionKind::Province => self.province += n,
            RegionKind::Regency => self.regency += n,
            RegionKind::District => self.district += n,
            RegionKind::Village => self.village += n,
        }
    }

    pub fn total(&self) -> u64 {
        self.province + self.regency + self.district + self.village
    }
}
