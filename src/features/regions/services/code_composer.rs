//! Derivation of composite region codes. Pure functions, no I/O.
//!
//! A full code is the parent's full code followed by the region's local code,
//! so `11` → `1101` → `110101` → `1101012001`. Codes are treated as opaque
//! strings beyond that prefix rule.

use crate::features::regions::models::{ParentCodes, RegionKind};

/// Full code of a region given its parent's full code (if any) and its own
/// local code. Callers guarantee `local_code` is non-empty.
pub fn compose_full_code(parent_full_code: Option<&str>, local_code: &str) -> String {
    match parent_full_code {
        Some(parent) => format!("{}{}", parent, local_code),
        None => local_code.to_string(),
    }
}

/// Every ancestor code a region of `kind` carries for denormalised filtering.
///
/// Slots deeper than `kind`'s parent stay empty even when the caller passes
/// them, so a regency never claims a district.
pub fn derive_parent_codes(
    kind: RegionKind,
    province_code: Option<&str>,
    regency_local: Option<&str>,
    district_local: Option<&str>,
) -> ParentCodes {
    let depth = kind.depth();
    let province_code = province_code.filter(|_| depth >= 1);
    let regency_local = regency_local.filter(|_| depth >= 2);
    let district_local = district_local.filter(|_| depth >= 3);

    let regency_full_code = regency_local.map(|local| compose_full_code(province_code, local));
    let district_full_code =
        district_local.map(|local| compose_full_code(regency_full_code.as_deref(), local));

    ParentCodes {
        province_code: province_code.map(str::to_string),
        regency_local_code: regency_local.map(str::to_string),
        district_local_code: district_local.map(str::to_string),
        regency_full_code,
        district_full_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_province_full_code_is_local_code() {
        assert_eq!(compose_full_code(None, "11"), "11");
    }

    #[test]
    fn test_child_full_code_appends_local_code() {
        assert_eq!(compose_full_code(Some("11"), "01"), "1101");
        assert_eq!(compose_full_code(Some("1101"), "01"), "110101");
    }

    #[test]
    fn test_regency_parent_codes() {
        let parents = derive_parent_codes(RegionKind::Regency, Some("11"), None, None);
        assert_eq!(parents.province_code.as_deref(), Some("11"));
        assert_eq!(parents.regency_full_code, None);
        assert_eq!(parents.district_full_code, None);
    }

    #[test]
    fn test_village_parent_codes() {
        let parents =
            derive_parent_codes(RegionKind::Village, Some("11"), Some("01"), Some("010"));
        assert_eq!(parents.province_code.as_deref(), Some("11"));
        assert_eq!(parents.regency_local_code.as_deref(), Some("01"));
        assert_eq!(parents.district_local_code.as_deref(), Some("010"));
        assert_eq!(parents.regency_full_code.as_deref(), Some("1101"));
        assert_eq!(parents.district_full_code.as_deref(), Some("1101010"));
    }

    #[test]
    fn test_slots_below_parent_level_are_dropped() {
        let parents =
            derive_parent_codes(RegionKind::Regency, Some("11"), Some("01"), Some("01"));
        assert_eq!(parents.regency_local_code, None);
        assert_eq!(parents.district_local_code, None);

        let province = derive_parent_codes(RegionKind::Province, Some("11"), None, None);
        assert_eq!(province, ParentCodes::default());
    }
}
