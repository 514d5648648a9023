use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Region codes are plain ASCII digit strings
    /// - Valid: "11", "1101", "110101"
    /// - Invalid: "", "11.01", "1a", " 11"
    pub static ref REGION_CODE_REGEX: Regex = Regex::new(r"^[0-9]+$").unwrap();
}

pub fn is_region_code(code: &str) -> bool {
    REGION_CODE_REGEX.is_match(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_code_valid() {
        assert!(is_region_code("11"));
        assert!(is_region_code("1101"));
        assert!(is_region_code("1101012001"));
    }

    #[test]
    fn test_region_code_invalid() {
        assert!(!is_region_code(""));
        assert!(!is_region_code("11.01"));
        assert!(!is_region_code("1a"));
        assert!(!is_region_code(" 11"));
    }
}
