//! Taxpayer identification number plausibility.
//!
//! Chinese tax IDs are 15 (legacy), 18 (unified social credit code) or 20
//! characters. Only length and character class are checked; no checksum.

use super::patterns::{TAX_ID_CHARS, TAX_ID_SEPARATORS};

/// Why a captured tax ID was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxIdIssue {
    Length(usize),
    Characters,
}

impl std::fmt::Display for TaxIdIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Length(len) => write!(f, "unexpected length {}", len),
            Self::Characters => f.write_str("contains non-alphanumeric characters"),
        }
    }
}

/// Uppercase and strip separators, then check length and characters.
pub fn normalize_tax_id(raw: &str, min_len: usize, max_len: usize) -> Result<String, TaxIdIssue> {
    let cleaned = TAX_ID_SEPARATORS.replace_all(raw.trim(), "").to_uppercase();

    if !TAX_ID_CHARS.is_match(&cleaned) {
        return Err(TaxIdIssue::Characters);
    }

    let len = cleaned.len();
    if len < min_len || len > max_len {
        return Err(TaxIdIssue::Length(len));
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_code_accepted() {
        assert_eq!(
            normalize_tax_id("91330106ma2cf1234x", 15, 20),
            Ok("91330106MA2CF1234X".to_string())
        );
    }

    #[test]
    fn test_separators_removed() {
        assert_eq!(
            normalize_tax_id(" 9133 0106-MA2C F1234X ", 15, 20),
            Ok("91330106MA2CF1234X".to_string())
        );
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(normalize_tax_id("12345", 15, 20), Err(TaxIdIssue::Length(5)));
        assert_eq!(
            normalize_tax_id("123456789012345678901", 15, 20),
            Err(TaxIdIssue::Length(21))
        );
        assert!(normalize_tax_id("123456789012345", 15, 20).is_ok());
    }

    #[test]
    fn test_characters_rejected() {
        assert_eq!(
            normalize_tax_id("91330106MA2CF12/4X", 15, 20),
            Err(TaxIdIssue::Characters)
        );
        assert_eq!(normalize_tax_id("", 15, 20), Err(TaxIdIssue::Characters));
    }
}
