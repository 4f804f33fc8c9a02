// Presence bitfield decoding
//
// Chapter sheets mark which of four fixed family members appear in a chapter
// with a string of '0'/'1' flags, one per member, in worksheet order. The
// sheet declares the ordering in a "bitfield: A, B, C, D" cell; sheets that
// omit it use the standard family ordering.

use crate::constants::{BITFIELD_SLOTS, DEFAULT_BITFIELD_KEY};
use crate::error::{Result, VaultError};

/// Extract the ordered name list from a "bitfield: A, B, C, D" key cell.
/// Returns None when the cell is not a bitfield key.
pub fn parse_bitfield_key(cell: &str) -> Option<Vec<String>> {
    let lower = cell.to_lowercase();
    let idx = lower.find("bitfield:")?;
    let names: Vec<String> = cell[idx + "bitfield:".len()..]
        .split(',')
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// The standard family member ordering used when a sheet has no key cell.
pub fn default_key() -> Vec<String> {
    DEFAULT_BITFIELD_KEY.iter().map(|s| s.to_string()).collect()
}

/// Decode a bitfield string against a key, returning the names whose flag
/// is '1'. The bitfield must be exactly as long as the key and contain only
/// '0'/'1'. An all-zero bitfield decodes to an empty list.
pub fn decode_bitfield(bitfield: &str, key: &[String]) -> Result<Vec<String>> {
    let bitfield = bitfield.trim();

    if bitfield.len() != key.len() {
        return Err(VaultError::InvalidBitfield(format!(
            "bitfield '{}' has {} flags, key has {} names",
            bitfield,
            bitfield.len(),
            key.len()
        )));
    }

    let mut present = Vec::new();
    for (flag, name) in bitfield.chars().zip(key.iter()) {
        match flag {
            '1' => present.push(name.clone()),
            '0' => {}
            other => {
                return Err(VaultError::InvalidBitfield(format!(
                    "unexpected flag character '{}' in '{}'",
                    other, bitfield
                )));
            }
        }
    }

    Ok(present)
}

/// True when a cell looks like a presence bitfield for the standard key.
pub fn is_bitfield_cell(cell: &str) -> bool {
    let cell = cell.trim();
    cell.len() == BITFIELD_SLOTS && cell.chars().all(|c| c == '0' || c == '1')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bitfield_key() {
        let key = parse_bitfield_key("Bitfield: John, Linda, Jonathan, Matthew").unwrap();
        assert_eq!(key, vec!["John", "Linda", "Jonathan", "Matthew"]);
    }

    #[test]
    fn test_parse_bitfield_key_rejects_other_cells() {
        assert!(parse_bitfield_key("Haywards Present").is_none());
        assert!(parse_bitfield_key("bitfield:").is_none());
    }

    #[test]
    fn test_decode_bitfield() {
        let key = default_key();
        let present = decode_bitfield("0110", &key).unwrap();
        assert_eq!(present, vec![
            "Linda Hayward (nee Thompson)".to_string(),
            "Jonathan Hayward".to_string(),
        ]);
    }

    #[test]
    fn test_decode_all_zero_is_empty_not_error() {
        let present = decode_bitfield("0000", &default_key()).unwrap();
        assert!(present.is_empty());
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        assert!(decode_bitfield("011", &default_key()).is_err());
        assert!(decode_bitfield("01101", &default_key()).is_err());
    }

    #[test]
    fn test_decode_rejects_non_binary() {
        assert!(decode_bitfield("01x0", &default_key()).is_err());
    }

    #[test]
    fn test_is_bitfield_cell() {
        assert!(is_bitfield_cell("0110"));
        assert!(is_bitfield_cell(" 1111 "));
        assert!(!is_bitfield_cell("011"));
        assert!(!is_bitfield_cell("abcd"));
    }
}
