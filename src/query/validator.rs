//! Identifier checks for anything spliced into a statement path.
//!
//! Category keys such as an answer label come from callers; they must be
//! plain identifiers before they become part of `results.<key>`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SEGMENT_PATTERN: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .expect("segment pattern is a valid regex");
}

const MAX_SEGMENT_LEN: usize = 64;

const RESERVED_WORDS: [&str; 14] = [
    "UPDATE", "USE", "KEYS", "SET", "UNSET", "RETURNING", "WHERE", "SELECT", "DELETE", "INSERT",
    "UPSERT", "MERGE", "META", "ARRAY_APPEND",
];

/// Validates a single path segment (a field or category name).
pub fn validate_segment(segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        return Err("Path segment cannot be empty".to_string());
    }

    if segment.len() > MAX_SEGMENT_LEN {
        return Err(format!(
            "Path segment too long (max {} characters)",
            MAX_SEGMENT_LEN
        ));
    }

    if !SEGMENT_PATTERN.is_match(segment) {
        return Err(format!(
            "Path segment '{}' must start with a letter or underscore and contain only letters, numbers, and underscores",
            segment
        ));
    }

    if RESERVED_WORDS
        .iter()
        .any(|&word| segment.eq_ignore_ascii_case(word))
    {
        return Err(format!("Path segment cannot be a reserved word: {}", segment));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_segments() {
        assert!(validate_segment("yes").is_ok());
        assert!(validate_segment("contributions_count").is_ok());
        assert!(validate_segment("_hidden").is_ok());
        assert!(validate_segment("answer2").is_ok());
    }

    #[test]
    fn test_invalid_segments() {
        assert!(validate_segment("").is_err());
        assert!(validate_segment("2yes").is_err());
        assert!(validate_segment("yes no").is_err());
        assert!(validate_segment("yes = []").is_err());
        assert!(validate_segment("yes`").is_err());
        assert!(validate_segment("returning").is_err());
        assert!(validate_segment(&"a".repeat(65)).is_err());
    }
}
