//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 bytes per token. Exactness does not
//! matter for budgeting; the estimate only has to be deterministic and
//! monotonic in text length.

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 bytes of UTF-8. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}
