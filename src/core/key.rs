//! Cache key normalization
//!
//! Turns provider requests into canonical cache keys of the form
//! `{prefix}:{64-hex-sha256}`. Equal requests (after normalization) always
//! map to the same key; requests differing in any field map to different
//! keys with overwhelming probability. Pure functions, no I/O.

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// Joins request fields before normalization. A control character cannot
/// appear in prompt text that survives normalization, so no two distinct
/// field tuples can collide pre-hash.
const FIELD_SEPARATOR: char = '\u{1F}';

/// Normalize free text for keying: NFKC, lowercase, trim, collapse
/// whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    let mut out = String::with_capacity(folded.len());
    let mut pending_space = false;
    for c in folded.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

/// Build a cache key from a provider-type prefix and the request fields.
///
/// Empty and whitespace-only field sets are valid inputs and produce a
/// stable key.
pub fn request_key(prefix: &str, fields: &[String]) -> String {
    let mut joined = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            joined.push(FIELD_SEPARATOR);
        }
        joined.push_str(&normalize(field));
    }

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    format!("{}:{}", prefix, hex::encode(hasher.finalize()))
}
