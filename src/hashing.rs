//! Content hashing: a 64-bit non-cryptographic hash over newline-normalized
//! file bytes, used both for the workspace manifest and for per-symbol
//! `body_hash` change detection.
//!
//! `xxh3` is used rather than the cryptographic `sha2` a sibling of this
//! engine's reference codebase depends on elsewhere — this hash is purely for
//! change detection, not integrity against an adversary, so the faster
//! non-cryptographic hash is the right tool (see DESIGN.md).

use xxhash_rust::xxh3::xxh3_64;

/// Hashes `bytes` after normalizing CRLF/CR to LF, so a CRLF checkout and an
/// LF checkout of the same logical content hash identically.
pub fn hash_content(bytes: &[u8]) -> u64 {
    if bytes.contains(&b'\r') {
        let normalized = normalize_newlines(bytes);
        xxh3_64(&normalized)
    } else {
        xxh3_64(bytes)
    }
}

fn normalize_newlines(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\r' {
            out.push(b'\n');
            if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                i += 1;
            }
        } else {
            out.push(bytes[i]);
        }
        i += 1;
    }
    out
}

/// Hashes a symbol body's text for `body_hash`.
pub fn hash_body(text: &str) -> u64 {
    hash_content(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_and_lf_hash_identically() {
        let lf = b"line one\nline two\n";
        let crlf = b"line one\r\nline two\r\n";
        assert_eq!(hash_content(lf), hash_content(crlf));
    }

    #[test]
    fn different_content_hashes_differently() {
        assert_ne!(hash_content(b"a"), hash_content(b"b"));
    }

    #[test]
    fn lone_cr_normalizes_too() {
        let cr_only = b"line one\rline two\r";
        let lf = b"line one\nline two\n";
        assert_eq!(hash_content(cr_only), hash_content(lf));
    }
}
