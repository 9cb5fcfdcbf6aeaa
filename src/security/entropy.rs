//! Shannon-entropy scoring for generic high-entropy-string detection.
//!
//! Grounded on the entropy-based detection in the teacher's
//! `crates/git-ai/src/authorship/secrets.rs` (bigram/probability scoring over
//! candidate tokens, `OnceLock`-cached precomputation); this module scores a
//! simpler, spec-mandated Shannon entropy instead of the teacher's binomial
//! probability model, since the spec fixes exact thresholds (base64 ≥ 3.5
//! over ≥ 20 chars, hex ≥ 2.5 over ≥ 20 chars) that a probability model
//! doesn't map onto directly.

/// Shannon entropy in bits/char over the byte distribution of `s`.
pub fn shannon_entropy(s: &[u8]) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts = [0u32; 256];
    for &b in s {
        counts[b as usize] += 1;
    }
    let len = s.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}

pub const MIN_ENTROPY_TOKEN_LEN: usize = 20;
pub const BASE64_ENTROPY_THRESHOLD: f64 = 3.5;
pub const HEX_ENTROPY_THRESHOLD: f64 = 2.5;

fn is_base64ish(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')
}

fn is_hex(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

/// Extract maximal runs of base64-alphabet characters with length
/// ≥ MIN_ENTROPY_TOKEN_LEN whose Shannon entropy clears the base64 threshold.
pub fn find_high_entropy_base64(text: &str) -> Vec<(usize, usize)> {
    find_runs(text, is_base64ish, MIN_ENTROPY_TOKEN_LEN, BASE64_ENTROPY_THRESHOLD)
}

/// Extract maximal runs of hex-alphabet characters with length
/// ≥ MIN_ENTROPY_TOKEN_LEN whose Shannon entropy clears the hex threshold.
/// Runs that are also valid base64-entropy hits are left to the base64
/// detector to avoid double-reporting the same span.
pub fn find_high_entropy_hex(text: &str) -> Vec<(usize, usize)> {
    find_runs(text, is_hex, MIN_ENTROPY_TOKEN_LEN, HEX_ENTROPY_THRESHOLD)
}

fn find_runs(
    text: &str,
    alphabet: fn(u8) -> bool,
    min_len: usize,
    threshold: f64,
) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut hits = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !alphabet(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && alphabet(bytes[i]) {
            i += 1;
        }
        if i - start >= min_len && shannon_entropy(&bytes[start..i]) >= threshold {
            hits.push((start, i));
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_random_string_has_high_entropy() {
        let e = shannon_entropy(b"aB3xQ9zT7mK1pL5vN8wY2rS6uH4dF0g");
        assert!(e >= BASE64_ENTROPY_THRESHOLD, "entropy was {e}");
    }

    #[test]
    fn repeated_string_has_low_entropy() {
        let e = shannon_entropy(b"aaaaaaaaaaaaaaaaaaaaaaaa");
        assert!(e < 1.0);
    }

    #[test]
    fn finds_high_entropy_base64_run_in_text() {
        let text = "token=aB3xQ9zT7mK1pL5vN8wY2rS6uH4dF0g end";
        let hits = find_high_entropy_base64(text);
        assert_eq!(hits.len(), 1);
        let (s, e) = hits[0];
        assert_eq!(&text[s..e], "aB3xQ9zT7mK1pL5vN8wY2rS6uH4dF0g");
    }

    #[test]
    fn short_runs_below_min_length_are_not_flagged() {
        let hits = find_high_entropy_base64("abc def ghi");
        assert!(hits.is_empty());
    }
}
