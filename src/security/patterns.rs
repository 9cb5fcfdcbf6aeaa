//! Detector name -> (DetectionType, Confidence) table.
//!
//! Grounded on `examples/original_source/src/security/patterns.py`: the
//! original maps `detect-secrets` plugin names to a local enum and a fixed
//! confidence. This crate has no `detect-secrets`-style plugin dependency
//! (no example repo imports one), so the table instead maps this crate's
//! own detector identifiers to the same `(DetectionType, Confidence)` pairs,
//! keeping detection table-driven rather than an if/else chain.

use crate::models::{Confidence, DetectionType};

pub fn lookup(detector_name: &str) -> (DetectionType, Confidence) {
    match detector_name {
        "aws_access_key" => (DetectionType::AwsKey, Confidence::High),
        "github_token" => (DetectionType::GithubToken, Confidence::High),
        "jwt" => (DetectionType::Jwt, Confidence::High),
        "private_key" => (DetectionType::PrivateKey, Confidence::High),
        "connection_string" => (DetectionType::ConnectionString, Confidence::High),
        "base64_high_entropy" => (DetectionType::HighEntropy, Confidence::Medium),
        "hex_high_entropy" => (DetectionType::HighEntropy, Confidence::Medium),
        "keyword_secret" => (DetectionType::ApiKey, Confidence::Medium),
        _ => (DetectionType::ApiKey, Confidence::Medium),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_detectors_are_high_confidence() {
        for name in ["aws_access_key", "github_token", "jwt", "private_key"] {
            let (_, confidence) = lookup(name);
            assert_eq!(confidence, Confidence::High, "{name} should be high confidence");
        }
    }

    #[test]
    fn entropy_and_keyword_detectors_are_medium_confidence() {
        for name in ["base64_high_entropy", "hex_high_entropy", "keyword_secret"] {
            let (_, confidence) = lookup(name);
            assert_eq!(confidence, Confidence::Medium, "{name} should be medium confidence");
        }
    }
}
