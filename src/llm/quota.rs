//! Cloud quota tracking from response headers.
//!
//! Grounded on `examples/original_source/src/llm/quota.py`: case-insensitive
//! header lookup for rate-limit fields, a running usage percentage, and a
//! one-shot warning at a configurable threshold.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_timestamp: Option<i64>,
    pub usage_percent: f64,
}

impl Default for QuotaInfo {
    fn default() -> Self {
        Self {
            limit: None,
            remaining: None,
            reset_timestamp: None,
            usage_percent: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuotaTracker {
    info: QuotaInfo,
    warning_threshold: f64,
    warned: bool,
}

fn header_lookup<'a>(headers: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    for key in keys {
        for (name, value) in headers {
            if name.to_ascii_lowercase() == *key {
                return Some(value.as_str());
            }
        }
    }
    None
}

impl QuotaTracker {
    pub fn new(warning_threshold: f64) -> Self {
        Self {
            info: QuotaInfo::default(),
            warning_threshold,
            warned: false,
        }
    }

    /// Update from a response's headers. Recognizes both `ratelimit-*` and
    /// `rate-limit-*` spellings, case-insensitively.
    pub fn update_from_headers(&mut self, headers: &HashMap<String, String>) {
        let limit = header_lookup(headers, &["ratelimit-limit", "rate-limit-limit", "x-ratelimit-limit"])
            .and_then(|v| v.parse::<u64>().ok());
        let remaining = header_lookup(
            headers,
            &["ratelimit-remaining", "rate-limit-remaining", "x-ratelimit-remaining"],
        )
        .and_then(|v| v.parse::<u64>().ok());
        let reset = header_lookup(headers, &["ratelimit-reset", "rate-limit-reset", "x-ratelimit-reset"])
            .and_then(|v| v.parse::<i64>().ok());

        if let Some(l) = limit {
            self.info.limit = Some(l);
        }
        if let Some(r) = remaining {
            self.info.remaining = Some(r);
        }
        if let Some(rs) = reset {
            self.info.reset_timestamp = Some(rs);
        }

        if let (Some(limit), Some(remaining)) = (self.info.limit, self.info.remaining) {
            if limit > 0 {
                let used = limit.saturating_sub(remaining) as f64;
                self.info.usage_percent = used / limit as f64;
            }
        }
    }

    /// Returns true the first time usage crosses `warning_threshold`; false
    /// on every subsequent call until `reset()`.
    pub fn check_threshold(&mut self) -> bool {
        if !self.warned && self.info.usage_percent >= self.warning_threshold {
            self.warned = true;
            return true;
        }
        false
    }

    pub fn status(&self) -> QuotaInfo {
        self.info
    }

    pub fn reset(&mut self) {
        self.info = QuotaInfo::default();
        self.warned = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_case_insensitive_headers() {
        let mut tracker = QuotaTracker::new(0.8);
        tracker.update_from_headers(&headers(&[("RateLimit-Limit", "100"), ("ratelimit-remaining", "20")]));
        let status = tracker.status();
        assert_eq!(status.limit, Some(100));
        assert_eq!(status.remaining, Some(20));
        assert!((status.usage_percent - 0.8).abs() < 1e-9);
    }

    #[test]
    fn warns_once_at_threshold() {
        let mut tracker = QuotaTracker::new(0.5);
        tracker.update_from_headers(&headers(&[("ratelimit-limit", "10"), ("ratelimit-remaining", "4")]));
        assert!(tracker.check_threshold());
        assert!(!tracker.check_threshold());
    }

    #[test]
    fn reset_clears_warning_state() {
        let mut tracker = QuotaTracker::new(0.5);
        tracker.update_from_headers(&headers(&[("ratelimit-limit", "10"), ("ratelimit-remaining", "0")]));
        assert!(tracker.check_threshold());
        tracker.reset();
        tracker.update_from_headers(&headers(&[("ratelimit-limit", "10"), ("ratelimit-remaining", "0")]));
        assert!(tracker.check_threshold());
    }
}
