//! Component A: security filter. Everything leaving the repo for LLM
//! summarization passes through `check_excluded` then `sanitize`.

pub mod allowlist;
pub mod audit;
pub mod detectors;
pub mod entropy;
pub mod exclusions;
pub mod sanitizer;

pub use exclusions::{default_patterns, ExclusionList};
pub use sanitizer::sanitize;
