//! Component J: hook installer — marker-delimited shell git hooks plus the
//! AI-assistant Stop-hook settings file.

pub mod claude_settings;
pub mod installer;
pub mod templates;

pub const MANAGED_HOOK_TYPES: &[&str] = &[
    "pre-commit",
    "post-commit",
    "post-merge",
    "post-checkout",
    "post-rewrite",
];
