//! Components B and C: LLM transport with cloud/local failover, and the
//! failed-request queue it hands off to when both endpoints are unusable.

pub mod client;
pub mod config;
pub mod queue;
pub mod quota;

pub use client::{LlmResponse, Transport};
pub use config::LlmConfig;
pub use queue::FailedRequestQueue;
