//! Knowledge graph core for coding projects: git + AI-conversation capture,
//! LLM summarization, job queue, indexer, hooks, and MCP dispatch.
//!
//! This crate is a library plus a thin CLI binary (`src/main.rs`); the `cli`
//! module itself lives only in the binary target, the same split
//! `pustynsky-search-index` uses for its `search` crate.

pub mod capture;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod indexer;
pub mod jobqueue;
pub mod llm;
pub mod mcp;
pub mod mdm;
pub mod models;
pub mod scope;
pub mod security;
