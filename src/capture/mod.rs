//! Components E, F, G: git capture, conversation capture, and the
//! summarize-and-store pipeline that ties both into graph episodes.

pub mod conversation;
pub mod git_capture;
pub mod pipeline;

pub use pipeline::{process_pending_commits, summarize_and_store, EpisodeHandle};
