//! Component I: git history indexer — replays an entire repository into
//! the graph, distinct from the incremental live-capture path (E/G).

pub mod quality_gate;
pub mod run;

pub use run::{run_index, IndexOutcome};
