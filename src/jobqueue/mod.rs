//! Component H: job queue + background worker.

pub mod storage;
pub mod worker;

pub use storage::JobStore;
pub use worker::{dispatch_job, run_batch, StopSignal};
