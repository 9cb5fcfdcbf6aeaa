//! Component D: graph adapter — the narrow LLM/embed facade the graph
//! engine consumes, plus the episode store backing the CLI's CRUD surface.

pub mod adapter;
pub mod store;

pub use adapter::{chat, create, create_batch};
pub use store::{Episode, GraphStore};
