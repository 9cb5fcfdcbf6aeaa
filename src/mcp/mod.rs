//! Component L: MCP dispatch — wraps CLI operations as JSON-RPC tools and
//! exposes a context resource with non-blocking staleness-triggered
//! re-indexing, grounded on `pustynsky-search-index`'s `mcp/` module (the
//! one example repo in the pack that already implements an MCP server).

pub mod handlers;
pub mod install;
pub mod process;
pub mod protocol;
pub mod server;

pub use server::run_server;
