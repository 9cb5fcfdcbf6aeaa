//! Binary entry point. All CLI logic lives in the `cli` module, which is
//! declared only here (not in `lib.rs`), the same split
//! `pustynsky-search-index` uses between its `search` library and its
//! `search` binary's own `cli` tree.

mod cli;

fn main() {
    cli::run();
}
