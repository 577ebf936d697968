//! walkfmt - walk directory trees and emit templated text lines
//!
//! The output format is programmed with a small `%x` token language: the
//! walker fills a table of single-character tokens (paths, names, sizes,
//! counters) as it moves through the tree, and every configured template
//! is resolved against the table's current values.

pub mod cfgfile;
pub mod config;
pub mod diag;
pub mod error;
pub mod output;
pub mod paths;
pub mod template;
pub mod tokens;
pub mod walker;

pub use cfgfile::ConfigBlocks;
pub use config::{ExtFilter, RunConfig};
pub use error::{Error, FsOutcome, classify};
pub use tokens::TokenTable;
pub use walker::Walker;
