//! Shared CLI argument types
//!
//! Reusable argument structs flattened into both agent command lines with
//! `#[command(flatten)]`.

mod common;
mod global;

pub use common::OutputFormat;
pub use global::GlobalArgs;
