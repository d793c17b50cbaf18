//! End-to-end tests for gsheets.
//!
//! Every test runs the real client against `FakeSheets`, an in-memory
//! implementation of the Sheets REST API plugged in through the
//! [`gsheets::Transport`] seam. No network access is needed.

mod client;
mod rows;
mod sheets;

// Re-export common utilities for submodules
pub use common::*;

/// Parse an A1 range in test code
pub fn range(a1: &str) -> gsheets::CellRange {
    gsheets::CellRange::parse(a1).expect("valid A1 range")
}
