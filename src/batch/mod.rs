// src/batch/mod.rs
// =============================================================================
// This module drives a whole run.
//
// Submodules:
// - pipeline: resolve -> fetch -> normalize for ONE repository
// - driver: chunking and concurrent execution over MANY repositories
// =============================================================================

mod driver;
mod pipeline;

pub use driver::{run_batch, BatchReport};
pub use pipeline::{RepoOutcome, RunContext};
