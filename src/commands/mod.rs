//! CLI command handlers.
//!
//! This module contains the implementation for each CLI subcommand,
//! delegating to the pipeline core.

mod data;
mod run;
mod scan;

pub use run::run_pipeline;
pub use scan::run_scan;
