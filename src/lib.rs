//
// lib.rs
// Dwi-Prep-rs
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Public surface of the library: each module mirrors one concern of the
// preprocessing driver.
pub mod cli;
pub mod config;
pub mod driver;
pub mod errors;
pub mod metadata;
pub mod models;
pub mod runner;
pub mod scan;
pub mod stages;
pub mod validate;

pub use cli::{run as run_cli, Cli};
pub use errors::PipelineError;
