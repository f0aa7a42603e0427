//
// main.rs
// Dwi-Prep-rs
//
// Binary entry point that hands control to the CLI layer and surfaces its exit status.
//
// Thales Matheus Mendonça Santos - November 2025

use std::process::ExitCode;

use dwi_prep::cli;

fn main() -> ExitCode {
    // All argument handling, diagnostics, and sequencing live in the CLI module.
    cli::run()
}
