//
// cli.rs
// Dwi-Prep-rs
//
// Defines the CLI surface with Clap, wires up diagnostics, and hands the run over to the pipeline driver.
//
// Thales Matheus Mendonça Santos - November 2025

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::PipelineConfig;
use crate::driver::PipelineDriver;
use crate::errors::PipelineError;
use crate::runner::SystemRunner;
use crate::scan;

/// Command-line surface of the preprocessing driver.
#[derive(Debug, Parser)]
#[command(name = "dwi-prep")]
#[command(about = "Pré-processamento de difusão (MRtrix3/FSL) em Rust", long_about = None)]
pub struct Cli {
    /// Directory holding the subject's raw DICOM series
    pub dicom_dir: PathBuf,

    /// Directory all pipeline outputs are written into
    pub output_dir: PathBuf,

    /// Pass the overwrite flag through to every tool invocation that takes one
    #[arg(short, long)]
    pub force: bool,

    /// Disable ANSI coloring of diagnostic output
    #[arg(long)]
    pub no_color: bool,
}

pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help requests are a valid termination; anything else is a
            // usage error and exits with the default failure code.
            let failed = err.use_stderr();
            let _ = err.print();
            return if failed {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let color = !cli.no_color && std::io::stderr().is_terminal();
    init_diagnostics(color);

    match execute(cli, color) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            // A failed external tool carries its own exit status forward;
            // everything else is the default failure code.
            let status = err
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(status).unwrap_or(1))
        }
    }
}

fn execute(cli: Cli, color: bool) -> anyhow::Result<()> {
    let config = PipelineConfig::new(&cli.dicom_dir, cli.output_dir, cli.force, color)?;

    info!("input DICOM directory: {:?}", config.dicom_dir);
    let series = scan::inventory(&config.dicom_dir)?;
    info!("found {} DICOM series:", series.len());
    for entry in &series {
        info!(
            "  [{}] {} {} ({} instances)",
            entry.series_number.as_deref().unwrap_or("?"),
            entry.modality.as_deref().unwrap_or("??"),
            entry.description.as_deref().unwrap_or("(sem descrição)"),
            entry.instances
        );
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", config.output_dir))?;
    let runner = SystemRunner::new(&config.output_dir);
    let mut driver = PipelineDriver::new(&config, &runner);
    let outcome = driver.run()?;

    info!(
        "pipeline completed: {} stages, {} deconvolution written to {:?}",
        outcome.stages_completed,
        outcome.tissue_model.label(),
        config.output_dir
    );
    Ok(())
}

fn init_diagnostics(color: bool) {
    // Progress, warnings, and errors all go to the error stream; stdout is
    // left to the external tools.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(false)
        .init();
}
