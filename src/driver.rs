//
// driver.rs
// Dwi-Prep-rs
//
// Linear interpreter over the fixed stage sequence, with the inter-stage sanity checks that gate it.
//
// Thales Matheus Mendonça Santos - November 2025

use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use crate::metadata;
use crate::models::{AcquisitionInfo, PhaseEncoding, PipelineOutcome, TissueModel};
use crate::runner::{ToolInvocation, ToolRunner};
use crate::stages::{self, files, Stage, StagePlan};
use crate::validate;

/// Sequences the external tool calls and enforces the pre/post-condition
/// checks between them. The first failure anywhere aborts the remainder;
/// partial outputs are left on disk for inspection.
pub struct PipelineDriver<'a> {
    config: &'a PipelineConfig,
    runner: &'a dyn ToolRunner,
    acquisition: Option<AcquisitionInfo>,
}

impl<'a> PipelineDriver<'a> {
    pub fn new(config: &'a PipelineConfig, runner: &'a dyn ToolRunner) -> Self {
        Self {
            config,
            runner,
            acquisition: None,
        }
    }

    /// Run all stages in order. Terminal states: every stage completed, or
    /// the error of the first stage/check that failed.
    pub fn run(&mut self) -> Result<PipelineOutcome> {
        let total = stages::SEQUENCE.len();
        for (index, stage) in stages::SEQUENCE.iter().enumerate() {
            info!("[{}/{}] {}", index + 1, total, stage.name());
            self.execute(*stage)?;
        }

        let model = self.tissue_model()?;
        Ok(PipelineOutcome {
            stages_completed: total,
            tissue_model: model,
        })
    }

    fn execute(&mut self, stage: Stage) -> Result<()> {
        let plan = self.plan_for(stage)?;

        for mut invocation in plan.invocations {
            if self.config.force {
                invocation.apply_force();
            }
            self.run_checked(invocation)?;
        }

        // Sanity checks run right after the artifact they inspect exists,
        // so bad input aborts before any expensive downstream stage.
        match stage {
            Stage::ConvertReference => self.validate_reference()?,
            Stage::ConvertDiffusion => self.validate_diffusion()?,
            _ => {}
        }

        if let Some(viewer) = plan.viewer {
            self.runner.spawn_detached(&viewer);
        }

        Ok(())
    }

    fn plan_for(&self, stage: Stage) -> Result<StagePlan> {
        Ok(match stage {
            Stage::ConvertReference => stages::convert_reference(&self.config.dicom_dir),
            Stage::ConvertDiffusion => stages::convert_diffusion(&self.config.dicom_dir),
            Stage::AssembleB0Pair => stages::assemble_b0_pair(),
            Stage::Denoise => stages::denoise(),
            Stage::RemoveRinging => stages::remove_ringing(),
            Stage::CorrectDistortions => stages::correct_distortions(),
            Stage::EstimateResponses => stages::estimate_responses(),
            Stage::Upsample => stages::upsample(),
            Stage::ComputeBrainMask => stages::compute_brain_mask(),
            Stage::FitTensor => stages::fit_tensor(),
            Stage::TensorMetrics => stages::tensor_metrics(),
            Stage::Deconvolve => stages::deconvolve(self.tissue_model()?),
        })
    }

    fn run_checked(&self, invocation: ToolInvocation) -> Result<()> {
        let output = self.runner.run(&invocation)?;
        if !output.success() {
            let tail = stderr_tail(&output.stderr);
            if !tail.is_empty() {
                error!("{}: {}", invocation.tool, tail);
            }
            return Err(PipelineError::ExternalTool {
                tool: invocation.tool,
                status: output.status,
            });
        }
        Ok(())
    }

    fn validate_reference(&self) -> Result<()> {
        let shells = metadata::shell_table(self.runner, files::B0_PA)?;
        validate::require_low_b0(files::B0_PA, &shells)?;
        let pe = metadata::phase_encoding(self.runner, files::B0_PA)?;
        validate::check_phase_encoding(
            files::B0_PA,
            pe.as_deref(),
            PhaseEncoding::PosteriorAnterior,
        )?;
        Ok(())
    }

    fn validate_diffusion(&mut self) -> Result<()> {
        let shells = metadata::shell_table(self.runner, files::DWI_RAW)?;
        validate::require_low_b0(files::DWI_RAW, &shells)?;
        validate::require_multi_shell(files::DWI_RAW, &shells)?;
        let pe = metadata::phase_encoding(self.runner, files::DWI_RAW)?;
        validate::check_phase_encoding(
            files::DWI_RAW,
            pe.as_deref(),
            PhaseEncoding::AnteriorPosterior,
        )?;

        let volumes = metadata::volume_count(self.runner, files::DWI_RAW)?;
        let tissue_model = TissueModel::for_shell_count(shells.distinct_shells());
        info!(
            "diffusion acquisition: {} volumes over shells {:?}, {} deconvolution selected",
            volumes,
            shells.bvalues,
            tissue_model.label()
        );

        self.acquisition = Some(AcquisitionInfo {
            shells,
            volumes,
            tissue_model,
        });
        Ok(())
    }

    fn tissue_model(&self) -> Result<TissueModel> {
        self.acquisition
            .as_ref()
            .map(|a| a.tissue_model)
            .ok_or_else(|| {
                PipelineError::acquisition(
                    "diffusion acquisition was never validated, cannot pick a tissue model",
                )
            })
    }
}

fn stderr_tail(stderr: &str) -> String {
    // External tools can be chatty; keep the last few lines for diagnosis.
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(4);
    lines[start..].join(" | ")
}
