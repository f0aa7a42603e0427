//
// stages.rs
// Dwi-Prep-rs
//
// The fixed stage sequence of the preprocessing recipe and the tool invocation templates behind each stage.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use crate::config::{BET_FRACTIONAL_THRESHOLD, UPSAMPLED_VOXEL_MM};
use crate::models::TissueModel;
use crate::runner::ToolInvocation;

/// Relative names of every intermediate written into the output directory.
/// Each is produced by exactly one stage and never mutated afterwards.
pub mod files {
    pub const B0_PA: &str = "b0_pa.mif";
    pub const DWI_RAW: &str = "dwi_ap.mif";
    pub const B0_AP: &str = "b0_ap.mif";
    pub const B0_PAIR: &str = "b0_pair.mif";
    pub const DWI_DENOISED: &str = "dwi_den.mif";
    pub const DWI_UNRINGED: &str = "dwi_den_unr.mif";
    pub const DWI_PREPROC: &str = "dwi_den_unr_preproc.mif";
    pub const WM_RESPONSE: &str = "wm.txt";
    pub const GM_RESPONSE: &str = "gm.txt";
    pub const CSF_RESPONSE: &str = "csf.txt";
    pub const DWI_UPSAMPLED: &str = "dwi_den_unr_preproc_up.mif";
    pub const B0_UPSAMPLED_NII: &str = "b0_up.nii.gz";
    pub const BET_ROOT: &str = "b0_up_brain";
    pub const BET_MASK_NII: &str = "b0_up_brain_mask.nii.gz";
    pub const BRAIN_MASK: &str = "mask_up.mif";
    pub const TENSOR: &str = "dti.mif";
    pub const FA: &str = "fa.mif";
    pub const ADC: &str = "adc.mif";
    pub const WM_FOD: &str = "wmfod.mif";
    pub const GM_FOD: &str = "gmfod.mif";
    pub const CSF_FOD: &str = "csffod.mif";
}

/// The ordered stages of the pipeline. Strictly linear; the only
/// data-dependent decision is the tissue model inside the final stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ConvertReference,
    ConvertDiffusion,
    AssembleB0Pair,
    Denoise,
    RemoveRinging,
    CorrectDistortions,
    EstimateResponses,
    Upsample,
    ComputeBrainMask,
    FitTensor,
    TensorMetrics,
    Deconvolve,
}

pub const SEQUENCE: [Stage; 12] = [
    Stage::ConvertReference,
    Stage::ConvertDiffusion,
    Stage::AssembleB0Pair,
    Stage::Denoise,
    Stage::RemoveRinging,
    Stage::CorrectDistortions,
    Stage::EstimateResponses,
    Stage::Upsample,
    Stage::ComputeBrainMask,
    Stage::FitTensor,
    Stage::TensorMetrics,
    Stage::Deconvolve,
];

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ConvertReference => "convert b=0 reference series",
            Stage::ConvertDiffusion => "convert diffusion-weighted series",
            Stage::AssembleB0Pair => "assemble opposed-phase b=0 pair",
            Stage::Denoise => "denoise",
            Stage::RemoveRinging => "remove Gibbs ringing",
            Stage::CorrectDistortions => "correct susceptibility and eddy-current distortions",
            Stage::EstimateResponses => "estimate tissue response functions",
            Stage::Upsample => "upsample to isotropic grid",
            Stage::ComputeBrainMask => "compute brain mask",
            Stage::FitTensor => "fit diffusion tensor",
            Stage::TensorMetrics => "compute tensor metrics",
            Stage::Deconvolve => "constrained spherical deconvolution",
        }
    }
}

/// Everything the interpreter needs for one stage: the synchronous tool
/// calls, plus an optional detached viewer opened afterwards for visual QC.
#[derive(Debug, Clone)]
pub struct StagePlan {
    pub invocations: Vec<ToolInvocation>,
    pub viewer: Option<ToolInvocation>,
}

impl StagePlan {
    fn new(invocations: Vec<ToolInvocation>) -> Self {
        Self {
            invocations,
            viewer: None,
        }
    }

    fn with_viewer(mut self, viewer: ToolInvocation) -> Self {
        self.viewer = Some(viewer);
        self
    }
}

fn viewer(args: Vec<String>) -> ToolInvocation {
    ToolInvocation::plain("mrview", args)
}

/// Conversion prompts the operator to pick the matching series when the
/// DICOM directory carries more than one.
pub fn convert_reference(dicom_dir: &Path) -> StagePlan {
    StagePlan::new(vec![ToolInvocation::mrtrix(
        "mrconvert",
        vec![dicom_dir.display().to_string(), files::B0_PA.into()],
    )])
}

pub fn convert_diffusion(dicom_dir: &Path) -> StagePlan {
    StagePlan::new(vec![ToolInvocation::mrtrix(
        "mrconvert",
        vec![dicom_dir.display().to_string(), files::DWI_RAW.into()],
    )])
}

/// The first diffusion volume is its acquisition's b=0; pairing it with the
/// opposed-phase reference gives the field-estimation input.
pub fn assemble_b0_pair() -> StagePlan {
    StagePlan::new(vec![
        ToolInvocation::mrtrix(
            "mrconvert",
            vec![
                files::DWI_RAW.into(),
                "-coord".into(),
                "3".into(),
                "0".into(),
                files::B0_AP.into(),
            ],
        ),
        ToolInvocation::mrtrix(
            "mrcat",
            vec![
                files::B0_AP.into(),
                files::B0_PA.into(),
                "-axis".into(),
                "3".into(),
                files::B0_PAIR.into(),
            ],
        ),
    ])
}

pub fn denoise() -> StagePlan {
    StagePlan::new(vec![ToolInvocation::mrtrix(
        "dwidenoise",
        vec![files::DWI_RAW.into(), files::DWI_DENOISED.into()],
    )])
}

pub fn remove_ringing() -> StagePlan {
    StagePlan::new(vec![ToolInvocation::mrtrix(
        "mrdegibbs",
        vec![files::DWI_DENOISED.into(), files::DWI_UNRINGED.into()],
    )])
    .with_viewer(viewer(vec![files::DWI_UNRINGED.into()]))
}

pub fn correct_distortions() -> StagePlan {
    StagePlan::new(vec![ToolInvocation::mrtrix(
        "dwifslpreproc",
        vec![
            files::DWI_UNRINGED.into(),
            files::DWI_PREPROC.into(),
            "-rpe_pair".into(),
            "-se_epi".into(),
            files::B0_PAIR.into(),
            "-pe_dir".into(),
            "AP".into(),
            "-align_seepi".into(),
        ],
    )])
    .with_viewer(viewer(vec![files::DWI_PREPROC.into()]))
}

/// Responses are estimated on the corrected, native-resolution series.
/// The estimator always writes all three tissue files; the deconvolution
/// stage decides which of them are used.
pub fn estimate_responses() -> StagePlan {
    StagePlan::new(vec![ToolInvocation::mrtrix(
        "dwi2response",
        vec![
            "dhollander".into(),
            files::DWI_PREPROC.into(),
            files::WM_RESPONSE.into(),
            files::GM_RESPONSE.into(),
            files::CSF_RESPONSE.into(),
        ],
    )])
}

pub fn upsample() -> StagePlan {
    StagePlan::new(vec![ToolInvocation::mrtrix(
        "mrgrid",
        vec![
            files::DWI_PREPROC.into(),
            "regrid".into(),
            "-voxel".into(),
            UPSAMPLED_VOXEL_MM.to_string(),
            files::DWI_UPSAMPLED.into(),
        ],
    )])
}

/// Skull stripping runs on the leading b=0 volume exported to NIfTI, since
/// the brain extractor does not read the native format.
pub fn compute_brain_mask() -> StagePlan {
    StagePlan::new(vec![
        ToolInvocation::mrtrix(
            "mrconvert",
            vec![
                files::DWI_UPSAMPLED.into(),
                "-coord".into(),
                "3".into(),
                "0".into(),
                "-axes".into(),
                "0,1,2".into(),
                files::B0_UPSAMPLED_NII.into(),
            ],
        ),
        ToolInvocation::plain(
            "bet2",
            vec![
                files::B0_UPSAMPLED_NII.into(),
                files::BET_ROOT.into(),
                "-m".into(),
                "-f".into(),
                BET_FRACTIONAL_THRESHOLD.to_string(),
            ],
        ),
        ToolInvocation::mrtrix(
            "mrconvert",
            vec![files::BET_MASK_NII.into(), files::BRAIN_MASK.into()],
        ),
    ])
    .with_viewer(viewer(vec![
        files::DWI_UPSAMPLED.into(),
        "-overlay.load".into(),
        files::BRAIN_MASK.into(),
    ]))
}

pub fn fit_tensor() -> StagePlan {
    StagePlan::new(vec![ToolInvocation::mrtrix(
        "dwi2tensor",
        vec![
            "-mask".into(),
            files::BRAIN_MASK.into(),
            files::DWI_UPSAMPLED.into(),
            files::TENSOR.into(),
        ],
    )])
}

pub fn tensor_metrics() -> StagePlan {
    StagePlan::new(vec![ToolInvocation::mrtrix(
        "tensor2metric",
        vec![
            "-fa".into(),
            files::FA.into(),
            "-adc".into(),
            files::ADC.into(),
            "-mask".into(),
            files::BRAIN_MASK.into(),
            files::TENSOR.into(),
        ],
    )])
    .with_viewer(viewer(vec![files::FA.into()]))
}

/// The only data-dependent stage: three-tissue deconvolution when the
/// acquisition carries more than two shells, two-tissue otherwise.
pub fn deconvolve(model: TissueModel) -> StagePlan {
    let mut args: Vec<String> = vec![
        "msmt_csd".into(),
        files::DWI_UPSAMPLED.into(),
        files::WM_RESPONSE.into(),
        files::WM_FOD.into(),
    ];
    if model == TissueModel::ThreeTissue {
        args.push(files::GM_RESPONSE.into());
        args.push(files::GM_FOD.into());
    }
    args.push(files::CSF_RESPONSE.into());
    args.push(files::CSF_FOD.into());
    args.push("-mask".into());
    args.push(files::BRAIN_MASK.into());

    StagePlan::new(vec![ToolInvocation::mrtrix("dwi2fod", args)]).with_viewer(viewer(vec![
        files::FA.into(),
        "-odf.load_sh".into(),
        files::WM_FOD.into(),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn sequence_is_twelve_stages_with_one_terminal_branch() {
        assert_eq!(SEQUENCE.len(), 12);
        assert_eq!(SEQUENCE[0], Stage::ConvertReference);
        assert_eq!(SEQUENCE[11], Stage::Deconvolve);
    }

    #[test]
    fn conversion_targets_the_dicom_directory() {
        let dir = PathBuf::from("/data/subject01/dicom");
        let plan = convert_reference(&dir);
        assert_eq!(plan.invocations.len(), 1);
        assert_eq!(plan.invocations[0].tool, "mrconvert");
        assert!(plan.invocations[0]
            .args
            .contains(&"/data/subject01/dicom".to_string()));
    }

    #[test]
    fn upsample_uses_the_fixed_voxel_size() {
        let plan = upsample();
        assert!(plan.invocations[0].args.contains(&"1.3".to_string()));
    }

    #[test]
    fn mask_stage_uses_the_fixed_bet_threshold() {
        let plan = compute_brain_mask();
        let bet = &plan.invocations[1];
        assert_eq!(bet.tool, "bet2");
        assert!(!bet.honors_force);
        assert!(bet.args.contains(&"0.35".to_string()));
        // Mask goes back into the native format for the downstream stages.
        assert_eq!(plan.invocations[2].tool, "mrconvert");
    }

    #[test]
    fn two_tissue_deconvolution_skips_the_gm_compartment() {
        let plan = deconvolve(TissueModel::TwoTissue);
        let args = &plan.invocations[0].args;
        assert!(args.contains(&files::WM_FOD.to_string()));
        assert!(args.contains(&files::CSF_FOD.to_string()));
        assert!(!args.contains(&files::GM_FOD.to_string()));
    }

    #[test]
    fn three_tissue_deconvolution_orders_responses_wm_gm_csf() {
        let plan = deconvolve(TissueModel::ThreeTissue);
        let args = &plan.invocations[0].args;
        let wm = args.iter().position(|a| a == files::WM_RESPONSE).expect("wm");
        let gm = args.iter().position(|a| a == files::GM_RESPONSE).expect("gm");
        let csf = args.iter().position(|a| a == files::CSF_RESPONSE).expect("csf");
        assert!(wm < gm && gm < csf);
    }
}
