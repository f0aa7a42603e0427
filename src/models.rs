//
// models.rs
// Dwi-Prep-rs
//
// Defines serializable data structures for the series inventory, shell tables, and run outcomes.
//
// Thales Matheus Mendonça Santos - November 2025

use serde::{Deserialize, Serialize};

/// One DICOM series discovered in the input directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub series_uid: String,
    pub series_number: Option<String>,
    pub modality: Option<String>,
    pub description: Option<String>,
    pub instances: usize,
}

/// Distinct b-values reported for an acquisition, with per-shell volume counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellTable {
    pub bvalues: Vec<f64>,
    pub sizes: Vec<u64>,
}

impl ShellTable {
    pub fn distinct_shells(&self) -> usize {
        self.bvalues.len()
    }

    pub fn lowest(&self) -> Option<f64> {
        self.bvalues.iter().copied().reduce(f64::min)
    }
}

/// Deconvolution model selected from the number of distinct shells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TissueModel {
    TwoTissue,
    ThreeTissue,
}

impl TissueModel {
    /// More than two distinct shells supports a third tissue compartment.
    pub fn for_shell_count(count: usize) -> Self {
        if count > 2 {
            TissueModel::ThreeTissue
        } else {
            TissueModel::TwoTissue
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TissueModel::TwoTissue => "WM/CSF",
            TissueModel::ThreeTissue => "WM/GM/CSF",
        }
    }
}

/// Phase-encoding axis codes expected of the two input series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEncoding {
    PosteriorAnterior,
    AnteriorPosterior,
}

impl PhaseEncoding {
    /// Header code as recorded by the converter ("j" runs P>>A, "j-" A>>P).
    pub fn code(&self) -> &'static str {
        match self {
            PhaseEncoding::PosteriorAnterior => "j",
            PhaseEncoding::AnteriorPosterior => "j-",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PhaseEncoding::PosteriorAnterior => "PA",
            PhaseEncoding::AnteriorPosterior => "AP",
        }
    }
}

/// Scalar facts extracted from the converted diffusion series, used only
/// for branch and abort decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionInfo {
    pub shells: ShellTable,
    pub volumes: usize,
    pub tissue_model: TissueModel,
}

/// Summary handed back once every stage has run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub stages_completed: usize,
    pub tissue_model: TissueModel,
}
