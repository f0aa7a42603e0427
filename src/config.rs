use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, Result};

/// Isotropic voxel size (mm) the corrected series is regridded to.
pub const UPSAMPLED_VOXEL_MM: f64 = 1.3;

/// Fractional intensity threshold handed to the skull-stripping tool.
pub const BET_FRACTIONAL_THRESHOLD: f64 = 0.35;

/// Immutable run configuration, assembled once from the command line and
/// passed into the driver. Nothing here changes after startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Canonicalized directory holding the subject's raw DICOM series.
    pub dicom_dir: PathBuf,
    /// Directory every pipeline output is written into.
    pub output_dir: PathBuf,
    /// Append the overwrite flag to external tool invocations that take one.
    pub force: bool,
    /// Whether diagnostic output carries ANSI color codes.
    pub color: bool,
}

impl PipelineConfig {
    pub fn new(
        dicom_dir: impl AsRef<Path>,
        output_dir: impl Into<PathBuf>,
        force: bool,
        color: bool,
    ) -> Result<Self> {
        let dicom_dir = dicom_dir.as_ref();
        // Canonicalize up front so tool invocations stay valid regardless of
        // which directory they later run from.
        let dicom_dir = dicom_dir.canonicalize().map_err(|err| {
            PipelineError::usage(format!(
                "input DICOM directory {:?} is not accessible: {}",
                dicom_dir, err
            ))
        })?;
        if !dicom_dir.is_dir() {
            return Err(PipelineError::usage(format!(
                "input path {:?} is not a directory",
                dicom_dir
            )));
        }

        Ok(Self {
            dicom_dir,
            output_dir: output_dir.into(),
            force,
            color,
        })
    }
}
