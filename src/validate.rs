use tracing::warn;

use crate::errors::{PipelineError, Result};
use crate::models::{PhaseEncoding, ShellTable};

/// Highest b-value still accepted as a b=0 reference.
pub const B0_TOLERANCE: f64 = 10.0;

/// The lowest shell of the image must sit at (or very near) b=0.
pub fn require_low_b0(name: &str, shells: &ShellTable) -> Result<()> {
    match shells.lowest() {
        Some(b) if b <= B0_TOLERANCE => Ok(()),
        Some(b) => Err(PipelineError::acquisition(format!(
            "{}: lowest b-value is {:.1}, which exceeds the b=0 tolerance of {}",
            name, b, B0_TOLERANCE
        ))),
        None => Err(PipelineError::acquisition(format!(
            "{}: no b-values reported for this image",
            name
        ))),
    }
}

/// A diffusion-weighted acquisition needs at least one non-zero shell on
/// top of the b=0 volumes.
pub fn require_multi_shell(name: &str, shells: &ShellTable) -> Result<()> {
    if shells.distinct_shells() < 2 {
        return Err(PipelineError::acquisition(format!(
            "{}: only {} distinct b-value shell(s) found, at least 2 required",
            name,
            shells.distinct_shells()
        )));
    }
    Ok(())
}

/// Phase-encoding policy: a missing header entry is warn-only, a present
/// mismatch is fatal. This asymmetry matches the original pipeline and is
/// kept as-is.
pub fn check_phase_encoding(
    name: &str,
    found: Option<&str>,
    expected: PhaseEncoding,
) -> Result<()> {
    match found {
        None => {
            warn!(
                "{}: no phase-encoding metadata in the header, cannot confirm the {} acquisition; continuing",
                name,
                expected.label()
            );
            Ok(())
        }
        Some(code) if code == expected.code() => Ok(()),
        Some(code) => Err(PipelineError::acquisition(format!(
            "{}: phase-encoding direction is `{}`, expected `{}` ({}); wrong series selected?",
            name,
            code,
            expected.code(),
            expected.label()
        ))),
    }
}
