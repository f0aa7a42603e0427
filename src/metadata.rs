use crate::errors::{PipelineError, Result};
use crate::models::ShellTable;
use crate::runner::{ToolInvocation, ToolRunner};

/// Header query front-end shared by every metadata lookup.
pub const QUERY_TOOL: &str = "mrinfo";

fn run_query(runner: &dyn ToolRunner, args: Vec<String>) -> Result<String> {
    let invocation = ToolInvocation::plain(QUERY_TOOL, args);
    let output = runner.run(&invocation)?;
    if !output.success() {
        return Err(PipelineError::ExternalTool {
            tool: QUERY_TOOL.to_string(),
            status: output.status,
        });
    }
    Ok(output.stdout)
}

/// Distinct shell b-values of an image together with per-shell volume counts.
pub fn shell_table(runner: &dyn ToolRunner, image: &str) -> Result<ShellTable> {
    let bvalues = parse_floats(
        image,
        &run_query(runner, vec!["-shell_bvalues".into(), image.into()])?,
    )?;
    let sizes = parse_floats(
        image,
        &run_query(runner, vec!["-shell_sizes".into(), image.into()])?,
    )?
    .into_iter()
    .map(|v| v as u64)
    .collect();

    Ok(ShellTable { bvalues, sizes })
}

/// Phase-encoding direction recorded in the image header, if any. The query
/// tool fails (or prints nothing) when the header never carried one, which
/// is reported as `None` rather than an error.
pub fn phase_encoding(runner: &dyn ToolRunner, image: &str) -> Result<Option<String>> {
    let invocation = ToolInvocation::plain(
        QUERY_TOOL,
        vec![
            "-property".into(),
            "PhaseEncodingDirection".into(),
            image.into(),
        ],
    );
    let output = runner.run(&invocation)?;
    if !output.success() {
        return Ok(None);
    }
    let value = output.stdout.trim().to_string();
    Ok(if value.is_empty() { None } else { Some(value) })
}

/// Number of volumes along the fourth axis; 1 for a plain 3D image.
pub fn volume_count(runner: &dyn ToolRunner, image: &str) -> Result<usize> {
    let stdout = run_query(runner, vec!["-size".into(), image.into()])?;
    let dims = parse_floats(image, &stdout)?;
    Ok(dims.get(3).map(|v| *v as usize).unwrap_or(1))
}

fn parse_floats(image: &str, stdout: &str) -> Result<Vec<f64>> {
    stdout
        .split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| {
                PipelineError::acquisition(format!(
                    "{}: unexpected header query output {:?}",
                    image, stdout
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_lines_parse_into_tables() {
        let values = parse_floats("dwi.mif", " 0 1000 2000 \n").expect("parse");
        assert_eq!(values, vec![0.0, 1000.0, 2000.0]);
    }

    #[test]
    fn garbage_query_output_is_rejected() {
        let err = parse_floats("dwi.mif", "mrinfo: [ERROR] no such image").unwrap_err();
        assert!(matches!(err, PipelineError::Acquisition(_)));
    }

    #[test]
    fn empty_output_yields_an_empty_table() {
        let values = parse_floats("b0.mif", "\n").expect("parse");
        assert!(values.is_empty());
    }
}
