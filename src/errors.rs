use thiserror::Error;

/// Failure classes of the pipeline driver. Every variant is fatal for the
/// current run: there are no retries and no partial-pipeline resumption.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad command-line invocation; recoverable only by calling again correctly.
    #[error("{0}")]
    Usage(String),

    /// Input data failed a sanity precondition (b-values, phase encoding,
    /// or an unusable DICOM directory).
    #[error("{0}")]
    Acquisition(String),

    /// A delegated external tool returned a non-zero exit status.
    #[error("`{tool}` exited with status {status}")]
    ExternalTool { tool: String, status: i32 },

    /// The external tool binary could not be started at all.
    #[error("failed to launch `{tool}`: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn usage(msg: impl Into<String>) -> Self {
        PipelineError::Usage(msg.into())
    }

    pub fn acquisition(msg: impl Into<String>) -> Self {
        PipelineError::Acquisition(msg.into())
    }

    /// Process exit status for this failure: a failed tool propagates its
    /// own status, everything else maps to the default failure code 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::ExternalTool { status, .. } if *status > 0 => *status,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
