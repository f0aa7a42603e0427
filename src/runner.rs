//
// runner.rs
// Dwi-Prep-rs
//
// Capability seam for invoking external neuroimaging tools, with the production process-based implementation.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::errors::{PipelineError, Result};

/// One external tool call: program name plus its fixed argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: String,
    pub args: Vec<String>,
    /// Whether the tool understands the `-force` overwrite flag.
    pub honors_force: bool,
}

impl ToolInvocation {
    /// An MRtrix command; all of them accept `-force`.
    pub fn mrtrix(tool: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
            honors_force: true,
        }
    }

    /// Any other command (FSL tools, viewers, metadata queries).
    pub fn plain(tool: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
            honors_force: false,
        }
    }

    /// Append the overwrite flag when the tool takes one.
    pub fn apply_force(&mut self) {
        if self.honors_force && !self.args.iter().any(|a| a == "-force") {
            self.args.push("-force".to_string());
        }
    }

    pub fn command_line(&self) -> String {
        let mut line = self.tool.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Exit status and captured streams of a finished tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// External tool invocation seam. The driver only talks to tools through
/// this trait so tests can substitute deterministic fakes.
pub trait ToolRunner {
    /// Run a tool synchronously, blocking until it returns. An `Err` means
    /// the process could not be started; a non-zero status is reported
    /// through the returned [`ToolOutput`].
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;

    /// Launch a tool detached for human review. Never waited on, exit
    /// status never observed.
    fn spawn_detached(&self, invocation: &ToolInvocation);
}

/// Production runner: shells out with the output directory as the working
/// directory so the fixed relative file names land in the right place.
pub struct SystemRunner {
    workdir: PathBuf,
}

impl SystemRunner {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        debug!("running: {}", invocation.command_line());
        let output = Command::new(&invocation.tool)
            .args(&invocation.args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|source| PipelineError::Launch {
                tool: invocation.tool.clone(),
                source,
            })?;

        Ok(ToolOutput {
            // A missing code means the process died on a signal.
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn spawn_detached(&self, invocation: &ToolInvocation) {
        debug!("launching viewer: {}", invocation.command_line());
        let spawned = Command::new(&invocation.tool)
            .args(&invocation.args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(err) = spawned {
            debug!("viewer launch failed, continuing without it: {}", err);
        }
    }
}
