//! External tool invocation seam.
//!
//! [`IpsetFirewall`](crate::IpsetFirewall) never spawns processes directly;
//! it goes through a [`ToolRunner`] so tests can script the privileged tool
//! surface without root.

use std::process::Command;

/// Captured result of one tool invocation.
///
/// Success is determined solely by the exit status. A process that could
/// not be spawned at all is reported as a failure with the spawn error as
/// its stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Whether the tool exited successfully.
    pub success: bool,
    /// Captured standard output, trimmed.
    pub stdout: String,
    /// Captured standard error, trimmed.
    pub stderr: String,
}

impl ToolOutput {
    /// A successful invocation with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed invocation with the given stderr.
    #[must_use]
    pub fn err(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// The diagnostic message for audit records: stdout when the call
    /// succeeded, stderr when it failed.
    #[must_use]
    pub fn message(&self) -> &str {
        if self.success {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Runs a privileged external tool and captures its output.
///
/// Invocations are synchronous and carry no timeout; a hung tool call
/// stalls the calling loop. This matches the reference behavior and is a
/// known operational gap.
pub trait ToolRunner: Send + Sync {
    /// Invokes `program` with `args`, capturing stdout/stderr.
    fn run(&self, program: &str, args: &[&str]) -> ToolOutput;
}

/// Runner that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a new system runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> ToolOutput {
        match Command::new(program).args(args).output() {
            Ok(output) => ToolOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            },
            Err(err) => ToolOutput::err(format!("failed to run {program}: {err}")),
        }
    }
}
