//! # External Command Execution
//!
//! Every external tool this orchestrator drives (git, the template
//! expander, the cluster credential tool, kubectl) is invoked through the
//! `CommandRunner` trait defined here. This is a deliberate seam: the
//! pipeline's correctness depends on issuing an exact, ordered sequence
//! of external commands, and routing them all through one trait lets
//! tests record and script that sequence without touching real tools.
//!
//! In the main application `SystemRunner` is used, which wraps
//! `std::process::Command`. In tests it is replaced with a recording
//! double that captures each invocation and replays scripted outcomes.

use std::process::Command;

use crate::error::Result;

/// The captured outcome of one external command.
///
/// Exit information is kept structurally (`success` plus the raw exit
/// `code`) so callers can distinguish specific exit statuses, such as the
/// benign "exit status 1" that `kubectl delete` reports for an absent
/// resource, without matching on message text.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// The process exit code, if it exited normally.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// An all-clear outcome with empty output, for scripting defaults in
    /// tests.
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Trait for external command execution - allows recording and scripting
/// in tests.
pub trait CommandRunner {
    /// Runs `program` with `args`, blocking until it exits, and captures
    /// its output.
    ///
    /// Returns `Err` only when the process could not be spawned at all;
    /// a non-zero exit is reported through [`CommandOutput`] so callers
    /// decide per command whether it is fatal.
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// The default implementation of `CommandRunner`, which executes real
/// processes on the host.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        log::debug!("exec: {} {}", program, args.join(" "));
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Convenience for call sites assembling argv from mixed `&str` and
/// `String` pieces.
pub fn argv<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter().map(Into::into).collect()
}
