//! # Configuration Repository Management
//!
//! Handles the configuration-as-code repository the generated manifests
//! are published to: cloning it into a scoped temporary checkout,
//! summarizing pending changes for the operator, and — subject to
//! confirmation and run-mode flags — committing and pushing them.
//!
//! The checkout directory is owned by a [`tempfile::TempDir`], so it is
//! removed on every exit path of the orchestrator (success, early
//! abort, error, or panic), not merely as a best-effort step.
//!
//! Cloning uses the system git command, which automatically handles:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Any authentication configured in ~/.gitconfig

use std::path::Path;

use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::exec::{argv, CommandRunner};
use crate::ui::Confirm;

/// Fixed message for the regeneration commit.
const COMMIT_MESSAGE: &str = "Update Gold deployment configs";

/// The branch pushes target.
const DEFAULT_BRANCH: &str = "main";

/// A scoped checkout of the configuration repository.
///
/// Dropping the value deletes the checkout; [`Checkout::close`] does the
/// same but surfaces deletion errors.
#[derive(Debug)]
pub struct Checkout {
    dir: TempDir,
}

impl Checkout {
    /// The checkout's working directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Deletes the checkout, reporting any filesystem error.
    pub fn close(self) -> Result<()> {
        self.dir.close().map_err(Error::from)
    }
}

/// Clones the configuration repository at `url` into a fresh temporary
/// directory.
pub fn checkout(runner: &dyn CommandRunner, url: &str) -> Result<Checkout> {
    let dir = tempfile::Builder::new().prefix("gold-deploy-").tempdir()?;
    log::info!("cloning {} into {}", url, dir.path().display());

    let args = argv([
        "clone".to_string(),
        url.to_string(),
        dir.path().display().to_string(),
    ]);
    let output = runner.run("git", &args).map_err(|e| Error::GitClone {
        url: url.to_string(),
        message: e.to_string(),
        hint: None,
    })?;

    if !output.success {
        let stderr = output.stderr.trim().to_string();
        // Provide a helpful hint for common auth failures
        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "make sure you have access to the configuration repository \
                 (SSH key in ssh-agent, or git credentials configured)"
                    .to_string(),
            )
        } else {
            None
        };
        return Err(Error::GitClone {
            url: url.to_string(),
            message: stderr,
            hint,
        });
    }

    Ok(Checkout { dir })
}

/// Reports pending (uncommitted) changes in the checkout, for operator
/// visibility.
pub fn summarize_changes(runner: &dyn CommandRunner, checkout: &Checkout) -> Result<String> {
    let output = git(runner, checkout, &["status", "--short"])?;
    Ok(output)
}

/// Commits and pushes the regenerated configs, gated on operator
/// confirmation.
///
/// In dry-run or no-commit mode this is a no-op that reports success
/// without contacting the confirmation prompt. With a clean checkout
/// there is nothing to commit and it also succeeds without prompting.
/// Otherwise the pending changes are printed and the operator is asked
/// to confirm; declining is not an error — `Ok(false)` lets the caller
/// abort the remaining pipeline cleanly.
pub fn commit_and_push(
    runner: &dyn CommandRunner,
    checkout: &Checkout,
    dry_run: bool,
    no_commit: bool,
    confirm: &mut dyn Confirm,
) -> Result<bool> {
    if dry_run || no_commit {
        log::info!("skipping commit ({})", if dry_run { "dry-run" } else { "no-commit" });
        return Ok(true);
    }

    let changes = summarize_changes(runner, checkout)?;
    if changes.trim().is_empty() {
        println!("No configuration changes to commit.");
        return Ok(true);
    }

    println!("Pending configuration changes:\n{}", changes);
    if !confirm.confirm("Commit and push?")? {
        return Ok(false);
    }

    git(runner, checkout, &["add", "-A"])?;
    git(runner, checkout, &["commit", "-m", COMMIT_MESSAGE])?;
    git(runner, checkout, &["push", "origin", DEFAULT_BRANCH])?;
    Ok(true)
}

/// Runs one git command inside the checkout, failing loudly on a
/// non-zero exit.
fn git(runner: &dyn CommandRunner, checkout: &Checkout, args: &[&str]) -> Result<String> {
    let mut full = vec!["-C".to_string(), checkout.path().display().to_string()];
    full.extend(args.iter().map(|s| s.to_string()));

    let output = runner.run("git", &full)?;
    if !output.success {
        return Err(Error::GitCommand {
            command: args.join(" "),
            dir: checkout.path().to_path_buf(),
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{ForbiddenRunner, RecordingRunner};
    use crate::exec::CommandOutput;
    use crate::ui::testing::{ForbiddenConfirm, ScriptedConfirm};

    const URL: &str = "https://skia.googlesource.com/k8s-config";

    fn changed_status() -> CommandOutput {
        CommandOutput {
            stdout: " M skia-public/gold-skia-frontend.yaml\n".to_string(),
            ..CommandOutput::ok()
        }
    }

    #[test]
    fn test_checkout_clones_into_temp_dir() {
        let runner = RecordingRunner::new();
        let checkout = checkout(&runner, URL).unwrap();

        let calls = runner.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], "git");
        assert_eq!(calls[0][1], "clone");
        assert_eq!(calls[0][2], URL);
        assert_eq!(calls[0][3], checkout.path().display().to_string());
        assert!(checkout.path().exists());
    }

    #[test]
    fn test_checkout_failure_carries_auth_hint() {
        let runner = RecordingRunner::new();
        runner.push_outcome(CommandOutput {
            success: false,
            code: Some(128),
            stdout: String::new(),
            stderr: "fatal: Authentication failed for repo".to_string(),
        });

        let err = checkout(&runner, URL).unwrap_err();
        let display = err.to_string();
        assert!(display.contains("Git clone error"));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn test_checkout_close_removes_directory() {
        let runner = RecordingRunner::new();
        let checkout = checkout(&runner, URL).unwrap();
        let path = checkout.path().to_path_buf();
        assert!(path.exists());

        checkout.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_summarize_changes_returns_status_output() {
        let runner = RecordingRunner::new();
        let checkout = checkout(&runner, URL).unwrap();
        runner.push_outcome(changed_status());

        let summary = summarize_changes(&runner, &checkout).unwrap();
        assert!(summary.contains("gold-skia-frontend.yaml"));

        let lines = runner.command_lines();
        assert!(lines[1].ends_with("status --short"));
    }

    #[test]
    fn test_commit_and_push_dry_run_is_a_no_op() {
        let runner = RecordingRunner::new();
        let checkout = checkout(&runner, URL).unwrap();
        let before = runner.recorded().len();

        let pushed = commit_and_push(&ForbiddenRunner, &checkout, true, false, &mut ForbiddenConfirm)
            .unwrap();
        assert!(pushed);
        assert_eq!(runner.recorded().len(), before);
    }

    #[test]
    fn test_commit_and_push_no_commit_is_a_no_op() {
        let runner = RecordingRunner::new();
        let checkout = checkout(&runner, URL).unwrap();

        let pushed = commit_and_push(&ForbiddenRunner, &checkout, false, true, &mut ForbiddenConfirm)
            .unwrap();
        assert!(pushed);
    }

    #[test]
    fn test_commit_and_push_clean_checkout_skips_prompt() {
        let runner = RecordingRunner::new();
        let checkout = checkout(&runner, URL).unwrap();
        // Default scripted outcome: empty status.

        let pushed =
            commit_and_push(&runner, &checkout, false, false, &mut ForbiddenConfirm).unwrap();
        assert!(pushed);
        // Only clone + status were issued.
        assert_eq!(runner.recorded().len(), 2);
    }

    #[test]
    fn test_commit_and_push_decline_aborts_cleanly() {
        let runner = RecordingRunner::new();
        let checkout = checkout(&runner, URL).unwrap();
        runner.push_outcome(changed_status());

        let mut confirm = ScriptedConfirm::new([false]);
        let pushed = commit_and_push(&runner, &checkout, false, false, &mut confirm).unwrap();
        assert!(!pushed);
        assert_eq!(confirm.prompts, vec!["Commit and push?"]);
        // No add/commit/push after the decline.
        assert_eq!(runner.recorded().len(), 2);
    }

    #[test]
    fn test_commit_and_push_affirm_stages_commits_pushes() {
        let runner = RecordingRunner::new();
        let checkout = checkout(&runner, URL).unwrap();
        runner.push_outcome(changed_status());

        let mut confirm = ScriptedConfirm::new([true]);
        let pushed = commit_and_push(&runner, &checkout, false, false, &mut confirm).unwrap();
        assert!(pushed);

        let lines = runner.command_lines();
        assert_eq!(lines.len(), 5);
        assert!(lines[2].ends_with("add -A"));
        assert!(lines[3].ends_with(format!("commit -m {}", COMMIT_MESSAGE).as_str()));
        assert!(lines[4].ends_with("push origin main"));
    }

    #[test]
    fn test_git_failure_wraps_command_and_stderr() {
        let runner = RecordingRunner::new();
        let checkout = checkout(&runner, URL).unwrap();
        runner.push_outcome(changed_status());
        runner.push_outcome(CommandOutput::ok()); // add
        runner.push_outcome(CommandOutput::ok()); // commit
        runner.push_outcome(CommandOutput {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: "remote: permission denied".to_string(),
        });

        let mut confirm = ScriptedConfirm::new([true]);
        let err = commit_and_push(&runner, &checkout, false, false, &mut confirm).unwrap_err();
        let display = err.to_string();
        assert!(display.contains("push origin main"));
        assert!(display.contains("permission denied"));
    }
}
