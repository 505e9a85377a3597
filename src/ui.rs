//! # Operator Interaction
//!
//! Terminal output configuration and the interactive confirmation seam.
//!
//! The orchestrator stops twice to ask the operator a yes/no question
//! (before doing anything, and before committing the regenerated
//! configs). Confirmation is an injected capability — the [`Confirm`]
//! trait — so the control flow around a declined prompt can be tested
//! without faking process-wide stdin.
//!
//! Output configuration respects the usual conventions:
//! - `--color=never|always|auto` CLI flag
//! - `NO_COLOR` disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` disables colors, `CLICOLOR_FORCE=1` forces them
//! - `TERM=dumb` disables colors

use std::env;
use std::io::{self, BufRead, Write};

use crate::error::Result;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `--color=always` forces colors on (overrides `NO_COLOR`),
    /// `--color=never` forces them off, and `auto` detects from the
    /// environment and terminal.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of NO_COLOR (even if empty) disables colors.
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        // Use console crate's detection for TTY and color support
        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always disabled.
    pub fn plain() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain alternative
/// otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Trait for yes/no operator confirmation - allows scripting in tests.
pub trait Confirm {
    /// Asks the operator `prompt` and returns whether they affirmed.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// The default implementation of `Confirm`: prints the prompt and reads
/// one line from standard input. Only an exact lowercase "y" answer is
/// treated as affirmative; anything else (including EOF) declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        print!("{} (y/N): ", prompt);
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim_end_matches(['\r', '\n']) == "y")
    }
}
