//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `gold-deploy` tool. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! Every variant carries enough context (the external command, the unit's
//! canonical name, the relevant path or cluster) to reproduce the failing
//! step by hand. The tool performs no automatic retries: transient
//! infrastructure failures are surfaced to the operator, who re-runs it.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for gold-deploy operations
#[derive(Error, Debug)]
pub enum Error {
    /// Cloning the configuration repository failed.
    ///
    /// Includes the repository URL, the underlying error message, and an
    /// optional hint for resolution.
    #[error("Git clone error for {url}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// A git command run inside the configuration checkout failed.
    #[error("Git command failed in {}: git {command} - {stderr}", dir.display())]
    GitCommand {
        command: String,
        dir: PathBuf,
        stderr: String,
    },

    /// The external template expander failed while regenerating a unit's
    /// deployment config.
    #[error("Config regeneration failed for {unit} ({}): {message}", output.display())]
    Regeneration {
        unit: String,
        output: PathBuf,
        message: String,
    },

    /// A unit declares that it needs a ConfigMap, but its deployment
    /// options name neither a source file nor a template. This signals a
    /// bug in the catalog definition, not an environmental problem.
    #[error("Invalid ConfigMap settings for {unit}: {message}")]
    ConfigMapSettings { unit: String, message: String },

    /// Fetching credentials for a cluster failed. The previously active
    /// cluster context is left unchanged.
    #[error("Failed to switch to cluster {cluster}: {stderr}")]
    ClusterSwitch { cluster: String, stderr: String },

    /// A kubectl command failed for reasons other than the benign
    /// "resource already absent" outcome.
    #[error("Cluster command failed for {context}: kubectl {command} - {stderr}")]
    ClusterCommand {
        command: String,
        context: String,
        stderr: String,
    },

    /// A line of pod-listing output did not match the expected
    /// "app timestamp" projection.
    #[error("Unparseable pod listing line from {cluster}: {line:?}: {message}")]
    PodListing {
        cluster: String,
        line: String,
        message: String,
    },

    /// A unit selector did not parse as `<instance>:<service>`.
    #[error("Invalid unit selector {selector:?} (expected <instance>:<service>)")]
    InvalidSelector { selector: String },

    /// A selector named an instance that is not in the catalog.
    #[error("Unknown instance: {name}")]
    UnknownInstance { name: String },

    /// A selector named a service that is not in the catalog.
    #[error("Unknown service: {name}")]
    UnknownService { name: String },

    /// A selector named a known instance/service pair that the catalog
    /// does not actually deploy (e.g. ingestion for a public-view
    /// instance).
    #[error("Unit {name} is not part of the deployed catalog")]
    UnknownUnit { name: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
