// src/error.rs

//! Error types for gathering, pruning and uninstall analysis

use std::time::Duration;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while gathering or analyzing packages
#[derive(Error, Debug)]
pub enum Error {
    /// A source's dependency info accessor could not be created
    #[error("An error occurred while initializing source '{source_url}': {cause}")]
    InitializationFailure {
        source_url: String,
        #[source]
        cause: Box<Error>,
    },

    /// A required source failed or timed out while answering a query
    #[error("Unable to gather dependency information for package '{package_id}' from source '{source_url}'")]
    SourceUnreachable {
        package_id: String,
        source_url: String,
        #[source]
        cause: Box<Error>,
    },

    /// A primary target was not returned by any primary source
    #[error("Package '{target}' is not found in the following primary source(s): '{sources}'. Please verify all your online package sources are available (OR) package id, version are specified correctly.")]
    PrimaryTargetNotFound { target: String, sources: String },

    /// Allowed-version or already-referenced constraints exclude every candidate
    #[error("{0}")]
    ConstraintViolation(String),

    /// Removing a package would orphan installed dependents
    #[error("Unable to uninstall '{}' because '{}' {} on it.", .package, join_dependents(.dependents), dependent_verb(.dependents))]
    DependentBlocksUninstall {
        package: String,
        dependents: Vec<String>,
    },

    /// Gathering produced no candidates at all
    #[error("Unable to gather dependency information for {0}")]
    NothingGathered(String),

    /// The run was cancelled by the caller
    #[error("Operation was cancelled")]
    Cancelled,

    /// A single request exceeded its timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// A gather worker task panicked or was aborted
    #[error("Gather worker failed: {0}")]
    WorkerFailed(String),

    /// Transport failure reported by a dependency info accessor
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Malformed version or version range
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid gather settings
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Whether this error stems from the caller cancelling the run
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

fn join_dependents(dependents: &[String]) -> String {
    dependents.join(", ")
}

fn dependent_verb(dependents: &[String]) -> &'static str {
    if dependents.len() == 1 { "depends" } else { "depend" }
}
