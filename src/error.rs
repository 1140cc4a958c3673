//! Engine error types for ripple.
//!
//! Defines [`Error`], the unified error type for the change-selection
//! engine, and [`DiffError`], the differ-layer error. Error messages are
//! designed to be actionable: each variant names what went wrong and the
//! input it relates to.

use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Unified error type for the change-selection engine.
#[derive(Debug)]
pub enum Error {
    /// No differ was available after option application.
    NoDiffer,

    /// No packager was available after option application.
    NoPackager,

    /// The differ failed to produce a change set.
    Diff(DiffError),

    /// The workspace loader reported errors while building the import
    /// graph. Surfaces lazily, when the dependent graph is requested.
    Load {
        /// Aggregate description of the load failures.
        detail: String,
    },

    /// An import path present in the propagated closure could not be
    /// resolved back to a package.
    Resolve {
        /// The import path that was not found in the graph.
        import_path: String,
    },

    /// A changed directory could not be resolved to a package for a
    /// reason other than the soft-ignored conditions.
    Package {
        /// The directory being resolved.
        dir: PathBuf,
        /// The underlying resolution failure.
        detail: String,
    },

    /// The workspace root(s) could not be determined.
    WorkspaceRoot {
        /// Why resolution failed.
        detail: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDiffer => write!(f, "there is no differ set"),
            Self::NoPackager => write!(f, "there is no packager set"),
            Self::Diff(err) => write!(f, "diffing directories for dirty packages: {err}"),
            Self::Load { detail } => {
                write!(f, "errors while generating the import graph: {detail}")
            }
            Self::Resolve { import_path } => write!(f, "{import_path} not found"),
            Self::Package { dir, detail } => {
                write!(
                    f,
                    "pulling package information for \"{}\": {detail}",
                    dir.display()
                )
            }
            Self::WorkspaceRoot { detail } => {
                write!(f, "could not resolve the workspace root: {detail}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Diff(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DiffError> for Error {
    fn from(err: DiffError) -> Self {
        Self::Diff(err)
    }
}

// ---------------------------------------------------------------------------
// DiffError
// ---------------------------------------------------------------------------

/// Errors from a differ.
///
/// `Clone` so the memoized change-set snapshot can hand the same failure
/// to every caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffError {
    /// A version-control command exited non-zero.
    Command {
        /// The command that was run (e.g. `"git diff"`).
        command: String,
        /// Captured stderr, verbatim.
        stderr: String,
        /// The process exit code, when one was available.
        exit_code: Option<i32>,
    },

    /// An I/O failure while producing or post-processing the diff.
    Io {
        /// What was being attempted.
        context: String,
        /// The underlying error text.
        detail: String,
    },
}

impl fmt::Display for DiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command {
                command,
                stderr,
                exit_code,
            } => {
                write!(f, "`{command}` failed")?;
                if let Some(code) = exit_code {
                    write!(f, " (exit code {code})")?;
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            Self::Io { context, detail } => write!(f, "{context}: {detail}"),
        }
    }
}

impl std::error::Error for DiffError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
