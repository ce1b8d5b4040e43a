//! Error types for mkr-core operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mkr-core operations.
///
/// Every variant is fatal to the current run: nothing is retried and
/// nothing is swallowed. A run either completes its full plan or halts
/// at the first failure.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A requested or referenced target id is not declared.
    #[error("unknown target '{name}'")]
    #[diagnostic(code(mkr_core::target::unknown))]
    UnknownTarget {
        /// The target id that was requested.
        name: String,
    },

    /// A target id was declared more than once.
    #[error("duplicate target '{name}'")]
    #[diagnostic(code(mkr_core::target::duplicate))]
    DuplicateTarget {
        /// The colliding target id.
        name: String,
    },

    /// A recipe step exited with a non-zero status.
    #[error("target '{target}' failed at step {step} with exit status {exit_status}")]
    #[diagnostic(
        code(mkr_core::recipe::failed),
        help("steps are numbered from 0 in declaration order")
    )]
    RecipeFailure {
        /// The target whose recipe failed.
        target: String,
        /// 0-based index of the failing step within the recipe.
        step: usize,
        /// Exit status of the failing command; -1 when the process was
        /// terminated by a signal and left no exit code.
        exit_status: i32,
    },

    /// A prune name pattern could not be compiled.
    #[error("invalid prune pattern '{pattern}': {source}")]
    #[diagnostic(code(mkr_core::prune::pattern))]
    InvalidPattern {
        /// The offending pattern text, after variable expansion.
        pattern: String,
        /// The underlying glob error.
        #[source]
        source: glob::PatternError,
    },

    /// I/O error with path context.
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(mkr_core::io::error))]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable.
        path: Option<Box<std::path::Path>>,
        /// Description of the operation that failed.
        operation: String,
    },
}

impl Error {
    /// Create an unknown-target error.
    pub fn unknown_target(name: impl Into<String>) -> Self {
        Self::UnknownTarget { name: name.into() }
    }

    /// Create a duplicate-target error.
    pub fn duplicate_target(name: impl Into<String>) -> Self {
        Self::DuplicateTarget { name: name.into() }
    }

    /// Create a recipe-failure error for the given target and 0-based
    /// step index.
    pub fn recipe_failure(target: impl Into<String>, step: usize, exit_status: i32) -> Self {
        Self::RecipeFailure {
            target: target.into(),
            step,
            exit_status,
        }
    }

    /// Create an I/O error with context.
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(|p| p.into_boxed_path()),
            operation: operation.into(),
        }
    }
}

/// Result type for mkr-core operations.
pub type Result<T> = std::result::Result<T, Error>;
