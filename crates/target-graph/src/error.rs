//! Error types for graph construction and planning.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for graph and planning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a target graph or deriving an
/// execution plan from it.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum Error {
    /// The prerequisite relation contains a cycle.
    #[error("dependency cycle involving targets: {}", members.join(" -> "))]
    #[diagnostic(
        code(mkr_target_graph::graph::cycle),
        help("break the cycle by removing one of the listed prerequisites")
    )]
    CycleDetected {
        /// The targets on the cycle, in prerequisite order. The last
        /// member's prerequisite list contains the first.
        members: Vec<String>,
    },

    /// A requested root target is not declared.
    #[error("unknown root target '{name}'")]
    #[diagnostic(code(mkr_target_graph::graph::unknown_root))]
    UnknownRoot {
        /// The root id that could not be resolved.
        name: String,
    },
}

impl Error {
    /// Create a cycle error from the cycle's members.
    pub fn cycle(members: Vec<String>) -> Self {
        Self::CycleDetected { members }
    }

    /// Create an unknown-root error.
    pub fn unknown_root(name: impl Into<String>) -> Self {
        Self::UnknownRoot { name: name.into() }
    }
}
