//! mkr library: CLI surface, tracing setup, built-in project targets,
//! and run orchestration over `mkr-core` and `mkr-target-graph`.

pub mod cli;
pub mod project;
pub mod run;
pub mod tracing;

pub use cli::{Cli, EXIT_CONFIG, EXIT_OK};
pub use run::{RunError, execute, exit_code_for};
