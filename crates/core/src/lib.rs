//! Core engine for mkr: declarative targets, staleness evaluation, and
//! sequential recipe execution.
//!
//! The pieces compose in one direction. A [`vars::VarStore`] holds the
//! project's variables with environment overrides applied at definition
//! time. A [`target::TargetRegistry`] holds the declared targets. The
//! [`staleness::StalenessEvaluator`] decides which targets need work by
//! comparing output and prerequisite mtimes, and the
//! [`executor::PlanRunner`] walks a dependency-ordered plan, expanding
//! and spawning each stale target's recipe steps in order. Plan
//! construction itself lives in the `mkr-target-graph` crate.

pub mod error;
pub mod executor;
pub mod prune;
pub mod staleness;
pub mod target;
pub mod vars;

pub use error::{Error, Result};
pub use executor::{PlanRunner, RunReport, RunnerConfig};
pub use prune::{PruneMode, PruneRequest, prune};
pub use staleness::StalenessEvaluator;
pub use target::{CommandLine, RecipeStep, Target, TargetRegistry};
pub use vars::{EnvSnapshot, VarStore};
