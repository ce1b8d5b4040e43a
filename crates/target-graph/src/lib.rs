//! Target dependency graph and execution planning for mkr.
//!
//! This crate builds a directed graph over declared targets using
//! petgraph and derives dependency-ordered execution plans from it.
//!
//! # Key Types
//!
//! - [`TargetGraph`]: the graph structure for building and querying
//!   prerequisite relations
//! - [`ExecutionPlan`]: a memoized, dependency-ordered list of target
//!   ids for a set of requested roots
//! - [`TargetNode`]: trait target types implement to be stored in the
//!   graph
//!
//! # Example
//!
//! ```ignore
//! use mkr_target_graph::{ExecutionPlan, TargetGraph};
//!
//! let mut graph = TargetGraph::new();
//! graph.build_for_roots(&["run"], |name| registry.get(name).cloned())?;
//! let plan = ExecutionPlan::build(&graph, &["run"])?;
//! for id in plan.order() {
//!     // execute in this order
//! }
//! ```

mod error;
mod graph;
mod plan;

pub use error::{Error, Result};
pub use graph::{GraphNode, TargetGraph};
pub use plan::ExecutionPlan;

/// Trait for target data that can be stored in the target graph.
///
/// Implement this for your target type to let it participate in graph
/// construction and plan derivation.
pub trait TargetNode: Clone {
    /// Names of the targets this target requires, in declared order.
    ///
    /// Names that do not correspond to a declared target are treated as
    /// file-path prerequisites by the graph builder.
    fn prerequisite_names(&self) -> impl Iterator<Item = &str>;
}
