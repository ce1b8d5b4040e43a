//! Execution plan derivation.
//!
//! A plan is the dependency-ordered list of target ids to bring up to
//! date for a set of requested roots. Derivation is a memoized
//! depth-first post-order walk: every reachable target appears exactly
//! once, strictly after all of its declared-target prerequisites, and
//! prerequisites are visited in declaration order so the result is
//! deterministic. A back edge during the walk is a cycle, reported with
//! the ids that form it.

use crate::graph::TargetGraph;
use crate::{Error, Result, TargetNode};
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Dependency-ordered list of target ids to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    order: Vec<String>,
}

impl ExecutionPlan {
    /// Derive the plan for the given roots over a built graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRoot`] if a root has no node in the
    /// graph, and [`Error::CycleDetected`] naming the cycle's members
    /// if the prerequisite relation loops.
    pub fn build<T: TargetNode>(
        graph: &TargetGraph<T>,
        roots: &[impl AsRef<str>],
    ) -> Result<Self> {
        let mut states: HashMap<String, VisitState> = HashMap::new();
        let mut chain: Vec<String> = Vec::new();
        let mut order: Vec<String> = Vec::new();

        for root in roots {
            let root = root.as_ref();
            if !graph.contains(root) {
                return Err(Error::unknown_root(root));
            }
            visit(graph, root, &mut states, &mut chain, &mut order)?;
        }

        trace!(targets = order.len(), "derived execution plan");
        Ok(Self { order })
    }

    /// The plan's target ids in execution order.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Consume the plan, yielding the ordered ids.
    #[must_use]
    pub fn into_order(self) -> Vec<String> {
        self.order
    }

    /// Number of targets in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the plan is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn visit<T: TargetNode>(
    graph: &TargetGraph<T>,
    name: &str,
    states: &mut HashMap<String, VisitState>,
    chain: &mut Vec<String>,
    order: &mut Vec<String>,
) -> Result<()> {
    match states.get(name) {
        Some(VisitState::Done) => return Ok(()),
        Some(VisitState::InProgress) => {
            // Back edge: everything on the chain from the first
            // occurrence of `name` onward forms the cycle.
            let start = chain.iter().position(|n| n == name).unwrap_or(0);
            return Err(Error::cycle(chain[start..].to_vec()));
        }
        None => {}
    }

    states.insert(name.to_string(), VisitState::InProgress);
    chain.push(name.to_string());

    if let Some(node) = graph.get_node_by_name(name) {
        let prerequisites: Vec<String> =
            node.target.prerequisite_names().map(String::from).collect();
        for prerequisite in prerequisites {
            // Undeclared prerequisites are file-path leaves with no
            // node; they never appear in the plan.
            if graph.contains(&prerequisite) {
                visit(graph, &prerequisite, states, chain, order)?;
            }
        }
    }

    chain.pop();
    states.insert(name.to_string(), VisitState::Done);
    order.push(name.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Clone, Debug)]
    struct TestTarget {
        prerequisites: Vec<String>,
    }

    impl TestTarget {
        fn new(prereqs: &[&str]) -> Self {
            Self {
                prerequisites: prereqs.iter().map(|s| (*s).to_string()).collect(),
            }
        }
    }

    impl TargetNode for TestTarget {
        fn prerequisite_names(&self) -> impl Iterator<Item = &str> {
            self.prerequisites.iter().map(String::as_str)
        }
    }

    fn build_graph(entries: &[(&str, &[&str])], roots: &[&str]) -> TargetGraph<TestTarget> {
        let targets: HashMap<String, TestTarget> = entries
            .iter()
            .map(|(name, prereqs)| ((*name).to_string(), TestTarget::new(prereqs)))
            .collect();
        let mut graph = TargetGraph::new();
        graph
            .build_for_roots(roots, |name| targets.get(name).cloned())
            .unwrap();
        graph
    }

    fn position(plan: &ExecutionPlan, name: &str) -> usize {
        plan.order()
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("'{name}' missing from plan {:?}", plan.order()))
    }

    #[test]
    fn test_chain_is_prerequisite_first() {
        let graph = build_graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"])], &["c"]);
        let plan = ExecutionPlan::build(&graph, &["c"]).unwrap();
        assert_eq!(plan.order(), ["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_visits_shared_prerequisite_once() {
        let graph = build_graph(
            &[
                ("base", &[]),
                ("left", &["base"]),
                ("right", &["base"]),
                ("top", &["left", "right"]),
            ],
            &["top"],
        );
        let plan = ExecutionPlan::build(&graph, &["top"]).unwrap();

        assert_eq!(plan.len(), 4);
        assert_eq!(
            plan.order().iter().filter(|n| *n == "base").count(),
            1,
            "shared prerequisite must be planned once"
        );
        assert!(position(&plan, "base") < position(&plan, "left"));
        assert!(position(&plan, "base") < position(&plan, "right"));
        assert!(position(&plan, "left") < position(&plan, "top"));
        assert!(position(&plan, "right") < position(&plan, "top"));
    }

    #[test]
    fn test_prerequisites_planned_in_declaration_order() {
        let graph = build_graph(
            &[("z", &[]), ("a", &[]), ("top", &["z", "a"])],
            &["top"],
        );
        let plan = ExecutionPlan::build(&graph, &["top"]).unwrap();
        assert_eq!(plan.order(), ["z", "a", "top"]);
    }

    #[test]
    fn test_cycle_names_its_members() {
        let graph = build_graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])], &["a"]);
        let err = ExecutionPlan::build(&graph, &["a"]).unwrap_err();

        match err {
            Error::CycleDetected { members } => {
                assert_eq!(members, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_excludes_targets_outside_the_loop() {
        // entry is not on the cycle, only b and c are.
        let graph = build_graph(
            &[("entry", &["b"]), ("b", &["c"]), ("c", &["b"])],
            &["entry"],
        );
        let err = ExecutionPlan::build(&graph, &["entry"]).unwrap_err();

        match err {
            Error::CycleDetected { members } => {
                assert_eq!(members, vec!["b", "c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_cycle() {
        let graph = build_graph(&[("loop", &["loop"])], &["loop"]);
        let err = ExecutionPlan::build(&graph, &["loop"]).unwrap_err();

        match err {
            Error::CycleDetected { members } => assert_eq!(members, vec!["loop"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_leaf_prerequisites_are_not_planned() {
        let graph = build_graph(&[("build", &["src/main.c", "gen"]), ("gen", &[])], &["build"]);
        let plan = ExecutionPlan::build(&graph, &["build"]).unwrap();
        assert_eq!(plan.order(), ["gen", "build"]);
    }

    #[test]
    fn test_multiple_roots_share_memoization() {
        let graph = build_graph(
            &[("base", &[]), ("x", &["base"]), ("y", &["base"])],
            &["x", "y"],
        );
        let plan = ExecutionPlan::build(&graph, &["x", "y"]).unwrap();
        assert_eq!(plan.order(), ["base", "x", "y"]);
    }

    #[test]
    fn test_unknown_root_is_rejected() {
        let graph = build_graph(&[("a", &[])], &["a"]);
        let err = ExecutionPlan::build(&graph, &["missing"]).unwrap_err();
        assert!(matches!(err, Error::UnknownRoot { name } if name == "missing"));
    }
}
