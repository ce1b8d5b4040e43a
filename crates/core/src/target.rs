//! Target declarations and the registry.
//!
//! A [`Target`] is a named unit of work: prerequisites, a recipe of
//! structured steps, a phony flag, and an optional produced path for
//! staleness comparison. Targets are declared once at load time into a
//! [`TargetRegistry`], which is read-only for the rest of the run.

use crate::prune::PruneRequest;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;

/// A program plus arguments, spawned directly without a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    /// Program to spawn. May contain `${NAME}` references.
    pub program: String,
    /// Arguments, each expanded independently.
    pub args: Vec<String>,
}

impl CommandLine {
    /// Build a command line from a program and its arguments.
    pub fn new<S, I, A>(program: S, args: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// One step of a target's recipe.
///
/// Steps are structured rather than raw text: a direct spawn covers the
/// common case, an opaque shell line covers the rare steps that need
/// shell features, and pruning is a built-in operation rather than a
/// shell command. Variable references in any string field are resolved
/// immediately before invocation, never pre-resolved and cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "spec", rename_all = "snake_case")]
pub enum RecipeStep {
    /// Spawn a program directly; no shell is involved.
    Exec(CommandLine),
    /// Run an opaque line through `sh -c`.
    Shell(String),
    /// Built-in filesystem pruning.
    Prune(PruneRequest),
}

/// A named unit of work with prerequisites and a recipe.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    /// Unique identifier within the registry.
    pub id: String,
    /// Prerequisite ids, in declared order. Each resolves to another
    /// declared target or to a literal filesystem path.
    pub prerequisites: Vec<String>,
    /// Ordered recipe steps.
    pub recipe: Vec<RecipeStep>,
    /// Phony targets have no on-disk artifact and always re-run.
    pub phony: bool,
    /// Path the recipe produces, used for staleness comparison. May
    /// contain `${NAME}` references.
    pub produces: Option<String>,
}

impl Target {
    /// Create a target with the given id and no prerequisites or steps.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prerequisites: Vec::new(),
            recipe: Vec::new(),
            phony: false,
            produces: None,
        }
    }

    /// Mark the target phony (always stale).
    #[must_use]
    pub fn phony(mut self) -> Self {
        self.phony = true;
        self
    }

    /// Add a prerequisite id.
    #[must_use]
    pub fn prerequisite(mut self, id: impl Into<String>) -> Self {
        self.prerequisites.push(id.into());
        self
    }

    /// Declare the path this target's recipe produces.
    #[must_use]
    pub fn produces(mut self, path: impl Into<String>) -> Self {
        self.produces = Some(path.into());
        self
    }

    /// Append a recipe step.
    #[must_use]
    pub fn step(mut self, step: RecipeStep) -> Self {
        self.recipe.push(step);
        self
    }
}

impl mkr_target_graph::TargetNode for Target {
    fn prerequisite_names(&self) -> impl Iterator<Item = &str> {
        self.prerequisites.iter().map(String::as_str)
    }
}

/// The set of declared targets for a run.
///
/// Declaration order is preserved for listing; lookups go through an
/// id index. Nothing is removed or mutated after load.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    index: HashMap<String, usize>,
    targets: Vec<Target>,
}

impl TargetRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTarget`] when the id is already taken.
    pub fn declare(&mut self, target: Target) -> Result<()> {
        if self.index.contains_key(&target.id) {
            return Err(Error::duplicate_target(&target.id));
        }
        self.index.insert(target.id.clone(), self.targets.len());
        self.targets.push(target);
        Ok(())
    }

    /// Look up a declared target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTarget`] when the id is not declared.
    pub fn lookup(&self, id: &str) -> Result<&Target> {
        self.get(id).ok_or_else(|| Error::unknown_target(id))
    }

    /// Look up a target, `None` when absent. Prerequisite resolution
    /// uses this: an undeclared prerequisite is a file path, not an
    /// error.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Target> {
        self.index.get(id).map(|&i| &self.targets[i])
    }

    /// Whether a target id is declared.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate over targets in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    /// Number of declared targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
