//! Recursive filesystem pruning with a protected subtree.
//!
//! Cleanup targets invoke this in-process instead of shelling out to a
//! find-and-delete pipeline. The walk matches directory and file names
//! against glob patterns top-down; one subtree is hard-excluded so that
//! a provisioned environment directory can never be destroyed by a
//! routine cache cleanup, even when something beneath it matches a
//! pattern.

use crate::{Error, Result};
use glob::Pattern;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether a prune pass touches the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneMode {
    /// Collect matching paths without modifying anything.
    Report,
    /// Remove matching entries (directories with their contents).
    Delete,
}

/// A pruning operation as declared inside a recipe.
///
/// The string fields may contain `${NAME}` references; the executor
/// expands them and resolves relative paths against the run's working
/// directory before calling [`prune`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneRequest {
    /// Directories to walk.
    pub roots: Vec<String>,
    /// Subtree that is never entered, reported, or deleted.
    pub protected: String,
    /// Glob patterns matched against entry file names.
    pub patterns: Vec<String>,
    /// Report or delete.
    pub mode: PruneMode,
}

/// Walk `roots` recursively and report or delete every entry whose file
/// name matches one of `patterns`, returning the paths acted upon in a
/// deterministic (sorted) order.
///
/// The `protected` subtree is skipped wholesale: it is not descended
/// into and nothing at or beneath it is reported or deleted, regardless
/// of pattern matches. A matched directory that contains the protected
/// subtree is never removed whole either; the walk descends into it and
/// prunes around the shield. A directory selected for removal is recorded
/// once; its children are not independently visited. Running the same
/// delete request twice yields an empty result the second time.
pub fn prune(
    roots: &[PathBuf],
    protected: &Path,
    patterns: &[Pattern],
    mode: PruneMode,
) -> Result<Vec<PathBuf>> {
    // Canonicalize once; if the protected path does not exist there is
    // nothing to shield.
    let protected = fs::canonicalize(protected).ok();
    let mut acted = Vec::new();

    for root in roots {
        if !root.is_dir() || is_protected(root, protected.as_deref()) {
            continue;
        }
        walk(root, protected.as_deref(), patterns, mode, &mut acted)?;
    }

    Ok(acted)
}

fn walk(
    dir: &Path,
    protected: Option<&Path>,
    patterns: &[Pattern],
    mode: PruneMode,
    acted: &mut Vec<PathBuf>,
) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(e, Some(dir.into()), "read_dir"))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(e, Some(dir.into()), "read_dir_entry"))?;
        paths.push(entry.path());
    }
    paths.sort();

    for path in paths {
        if is_protected(&path, protected) {
            debug!(path = %path.display(), "skipping protected subtree");
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_type = fs::symlink_metadata(&path)
            .map_err(|e| Error::io(e, Some(path.clone()), "symlink_metadata"))?
            .file_type();

        if patterns.iter().any(|p| p.matches(&name)) {
            if file_type.is_dir() && shields_protected(&path, protected) {
                debug!(path = %path.display(), "matched directory contains protected subtree, descending");
                walk(&path, protected, patterns, mode, acted)?;
                continue;
            }
            if mode == PruneMode::Delete {
                remove(&path, file_type.is_dir())?;
                debug!(path = %path.display(), "removed");
            }
            acted.push(path);
            // Top-down selection: children of a matched directory are
            // not independently visited.
            continue;
        }

        if file_type.is_dir() {
            walk(&path, protected, patterns, mode, acted)?;
        }
    }

    Ok(())
}

fn is_protected(path: &Path, protected: Option<&Path>) -> bool {
    match protected {
        Some(protected) => fs::canonicalize(path).is_ok_and(|p| p == protected),
        None => false,
    }
}

/// Whether the protected subtree lies strictly beneath `path`.
/// Removing such a directory whole would take the shield with it.
fn shields_protected(path: &Path, protected: Option<&Path>) -> bool {
    match protected {
        Some(protected) => {
            fs::canonicalize(path).is_ok_and(|p| protected.starts_with(&p) && protected != p)
        }
        None => false,
    }
}

fn remove(path: &Path, is_dir: bool) -> Result<()> {
    if is_dir {
        fs::remove_dir_all(path).map_err(|e| Error::io(e, Some(path.into()), "remove_dir_all"))
    } else {
        fs::remove_file(path).map_err(|e| Error::io(e, Some(path.into()), "remove_file"))
    }
}
