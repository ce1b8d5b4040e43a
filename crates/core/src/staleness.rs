//! Staleness determination for targets.
//!
//! Phony targets always re-run. A file-backed target re-runs when its
//! produced path is missing, unreadable, or older than any
//! prerequisite. Anything that prevents a confident comparison falls
//! open toward re-execution: understating staleness risks stale
//! artifacts, overstating it only costs redundant work.

use crate::target::{Target, TargetRegistry};
use crate::vars::VarStore;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Decides whether a target must run, from file-system timestamps.
pub struct StalenessEvaluator<'a> {
    registry: &'a TargetRegistry,
    vars: &'a VarStore,
    base_dir: &'a Path,
}

impl<'a> StalenessEvaluator<'a> {
    /// Create an evaluator resolving relative paths against `base_dir`.
    #[must_use]
    pub fn new(registry: &'a TargetRegistry, vars: &'a VarStore, base_dir: &'a Path) -> Self {
        Self {
            registry,
            vars,
            base_dir,
        }
    }

    /// Whether the target's recipe must (re-)run.
    #[must_use]
    pub fn is_stale(&self, target: &Target) -> bool {
        if target.phony {
            debug!(target = %target.id, "phony, always stale");
            return true;
        }

        let Some(produces) = &target.produces else {
            // Nothing to compare against; run unconditionally.
            return true;
        };
        let out_path = self.resolve(produces);
        let Some(out_time) = mtime(&out_path) else {
            debug!(target = %target.id, output = %out_path.display(), "output missing or unreadable, stale");
            return true;
        };

        for prereq in &target.prerequisites {
            match self.prerequisite_time(prereq) {
                Some(time) if time > out_time => {
                    debug!(target = %target.id, prerequisite = %prereq, "prerequisite newer, stale");
                    return true;
                }
                Some(_) => {}
                None => {
                    // Phony prerequisite or unresolvable timestamp:
                    // conservatively force the dependent stale.
                    debug!(target = %target.id, prerequisite = %prereq, "no resolvable timestamp, stale");
                    return true;
                }
            }
        }

        false
    }

    /// Resolved modification time of a prerequisite: a declared
    /// non-phony target's produced path, or a literal filesystem path.
    /// `None` means "no confident timestamp".
    fn prerequisite_time(&self, id: &str) -> Option<SystemTime> {
        if let Some(dep) = self.registry.get(id) {
            if dep.phony {
                return None;
            }
            let produces = dep.produces.as_ref()?;
            mtime(&self.resolve(produces))
        } else {
            mtime(&self.resolve(id))
        }
    }

    fn resolve(&self, text: &str) -> PathBuf {
        let expanded = self.vars.expand(text);
        let path = PathBuf::from(expanded);
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
