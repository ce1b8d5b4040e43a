//! Variable bindings and `${NAME}` expansion.
//!
//! A [`VarStore`] holds the string bindings available to recipe steps.
//! Defaults are declared with [`VarStore::define`]; a binding of the
//! same name present in the [`EnvSnapshot`] the store was built from
//! always wins over the declared default. The store is populated once
//! at the start of a run and never mutated afterwards.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// A `${NAME}` reference inside target definitions and recipe text.
#[allow(clippy::expect_used)]
static VAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("variable reference pattern is valid")
});

/// Bound on nested expansion passes, so a self-referential binding
/// cannot loop forever.
const MAX_EXPANSION_DEPTH: usize = 8;

/// Process environment captured once at startup.
///
/// The store never reads ambient process state mid-run; every
/// environment lookup goes through a snapshot taken at construction.
/// Snapshots are also buildable from pairs, which keeps tests
/// independent of the real environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Look up a captured environment variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Key/value string bindings with environment-override precedence and
/// `${NAME}` textual expansion.
#[derive(Debug, Clone)]
pub struct VarStore {
    env: EnvSnapshot,
    values: HashMap<String, String>,
}

impl VarStore {
    /// Create an empty store backed by the given environment snapshot.
    #[must_use]
    pub fn new(env: EnvSnapshot) -> Self {
        Self {
            env,
            values: HashMap::new(),
        }
    }

    /// Register a binding with a default value.
    ///
    /// If the snapshot carries a variable of the same name, the
    /// environment value wins and the default is discarded. A later
    /// `define` of the same name overwrites an earlier one.
    pub fn define(&mut self, name: impl Into<String>, default_value: impl Into<String>) {
        let name = name.into();
        let value = self
            .env
            .get(&name)
            .map_or_else(|| default_value.into(), String::from);
        self.values.insert(name, value);
    }

    /// Look up a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Iterate over all bindings, for exporting into child processes.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every `${NAME}` reference to a known binding with its
    /// value. References to unknown names are left verbatim.
    ///
    /// Binding values may themselves contain references (e.g.
    /// `PYTHON=${VENV_DIR}/bin/python`), so expansion repeats until a
    /// fixed point, bounded to guard against self-referential bindings.
    #[must_use]
    pub fn expand(&self, text: &str) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_EXPANSION_DEPTH {
            let next = VAR_REF
                .replace_all(&current, |caps: &regex::Captures<'_>| {
                    match self.values.get(&caps[1]) {
                        Some(value) => value.clone(),
                        None => caps[0].to_string(),
                    }
                })
                .into_owned();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}
