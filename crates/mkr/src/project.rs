//! Built-in project definition: default variables and the declared
//! target set.
//!
//! The defaults describe a src-layout Python project driven through a
//! virtual environment. Every variable can be overridden from the
//! calling environment; every path below is expanded at invocation
//! time, so an override like `VENV_DIR=.env` retargets the whole set.

use mkr_core::prune::{PruneMode, PruneRequest};
use mkr_core::target::{CommandLine, RecipeStep, Target, TargetRegistry};
use mkr_core::vars::{EnvSnapshot, VarStore};
use mkr_core::Result;

/// Cache artifact name patterns removed by `clean`.
const CACHE_PATTERNS: &[&str] = &["__pycache__", "*.egg-info", ".mypy_cache"];

/// Build the variable store with project defaults, environment
/// overrides applied.
#[must_use]
pub fn variables(env: EnvSnapshot) -> VarStore {
    let mut vars = VarStore::new(env);
    vars.define("PRODUCT", "terra");
    vars.define("SRC_DIR", "src");
    vars.define("VENV_DIR", ".venv");
    vars.define("PYTHON", "${VENV_DIR}/bin/python");
    vars.define("PIP", "${VENV_DIR}/bin/pip");
    vars.define("ARGS", "");
    vars
}

/// Declare the built-in target set.
///
/// `venv` is the only file-backed target; everything else is phony.
/// The venv directory is the protected subtree for `clean` and is only
/// ever removed by `purge`.
pub fn targets() -> Result<TargetRegistry> {
    let mut registry = TargetRegistry::new();

    registry.declare(
        Target::new("venv")
            .produces("${VENV_DIR}")
            .prerequisite("pyproject.toml")
            .step(exec("python3", &["-m", "venv", "${VENV_DIR}"]))
            .step(exec("${PIP}", &["install", "--upgrade", "pip"]))
            .step(exec("${PIP}", &["install", "-e", "."])),
    )?;

    registry.declare(
        Target::new("run")
            .phony()
            .prerequisite("venv")
            .step(RecipeStep::Shell("${PYTHON} -m ${PRODUCT} ${ARGS}".into())),
    )?;

    registry.declare(
        Target::new("check")
            .phony()
            .prerequisite("venv")
            .step(exec("${PYTHON}", &["-m", "mypy", "${SRC_DIR}"])),
    )?;

    registry.declare(
        Target::new("docs")
            .phony()
            .prerequisite("venv")
            .step(exec(
                "${PYTHON}",
                &["-m", "pdoc", "${SRC_DIR}/${PRODUCT}", "-o", "docs"],
            )),
    )?;

    registry.declare(
        Target::new("clean").phony().step(RecipeStep::Prune(PruneRequest {
            roots: vec![".".to_string()],
            protected: "${VENV_DIR}".to_string(),
            patterns: CACHE_PATTERNS.iter().map(ToString::to_string).collect(),
            mode: PruneMode::Delete,
        })),
    )?;

    registry.declare(
        Target::new("purge")
            .phony()
            .prerequisite("clean")
            .step(exec("rm", &["-rf", "${VENV_DIR}"])),
    )?;

    Ok(registry)
}

fn exec(program: &str, args: &[&str]) -> RecipeStep {
    RecipeStep::Exec(CommandLine::new(program, args.iter().copied()))
}
