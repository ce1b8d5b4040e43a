//! Sequential plan execution.
//!
//! The runner walks an execution plan strictly in order: for each
//! target it consults the staleness evaluator, expands the recipe steps
//! immediately before invocation, and spawns them one at a time. The
//! first step that exits non-zero aborts the whole run; no further
//! steps or targets execute. There is deliberately no parallel fan-out:
//! recipe steps may have ordering side effects, and the failure
//! contract requires a clean halting point.

use crate::prune::{self, PruneRequest};
use crate::staleness::StalenessEvaluator;
use crate::target::{RecipeStep, TargetRegistry};
use crate::vars::VarStore;
use crate::{Error, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory recipes run in and relative paths resolve against.
    pub working_dir: PathBuf,
    /// Capture child stdout/stderr instead of inheriting the terminal.
    /// Captured output is re-emitted through the log: stdout at debug
    /// when the step succeeds, stderr at warn when it fails.
    pub capture_output: bool,
    /// Render expanded steps into the report instead of executing.
    pub dry_run: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            capture_output: false,
            dry_run: false,
        }
    }
}

/// What a run did: which targets executed, which were skipped as up to
/// date, and (in dry-run mode) the expanded steps that would have run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Targets whose recipes ran, in execution order.
    pub executed: Vec<String>,
    /// Targets skipped as not stale.
    pub skipped: Vec<String>,
    /// Expanded step renderings, populated only in dry-run mode.
    pub dry_run_steps: Vec<String>,
}

/// Executes an execution plan against a registry and variable store.
///
/// Holds no mutable state of its own; everything mutable about a run
/// lives in the per-run [`RunReport`].
pub struct PlanRunner<'a> {
    registry: &'a TargetRegistry,
    vars: &'a VarStore,
    config: RunnerConfig,
}

impl<'a> PlanRunner<'a> {
    /// Create a runner over a loaded registry and variable store.
    #[must_use]
    pub fn new(registry: &'a TargetRegistry, vars: &'a VarStore, config: RunnerConfig) -> Self {
        Self {
            registry,
            vars,
            config,
        }
    }

    /// Run the plan: each id in order, stale targets executed, fresh
    /// ones skipped. Fails fast on the first non-zero step.
    pub async fn run(&self, plan: &[String]) -> Result<RunReport> {
        let staleness = StalenessEvaluator::new(self.registry, self.vars, &self.config.working_dir);
        let mut report = RunReport::default();

        for id in plan {
            let target = self.registry.lookup(id)?;

            if !staleness.is_stale(target) {
                debug!(target = %id, "up to date, skipping");
                report.skipped.push(id.clone());
                continue;
            }

            if self.config.dry_run {
                for step in &target.recipe {
                    report
                        .dry_run_steps
                        .push(format!("{id}: {}", self.render_step(step)));
                }
                continue;
            }

            info!(target = %id, steps = target.recipe.len(), "running target");
            for (step_index, step) in target.recipe.iter().enumerate() {
                self.run_step(id, step_index, step).await?;
            }
            report.executed.push(id.clone());
        }

        Ok(report)
    }

    async fn run_step(&self, target: &str, step_index: usize, step: &RecipeStep) -> Result<()> {
        match step {
            RecipeStep::Exec(line) => {
                let program = self.vars.expand(&line.program);
                let args: Vec<String> = line.args.iter().map(|a| self.vars.expand(a)).collect();
                debug!(target, step = step_index, program = %program, "spawning");
                let mut cmd = Command::new(&program);
                cmd.args(&args);
                self.wait_for(target, step_index, cmd).await
            }
            RecipeStep::Shell(line) => {
                let expanded = self.vars.expand(line);
                debug!(target, step = step_index, line = %expanded, "spawning via shell");
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(&expanded);
                self.wait_for(target, step_index, cmd).await
            }
            RecipeStep::Prune(request) => {
                let acted = self.run_prune(request)?;
                info!(
                    target,
                    step = step_index,
                    entries = acted.len(),
                    "pruned"
                );
                Ok(())
            }
        }
    }

    async fn wait_for(&self, target: &str, step_index: usize, mut cmd: Command) -> Result<()> {
        cmd.current_dir(&self.config.working_dir);
        for (key, value) in self.vars.bindings() {
            cmd.env(key, value);
        }

        let status = if self.config.capture_output {
            let output = cmd
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output()
                .await
                .map_err(|e| {
                    Error::io(e, None, format!("spawn step {step_index} of '{target}'"))
                })?;
            if output.status.success() {
                if !output.stdout.is_empty() {
                    debug!(
                        target,
                        step = step_index,
                        "step stdout:\n{}",
                        String::from_utf8_lossy(&output.stdout).trim_end()
                    );
                }
            } else {
                warn!(
                    target,
                    step = step_index,
                    "step stderr:\n{}",
                    String::from_utf8_lossy(&output.stderr).trim_end()
                );
            }
            output.status
        } else {
            cmd.stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .map_err(|e| {
                    Error::io(e, None, format!("spawn step {step_index} of '{target}'"))
                })?
        };

        if status.success() {
            Ok(())
        } else {
            // A signal-terminated child leaves no exit code; report -1
            // and abort the remaining plan like any other failure.
            Err(Error::recipe_failure(
                target,
                step_index,
                status.code().unwrap_or(-1),
            ))
        }
    }

    fn run_prune(&self, request: &PruneRequest) -> Result<Vec<PathBuf>> {
        let roots: Vec<PathBuf> = request.roots.iter().map(|r| self.resolve(r)).collect();
        let protected = self.resolve(&request.protected);
        let patterns: Vec<Pattern> = request
            .patterns
            .iter()
            .map(|p| {
                let expanded = self.vars.expand(p);
                Pattern::new(&expanded).map_err(|source| Error::InvalidPattern {
                    pattern: expanded,
                    source,
                })
            })
            .collect::<Result<_>>()?;
        prune::prune(&roots, &protected, &patterns, request.mode)
    }

    fn resolve(&self, text: &str) -> PathBuf {
        let path = PathBuf::from(self.vars.expand(text));
        if path.is_absolute() {
            path
        } else {
            self.config.working_dir.join(path)
        }
    }

    fn render_step(&self, step: &RecipeStep) -> String {
        match step {
            RecipeStep::Exec(line) => {
                let mut rendered = self.vars.expand(&line.program);
                for arg in &line.args {
                    rendered.push(' ');
                    rendered.push_str(&self.vars.expand(arg));
                }
                rendered
            }
            RecipeStep::Shell(line) => format!("sh -c '{}'", self.vars.expand(line)),
            RecipeStep::Prune(request) => format!(
                "prune {:?} roots={:?} protected={} patterns={:?}",
                request.mode,
                request.roots,
                self.vars.expand(&request.protected),
                request.patterns
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prune::PruneMode;
    use crate::target::{CommandLine, Target};
    use crate::vars::EnvSnapshot;
    use std::fs;
    use tempfile::TempDir;

    fn runner_parts(tmp: &TempDir) -> (TargetRegistry, VarStore, RunnerConfig) {
        (
            TargetRegistry::new(),
            VarStore::new(EnvSnapshot::default()),
            RunnerConfig {
                working_dir: tmp.path().to_path_buf(),
                capture_output: true,
                dry_run: false,
            },
        )
    }

    #[tokio::test]
    async fn test_executes_steps_in_declared_order() {
        let tmp = TempDir::new().unwrap();
        let (mut registry, vars, config) = runner_parts(&tmp);
        registry
            .declare(
                Target::new("build")
                    .phony()
                    .step(RecipeStep::Shell("echo one >> log.txt".into()))
                    .step(RecipeStep::Shell("echo two >> log.txt".into())),
            )
            .unwrap();

        let runner = PlanRunner::new(&registry, &vars, config);
        let report = runner.run(&["build".to_string()]).await.unwrap();

        assert_eq!(report.executed, vec!["build"]);
        let log = fs::read_to_string(tmp.path().join("log.txt")).unwrap();
        assert_eq!(log, "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_fail_fast_halts_at_failing_step() {
        let tmp = TempDir::new().unwrap();
        let (mut registry, vars, config) = runner_parts(&tmp);
        registry
            .declare(
                Target::new("build")
                    .phony()
                    .step(RecipeStep::Shell("touch first".into()))
                    .step(RecipeStep::Exec(CommandLine::new("false", Vec::<String>::new())))
                    .step(RecipeStep::Shell("touch third".into())),
            )
            .unwrap();

        let runner = PlanRunner::new(&registry, &vars, config);
        let err = runner.run(&["build".to_string()]).await.unwrap_err();

        match err {
            Error::RecipeFailure {
                target,
                step,
                exit_status,
            } => {
                assert_eq!(target, "build");
                assert_eq!(step, 1);
                assert_eq!(exit_status, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(tmp.path().join("first").exists());
        assert!(!tmp.path().join("third").exists());
    }

    #[tokio::test]
    async fn test_failure_stops_later_targets() {
        let tmp = TempDir::new().unwrap();
        let (mut registry, vars, config) = runner_parts(&tmp);
        registry
            .declare(
                Target::new("broken")
                    .phony()
                    .step(RecipeStep::Exec(CommandLine::new("false", Vec::<String>::new()))),
            )
            .unwrap();
        registry
            .declare(
                Target::new("after")
                    .phony()
                    .step(RecipeStep::Shell("touch after".into())),
            )
            .unwrap();

        let runner = PlanRunner::new(&registry, &vars, config);
        let plan = vec!["broken".to_string(), "after".to_string()];
        assert!(runner.run(&plan).await.is_err());
        assert!(!tmp.path().join("after").exists());
    }

    #[tokio::test]
    async fn test_fresh_target_skipped_without_side_effects() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("out.txt"), b"done").unwrap();
        let (mut registry, vars, config) = runner_parts(&tmp);
        registry
            .declare(
                Target::new("build")
                    .produces("out.txt")
                    .step(RecipeStep::Shell("touch side-effect".into())),
            )
            .unwrap();

        let runner = PlanRunner::new(&registry, &vars, config);
        let report = runner.run(&["build".to_string()]).await.unwrap();

        assert_eq!(report.skipped, vec!["build"]);
        assert!(report.executed.is_empty());
        assert!(!tmp.path().join("side-effect").exists());
    }

    #[tokio::test]
    async fn test_variables_expanded_at_invocation_and_exported() {
        let tmp = TempDir::new().unwrap();
        let (mut registry, mut vars, config) = runner_parts(&tmp);
        vars.define("NAME", "world");
        registry
            .declare(
                Target::new("greet")
                    .phony()
                    .step(RecipeStep::Shell("echo hello ${NAME} > greeting".into()))
                    .step(RecipeStep::Shell("printenv NAME > exported".into())),
            )
            .unwrap();

        let runner = PlanRunner::new(&registry, &vars, config);
        runner.run(&["greet".to_string()]).await.unwrap();

        let greeting = fs::read_to_string(tmp.path().join("greeting")).unwrap();
        assert_eq!(greeting.trim(), "hello world");
        let exported = fs::read_to_string(tmp.path().join("exported")).unwrap();
        assert_eq!(exported.trim(), "world");
    }

    #[tokio::test]
    async fn test_prune_step_respects_protected_subtree() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".venv/lib/__pycache__")).unwrap();
        fs::create_dir_all(tmp.path().join("app/__pycache__")).unwrap();

        let (mut registry, mut vars, config) = runner_parts(&tmp);
        vars.define("VENV_DIR", ".venv");
        registry
            .declare(
                Target::new("clean")
                    .phony()
                    .step(RecipeStep::Prune(PruneRequest {
                        roots: vec![".".into()],
                        protected: "${VENV_DIR}".into(),
                        patterns: vec!["__pycache__".into()],
                        mode: PruneMode::Delete,
                    })),
            )
            .unwrap();

        let runner = PlanRunner::new(&registry, &vars, config);
        runner.run(&["clean".to_string()]).await.unwrap();

        assert!(tmp.path().join(".venv/lib/__pycache__").exists());
        assert!(!tmp.path().join("app/__pycache__").exists());
    }

    #[tokio::test]
    async fn test_dry_run_renders_without_executing() {
        let tmp = TempDir::new().unwrap();
        let (mut registry, mut vars, mut config) = runner_parts(&tmp);
        config.dry_run = true;
        vars.define("NAME", "world");
        registry
            .declare(
                Target::new("greet")
                    .phony()
                    .step(RecipeStep::Shell("touch ${NAME}".into())),
            )
            .unwrap();

        let runner = PlanRunner::new(&registry, &vars, config);
        let report = runner.run(&["greet".to_string()]).await.unwrap();

        assert_eq!(report.dry_run_steps.len(), 1);
        assert!(report.dry_run_steps[0].contains("touch world"));
        assert!(!tmp.path().join("world").exists());
    }

    #[tokio::test]
    async fn test_captured_stdout_does_not_fail_step() {
        let tmp = TempDir::new().unwrap();
        let (mut registry, vars, config) = runner_parts(&tmp);
        registry
            .declare(
                Target::new("noisy")
                    .phony()
                    .step(RecipeStep::Exec(CommandLine::new("echo", ["plenty of output"]))),
            )
            .unwrap();

        let runner = PlanRunner::new(&registry, &vars, config);
        let report = runner.run(&["noisy".to_string()]).await.unwrap();

        assert_eq!(report.executed, vec!["noisy"]);
    }

    #[tokio::test]
    async fn test_phony_target_reruns_every_time() {
        let tmp = TempDir::new().unwrap();
        let (mut registry, vars, config) = runner_parts(&tmp);
        registry
            .declare(
                Target::new("tick")
                    .phony()
                    .step(RecipeStep::Shell("echo x >> ticks".into())),
            )
            .unwrap();

        let runner = PlanRunner::new(&registry, &vars, config);
        runner.run(&["tick".to_string()]).await.unwrap();
        runner.run(&["tick".to_string()]).await.unwrap();

        let ticks = fs::read_to_string(tmp.path().join("ticks")).unwrap();
        assert_eq!(ticks.lines().count(), 2);
    }
}
