//! Top-level run orchestration: registry and variable setup, plan
//! derivation, and execution.

use crate::cli::{Cli, EXIT_CONFIG, ListFormat};
use miette::Diagnostic;
use mkr_core::executor::{PlanRunner, RunReport, RunnerConfig};
use mkr_core::target::TargetRegistry;
use mkr_core::vars::EnvSnapshot;
use mkr_core::Error as CoreError;
use mkr_target_graph::{Error as GraphError, ExecutionPlan, TargetGraph};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Errors surfaced by a CLI run.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    /// Registry, staleness, execution, or pruning failure.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] CoreError),

    /// Graph construction or planning failure.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    /// The `--list --format json` output could not be serialized.
    #[error("failed to serialize target listing")]
    #[diagnostic(code(mkr::list::serialize))]
    Serialize(#[from] serde_json::Error),
}

/// Map a run error to the process exit code.
///
/// A failed recipe propagates the child's exit status; configuration
/// errors (unknown or duplicate targets, cycles) exit 2; everything
/// else exits 1.
#[must_use]
pub fn exit_code_for(err: &RunError) -> i32 {
    match err {
        RunError::Core(CoreError::RecipeFailure { exit_status, .. }) => {
            // Signal terminations carry -1; clamp to a plain failure.
            if *exit_status > 0 { *exit_status } else { 1 }
        }
        RunError::Core(CoreError::UnknownTarget { .. } | CoreError::DuplicateTarget { .. })
        | RunError::Graph(GraphError::CycleDetected { .. } | GraphError::UnknownRoot { .. }) => {
            EXIT_CONFIG
        }
        RunError::Core(_) | RunError::Serialize(_) => 1,
    }
}

/// Execute the parsed command line against the built-in project.
pub async fn execute(cli: &Cli) -> Result<(), RunError> {
    let vars = crate::project::variables(EnvSnapshot::capture());
    let registry = crate::project::targets()?;

    if cli.list {
        list_targets(&registry, cli.format)?;
        return Ok(());
    }

    let roots = cli.roots();
    for root in &roots {
        registry.lookup(root)?;
    }

    let mut graph = TargetGraph::new();
    graph.build_for_roots(&roots, |name| registry.get(name).cloned())?;
    let plan = ExecutionPlan::build(&graph, &roots)?;
    info!(roots = ?roots, targets = plan.len(), "execution plan ready");

    let working_dir = match &cli.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| {
            CoreError::io(e, None::<PathBuf>, "resolve working directory")
        })?,
    };
    let config = RunnerConfig {
        working_dir,
        capture_output: cli.capture,
        dry_run: cli.dry_run,
    };

    let runner = PlanRunner::new(&registry, &vars, config);
    let report = runner.run(plan.order()).await?;
    render_report(&report, cli.dry_run);
    Ok(())
}

fn render_report(report: &RunReport, dry_run: bool) {
    if dry_run {
        for step in &report.dry_run_steps {
            println!("{step}");
        }
        return;
    }
    if report.executed.is_empty() {
        info!(skipped = report.skipped.len(), "nothing to do");
    } else {
        info!(
            executed = report.executed.len(),
            skipped = report.skipped.len(),
            "run complete"
        );
    }
}

fn list_targets(registry: &TargetRegistry, format: ListFormat) -> Result<(), RunError> {
    match format {
        ListFormat::Text => {
            for target in registry.iter() {
                let mut line = target.id.clone();
                if target.phony {
                    line.push_str(" (phony)");
                }
                if let Some(produces) = &target.produces {
                    line.push_str(&format!(" -> {produces}"));
                }
                if !target.prerequisites.is_empty() {
                    line.push_str(&format!(" <- {}", target.prerequisites.join(" ")));
                }
                println!("{line}");
            }
        }
        ListFormat::Json => {
            let targets: Vec<_> = registry.iter().collect();
            println!("{}", serde_json::to_string_pretty(&targets)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_failure_propagates_child_status() {
        let err = RunError::Core(CoreError::recipe_failure("build", 1, 3));
        assert_eq!(exit_code_for(&err), 3);
    }

    #[test]
    fn test_signal_status_clamps_to_one() {
        let err = RunError::Core(CoreError::recipe_failure("build", 0, -1));
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn test_unknown_target_exits_config() {
        let err = RunError::Core(CoreError::unknown_target("deploy"));
        assert_eq!(exit_code_for(&err), EXIT_CONFIG);
    }

    #[test]
    fn test_cycle_exits_config() {
        let err = RunError::Graph(GraphError::cycle(vec!["a".into(), "b".into()]));
        assert_eq!(exit_code_for(&err), EXIT_CONFIG);
    }

    #[tokio::test]
    async fn test_unknown_root_fails_before_execution() {
        let cli = crate::cli::Cli {
            targets: vec!["deploy".to_string()],
            list: false,
            format: ListFormat::Text,
            dry_run: false,
            directory: None,
            capture: true,
            log_level: crate::tracing::LogLevel::Warn,
            log_format: crate::tracing::LogFormat::Compact,
        };
        let err = execute(&cli).await.unwrap_err();
        assert!(matches!(
            err,
            RunError::Core(CoreError::UnknownTarget { ref name }) if name == "deploy"
        ));
    }
}
