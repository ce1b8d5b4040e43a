//! mkr binary entry point.

// The CLI binary talks to stdout/stderr directly.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use miette::Report;
use mkr::{EXIT_OK, cli, execute, exit_code_for, tracing};

fn main() {
    // Tracing may be unusable during a panic, so fall back to stderr.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("mkr panicked: {panic_info}");
        eprintln!("Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    // Ignore the error if tracing is already initialized (e.g. tests).
    let _ = tracing::init(cli.log_level, cli.log_format);

    let exit_code = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt.block_on(run(&cli)),
        Err(e) => {
            eprintln!("Fatal error: failed to create tokio runtime: {e}");
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: &cli::Cli) -> i32 {
    match execute(cli).await {
        Ok(()) => EXIT_OK,
        Err(err) => {
            let code = exit_code_for(&err);
            let report = Report::new(err);
            eprintln!("{report:?}");
            code
        }
    }
}
