//! unitgen binary.
//!
//! Parses flags, runs the generator once and maps the outcome to an exit code. This is the only
//! place that prints errors or decides the process status.

use std::io::Write;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use unitgen::Generator;
use unitgen::cli::{self, Cli};

fn main() -> ExitCode {
    let args = Cli::parse_normalized();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "run failed");
            if let Some(output) = err.captured_output() {
                eprint!("{output}");
                if !output.ends_with('\n') {
                    eprintln!();
                }
            }
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(args: &Cli) -> unitgen::Result<()> {
    let opts = args.options();
    let config = args.unit_config();
    let plan = args.plan();
    let manager = args.backend.client(&opts)?;
    let generator = Generator::new(opts, manager);
    let stdout = std::io::stdout();
    generator.run(&config, plan, |step| {
        let mut out = stdout.lock();
        if let Err(e) = cli::print_step(&mut out, step).and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "failed to write progress to stdout");
        }
    })?;
    Ok(())
}
