use pipecheck::{
    Cli, Registry,
    handlers::{fatal, run_interval_mode, run_once_mode},
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let registry = match Registry::builtin() {
        Ok(registry) => registry,
        Err(e) => return fatal(&e.into()),
    };
    let cli = Cli::parse_for(&registry);
    init_tracing(cli.verbose);

    match cli.interval {
        Some(interval) => run_interval_mode(&cli, interval),
        None => run_once_mode(&cli),
    }
}
