//! Single-run and interval check modes.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tracing::{debug, error, info};

use crate::cli::Cli;
use crate::config::{Resolved, resolve};
use crate::engine::{Engine, RoundSummary};
use crate::error::{PipecheckError, Result};
use crate::interval::{Driver, Shutdown};
use crate::k8s::{CheckRepository, KubeRepository};
use crate::metrics::{self, MetricState};
use crate::probe::Registry;
use crate::reporter::{Reporter, reporter_for};

use super::{EXIT_FATAL, fatal};

/// Everything needed to run rounds: resolved checks, the worker pool and
/// the output sinks.
pub struct Session {
    registry: Registry,
    resolved: Resolved,
    engine: Engine,
    reporter: Box<dyn Reporter + Send + Sync>,
    metrics: Option<Arc<MetricState>>,
}

impl Session {
    /// Resolve every check source and validate the checks by building them
    /// once, so argument errors surface before the first round.
    pub fn prepare(cli: &Cli) -> Result<Self> {
        let registry = Registry::builtin()?;
        let repository = if cli.kubernetes {
            Some(KubeRepository::connect()?)
        } else {
            None
        };
        let resolved = resolve(
            cli,
            &registry,
            repository.as_ref().map(|r| r as &dyn CheckRepository),
        )?;
        registry.instantiate_all(&resolved.specs, &resolved.options)?;
        debug!(checks = resolved.specs.len(), "resolved checks");

        let color = !cli.no_color && std::io::stdout().is_terminal();
        colored::control::set_override(color);

        Ok(Self {
            engine: Engine::new(cli.workers)?,
            reporter: reporter_for(cli.format, color),
            registry,
            resolved,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricState>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.specs.is_empty()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Build fresh probe instances, run them, print each result as it
    /// arrives and update metrics.
    pub fn run_round(&self) -> Result<RoundSummary> {
        let jobs = self
            .registry
            .instantiate_all(&self.resolved.specs, &self.resolved.options)?;
        let summary = self.engine.run(&jobs, |job, result| {
            println!("{}", self.reporter.report(job, result));
            if let Some(metrics) = &self.metrics {
                metrics.update(job.kind(), &job.labels(), result.status());
            }
        });
        if let Some(metrics) = &self.metrics {
            metrics.observe_round(summary.elapsed);
        }
        info!(
            ok = summary.ok,
            warn = summary.warn,
            err = summary.err,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "round complete"
        );
        Ok(summary)
    }
}

fn prepare_or_exit(cli: &Cli) -> std::result::Result<Session, ExitCode> {
    let session = Session::prepare(cli).map_err(|e| fatal(&e))?;
    if session.is_empty() {
        eprintln!("No probes specified");
        return Err(ExitCode::SUCCESS);
    }
    Ok(session)
}

/// Run every check once.
pub fn run_once_mode(cli: &Cli) -> ExitCode {
    let session = match prepare_or_exit(cli) {
        Ok(session) => session,
        Err(code) => return code,
    };
    match session.run_round() {
        Ok(summary) => ExitCode::from(summary.exit_code() as u8),
        Err(e) => fatal(&e),
    }
}

/// Run every check each `interval` seconds, serving metrics on `cli.port`,
/// until SIGINT or SIGTERM.
pub fn run_interval_mode(cli: &Cli, interval: f64) -> ExitCode {
    let session = match prepare_or_exit(cli) {
        Ok(session) => session,
        Err(code) => return code,
    };
    // --interval is range-checked by clap; saturate for direct callers.
    let interval = Duration::try_from_secs_f64(interval).unwrap_or(Duration::MAX);
    match run_interval(cli, session, interval) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => fatal(&e),
    }
}

fn run_interval(cli: &Cli, session: Session, interval: Duration) -> Result<i32> {
    let metrics = Arc::new(MetricState::new(session.registry())?);
    let session = session.with_metrics(Arc::clone(&metrics));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("pipecheck-runtime")
        .enable_all()
        .build()
        .map_err(PipecheckError::Runtime)?;
    start_metrics_server(&runtime, cli.port, metrics)?;

    let shutdown = Shutdown::new();
    runtime.spawn(watch_signals(shutdown.clone()));

    info!(interval_secs = interval.as_secs_f64(), "starting interval mode");
    let mut failure = None;
    let driver = Driver::new(interval, shutdown.clone());
    let code = driver.run(|| match session.run_round() {
        Ok(summary) => summary.exit_code(),
        Err(e) => {
            failure = Some(e);
            shutdown.trigger();
            i32::from(EXIT_FATAL)
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(code),
    }
}

fn start_metrics_server(runtime: &Runtime, port: u16, metrics: Arc<MetricState>) -> Result<()> {
    let listener = runtime
        .block_on(TcpListener::bind(("0.0.0.0", port)))
        .map_err(|source| PipecheckError::MetricsBind { port, source })?;
    runtime.spawn(async move {
        if let Err(e) = metrics::serve(listener, metrics).await {
            error!(error = %e, "metrics endpoint stopped");
        }
    });
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then stop without draining running checks.
#[cfg(unix)]
async fn watch_signals(shutdown: Shutdown) {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut interrupt, mut terminate) =
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(interrupt), Ok(terminate)) => (interrupt, terminate),
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "failed to install signal handlers");
                return;
            }
        };

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
    };
    exit_on_signal(name, &shutdown);
}

#[cfg(not(unix))]
async fn watch_signals(shutdown: Shutdown) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => exit_on_signal("SIGINT", &shutdown),
        Err(e) => error!(error = %e, "failed to install signal handler"),
    }
}

fn exit_on_signal(name: &str, shutdown: &Shutdown) {
    eprintln!("signal {} received. exited.", name);
    shutdown.trigger();
    std::process::exit(0);
}
