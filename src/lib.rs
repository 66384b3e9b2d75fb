pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod interval;
pub mod k8s;
pub mod metrics;
pub mod probe;
pub mod reporter;

#[cfg(test)]
pub mod test_utils;

pub use cli::{Cli, OutputFormat};
pub use config::{ConfigError, GlobalOptions, ProbeSpec, Resolved, resolve};
pub use engine::{Engine, RoundSummary};
pub use error::{PipecheckError, Result};
pub use interval::{Driver, Shutdown};
pub use k8s::{CheckRepository, CheckResource, K8sError, KubeRepository};
pub use metrics::MetricState;
pub use probe::{CheckResult, Job, Probe, ProbeKind, Registry, RegistryError, Status};
pub use reporter::{JsonReporter, Reporter, TerminalReporter};
