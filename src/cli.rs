use clap::builder::TypedValueParser;
use clap::{ArgAction, ArgMatches, Command, CommandFactory, FromArgMatches, Parser, ValueEnum};
use serde_yaml::{Mapping, Value};
use std::time::Duration;

use crate::engine::DEFAULT_WORKERS;
use crate::metrics::DEFAULT_METRICS_PORT;
use crate::probe::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "pipecheck",
    version,
    about = "Connectivity and health checks for network endpoints",
    long_about = "pipecheck runs TCP, HTTP, DNS, ICMP and MySQL checks from the command line, a YAML file \
                  or Kubernetes custom resources, once or on an interval with Prometheus metrics."
)]
pub struct Cli {
    /// YAML check file, or '-' to read from stdin
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<String>,

    /// TCP connect timeout in seconds [default: 2.0]
    #[arg(long, value_name = "SECS", value_parser = parse_positive_secs)]
    pub tcp_timeout: Option<f64>,

    /// HTTP method for http checks [default: HEAD]
    #[arg(long, value_name = "VERB")]
    pub http_method: Option<String>,

    /// Accepted HTTP status codes [default: 200-207 and 300-307]
    #[arg(long, value_name = "CODE", num_args = 1.., action = ArgAction::Append)]
    pub http_status: Vec<u16>,

    /// Number of ICMP echo requests per ping check [default: 1]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub ping_count: Option<u32>,

    /// CA bundle (PEM) trusted by http checks
    #[arg(long, value_name = "PATH")]
    pub ca_certs: Option<String>,

    /// Retry http checks without certificate verification and report a warning
    #[arg(long)]
    pub insecure: bool,

    /// Repeat all checks every SECS seconds and serve metrics
    #[arg(short, long, value_name = "SECS", value_parser = parse_positive_secs)]
    pub interval: Option<f64>,

    /// Metrics port used with --interval
    #[arg(short, long, default_value_t = DEFAULT_METRICS_PORT)]
    pub port: u16,

    /// Number of checks run in parallel
    #[arg(short, long, default_value_t = DEFAULT_WORKERS, value_parser = clap::value_parser!(u64).range(1..).map(|n| n as usize))]
    pub workers: usize,

    /// Load checks from Check custom resources
    #[arg(short, long)]
    pub kubernetes: bool,

    /// Namespace of the Check resources
    #[arg(long, default_value = "default")]
    pub namespace: String,

    /// Label selector for the Check resources
    #[arg(long, value_name = "LABELS")]
    pub selector: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, value_name = "URL", num_args = 1.., action = ArgAction::Append)]
    pub http: Vec<String>,

    #[arg(long, value_name = "HOST:PORT", num_args = 1.., action = ArgAction::Append)]
    pub tcp: Vec<String>,

    #[arg(long, value_name = "NAME[=IP,...]", num_args = 1.., action = ArgAction::Append)]
    pub dns: Vec<String>,

    #[arg(long, value_name = "HOST", num_args = 1.., action = ArgAction::Append)]
    pub ping: Vec<String>,

    #[arg(long, value_name = "HOST[:PORT]", num_args = 1.., action = ArgAction::Append)]
    pub mysql: Vec<String>,
}

fn parse_positive_secs(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(secs) if secs > 0.0 && Duration::try_from_secs_f64(secs).is_ok() => Ok(secs),
        _ => Err(format!("'{}' is not a positive number of seconds", raw)),
    }
}

impl Cli {
    /// The clap command with each target flag described by its probe type.
    pub fn command_for(registry: &Registry) -> Command {
        let mut command = Self::command();
        for kind in registry.kinds() {
            if command.get_arguments().any(|arg| arg.get_id() == kind.name) {
                command = command.mut_arg(kind.name, |arg| arg.help(kind.help));
            }
        }
        command
    }

    /// Parse the process arguments, exiting with clap's usage error on failure.
    pub fn parse_for(registry: &Registry) -> Self {
        let matches: ArgMatches = Self::command_for(registry).get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    /// Target literals per probe type, in flag declaration order.
    pub fn targets(&self) -> Vec<(&'static str, &[String])> {
        vec![
            ("http", self.http.as_slice()),
            ("tcp", self.tcp.as_slice()),
            ("dns", self.dns.as_slice()),
            ("ping", self.ping.as_slice()),
            ("mysql", self.mysql.as_slice()),
        ]
    }

    /// Global options given explicitly on the command line.
    pub fn global_options(&self) -> Mapping {
        let mut options = Mapping::new();
        if let Some(timeout) = self.tcp_timeout {
            options.insert(Value::from("tcp_timeout"), Value::from(timeout));
        }
        if let Some(method) = &self.http_method {
            options.insert(Value::from("http_method"), Value::from(method.as_str()));
        }
        if !self.http_status.is_empty() {
            let codes = self.http_status.iter().copied().map(Value::from).collect();
            options.insert(Value::from("http_status"), Value::Sequence(codes));
        }
        if let Some(count) = self.ping_count {
            options.insert(Value::from("ping_count"), Value::from(count));
        }
        if let Some(path) = &self.ca_certs {
            options.insert(Value::from("ca_certs"), Value::from(path.as_str()));
        }
        if self.insecure {
            options.insert(Value::from("insecure"), Value::Bool(true));
        }
        options
    }
}
