//! ICMP echo probe backed by the system `ping` binary.

use regex::Regex;
use serde_yaml::Value;
use std::process::Command;
use std::sync::LazyLock;

use super::registry::{ProbeKind, RegistryError};
use super::{CheckResult, Labels, Probe, ProbeArgs, arg_map, labels};

pub const DEFAULT_PING_COUNT: u32 = 1;

static PACKET_LOSS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)% packet loss").unwrap());
static AVERAGE_RTT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*[\d.]+/([\d.]+)/").unwrap());

#[derive(Debug, Clone)]
pub struct PingProbe {
    host: String,
    count: u32,
}

/// Summary extracted from `ping` output.
#[derive(Debug, Clone, PartialEq)]
pub struct PingStats {
    pub packet_loss: f64,
    pub avg_rtt: Option<f64>,
}

impl PingProbe {
    pub const KIND: ProbeKind = ProbeKind {
        name: "ping",
        help: "ICMP ping check",
        parameters: &["host", "ping_count"],
        constructor: Self::build,
        parse_target: Self::parse_target,
    };

    pub fn new(host: impl Into<String>, count: u32) -> Self {
        Self {
            host: host.into(),
            count: count.max(1),
        }
    }

    fn build(args: ProbeArgs) -> Result<Box<dyn Probe>, RegistryError> {
        let host = args.required_str("host")?;
        if host.starts_with('-') || host.contains(char::is_whitespace) {
            return Err(args.invalid("host", format!("'{}' is not a host name or address", host)));
        }
        let count = args.u32("ping_count")?.unwrap_or(DEFAULT_PING_COUNT);
        Ok(Box::new(Self::new(host, count)))
    }

    fn parse_target(literal: &str) -> Result<serde_yaml::Mapping, String> {
        let host = literal.trim();
        if host.is_empty() || host.starts_with('-') || host.contains(char::is_whitespace) {
            return Err("expected a host name or address".to_string());
        }
        Ok(arg_map([("host", Value::String(host.to_string()))]))
    }

    fn classify(&self, stats: Option<PingStats>) -> CheckResult {
        match stats {
            Some(stats) if stats.packet_loss < 100.0 => {
                if stats.packet_loss > 0.0 {
                    CheckResult::warn(format!(
                        "ICMP '{}' unreliable! packet loss {}%",
                        self.host, stats.packet_loss
                    ))
                } else {
                    let rtt = stats
                        .avg_rtt
                        .map(|avg| avg.to_string())
                        .unwrap_or_else(|| "?".to_string());
                    CheckResult::ok(format!("ICMP '{}' reachable ({}ms)", self.host, rtt))
                }
            }
            _ => CheckResult::err(format!("ICMP '{}' unreachable", self.host)),
        }
    }
}

/// Parse the summary lines printed by iputils, BSD and busybox `ping`.
pub fn parse_output(output: &str) -> Option<PingStats> {
    let packet_loss = PACKET_LOSS
        .captures(output)
        .and_then(|c| c[1].parse::<f64>().ok())?;
    let avg_rtt = AVERAGE_RTT
        .captures(output)
        .and_then(|c| c[1].parse::<f64>().ok());
    Some(PingStats {
        packet_loss,
        avg_rtt,
    })
}

impl Probe for PingProbe {
    fn invoke(&self) -> CheckResult {
        let output = match Command::new("ping")
            .arg("-c")
            .arg(self.count.to_string())
            .arg(&self.host)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                return CheckResult::err(format!("ICMP '{}' unreachable ({})", self.host, e));
            }
        };
        let stdout = String::from_utf8_lossy(&output.stdout);
        self.classify(parse_output(&stdout))
    }

    fn labels(&self) -> Labels {
        labels([("host", self.host.as_str())])
    }
}
