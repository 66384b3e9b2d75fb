//! TCP handshake probe.

use serde_yaml::Value;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::registry::{ProbeKind, RegistryError};
use super::{CheckResult, Labels, Probe, ProbeArgs, arg_map, labels, split_host_port};

pub const DEFAULT_TCP_TIMEOUT: f64 = 2.0;

/// Opens a TCP connection to `host:port` and closes it again.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub const KIND: ProbeKind = ProbeKind {
        name: "tcp",
        help: "Try simple TCP handshake on given host and port (e.g. 8.8.8.8:53)",
        parameters: &["host", "port", "tcp_timeout"],
        constructor: Self::build,
        parse_target: Self::parse_target,
    };

    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    fn build(args: ProbeArgs) -> Result<Box<dyn Probe>, RegistryError> {
        let host = args.required_str("host")?;
        let port = args.required_u16("port")?;
        let timeout = args.duration("tcp_timeout", DEFAULT_TCP_TIMEOUT)?;
        Ok(Box::new(Self::new(host, port, timeout)))
    }

    fn parse_target(literal: &str) -> Result<serde_yaml::Mapping, String> {
        match split_host_port(literal)? {
            (host, Some(port)) => Ok(arg_map([
                ("host", Value::String(host)),
                ("port", Value::Number(port.into())),
            ])),
            (_, None) => Err("expected host:port".to_string()),
        }
    }
}

impl Probe for TcpProbe {
    fn invoke(&self) -> CheckResult {
        let failed = |reason: String| {
            CheckResult::err(format!(
                "TCP connection failed on port {} for {} ({})",
                self.port, self.host, reason
            ))
        };

        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs.collect::<Vec<_>>(),
            Err(e) => return failed(e.to_string()),
        };

        let mut last_error = String::from("no address resolved");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_stream) => {
                    return CheckResult::ok(format!(
                        "TCP connection successfully established to port {} on {}",
                        self.port, self.host
                    ));
                }
                Err(e) => last_error = e.to_string(),
            }
        }
        failed(last_error)
    }

    fn labels(&self) -> Labels {
        labels([("host", self.host.clone()), ("port", self.port.to_string())])
    }
}
