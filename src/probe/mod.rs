//! Probe contract and built-in probe implementations.
//!
//! A probe is one executable check against a network target. Each probe type
//! is described by a [`ProbeKind`] (name, declared parameters, help text and
//! CLI literal syntax) and registered in a [`Registry`]; the registry turns a
//! [`ProbeSpec`](crate::config::ProbeSpec) into a boxed [`Probe`] instance.

pub mod args;
pub mod dns;
pub mod http;
pub mod mysql;
pub mod ping;
pub mod registry;
pub mod tcp;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use args::{ProbeArgs, is_falsy};
pub use dns::DnsProbe;
pub use http::HttpProbe;
pub use mysql::MysqlProbe;
pub use ping::PingProbe;
pub use registry::{Job, ProbeKind, Registry, RegistryError};
pub use tcp::TcpProbe;

/// Argument names that may be exported as metric labels.
pub const LABEL_KEYS: [&str; 4] = ["url", "host", "port", "name"];

/// Metric label set of a probe instance, restricted to [`LABEL_KEYS`].
pub type Labels = BTreeMap<String, String>;

/// Classification of a single check.
///
/// Ordering follows aggregation precedence: `Err` dominates `Warn` dominates `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warn,
    Err,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Ok, Status::Warn, Status::Err];

    /// State name as exported on the metrics endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "Ok",
            Status::Warn => "Warn",
            Status::Err => "Err",
        }
    }

    /// Tag printed by the terminal reporter.
    pub fn tag(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warn => "WARN",
            Status::Err => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    status: Status,
    message: String,
}

impl CheckResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(Status::Ok, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Status::Warn, message)
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self::new(Status::Err, message)
    }

    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_err(&self) -> bool {
        self.status == Status::Err
    }
}

/// An executable check built from a filtered argument set.
///
/// Implementations catch their own failure domain (refused connections,
/// timeouts, resolution failures) and report it as an `Err` or `Warn`
/// result instead of returning an error.
pub trait Probe: Send + Sync + fmt::Debug {
    /// Run the check. May block on network I/O for as long as the probe's
    /// own timeout arguments allow.
    fn invoke(&self) -> CheckResult;

    /// Metric labels of this instance, a subset of its own arguments.
    fn labels(&self) -> Labels;
}

/// Build a label set from `(key, value)` pairs, dropping keys outside the
/// label vocabulary.
pub fn labels<'a, I, V>(pairs: I) -> Labels
where
    I: IntoIterator<Item = (&'a str, V)>,
    V: ToString,
{
    pairs
        .into_iter()
        .filter(|(key, _)| LABEL_KEYS.contains(key))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Argument mapping produced by a target literal parser.
pub(crate) fn arg_map<const N: usize>(pairs: [(&str, serde_yaml::Value); N]) -> serde_yaml::Mapping {
    pairs
        .into_iter()
        .map(|(key, value)| (serde_yaml::Value::String(key.to_string()), value))
        .collect()
}

/// Split `host:port`, accepting bracketed IPv6 hosts (`[::1]:53`).
pub(crate) fn split_host_port(literal: &str) -> Result<(String, Option<u16>), String> {
    let literal = literal.trim();
    let (host, port) = if let Some(rest) = literal.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| "unterminated '[' in host".to_string())?;
        match tail {
            "" => (host, None),
            _ => match tail.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None => return Err(format!("unexpected '{}' after host", tail)),
            },
        }
    } else {
        match literal.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => (host, Some(port)),
            Some(_) => (literal, None),
            None => (literal, None),
        }
    };

    if host.is_empty() {
        return Err("missing host".to_string());
    }
    let port = match port {
        None => None,
        Some(raw) => match raw.parse::<u16>() {
            Ok(p) if p != 0 => Some(p),
            _ => return Err(format!("'{}' is not a valid port", raw)),
        },
    };
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(Status::Ok < Status::Warn);
        assert!(Status::Warn < Status::Err);
        assert_eq!(
            [Status::Warn, Status::Err, Status::Ok].iter().max(),
            Some(&Status::Err)
        );
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(Status::Ok.as_str(), "Ok");
        assert_eq!(Status::Warn.as_str(), "Warn");
        assert_eq!(Status::Err.as_str(), "Err");
    }

    #[test]
    fn test_status_tag() {
        assert_eq!(Status::Ok.tag(), "OK");
        assert_eq!(Status::Warn.tag(), "WARN");
        assert_eq!(Status::Err.tag(), "ERROR");
    }

    #[test]
    fn test_check_result_constructors() {
        let ok = CheckResult::ok("fine");
        assert_eq!(ok.status(), Status::Ok);
        assert_eq!(ok.message(), "fine");
        assert!(!ok.is_err());

        assert_eq!(CheckResult::warn("meh").status(), Status::Warn);
        assert!(CheckResult::err("broken").is_err());
    }

    #[test]
    fn test_labels_filters_vocabulary() {
        let labels = labels([("host", "8.8.8.8"), ("port", "53"), ("tcp_timeout", "2")]);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["host"], "8.8.8.8");
        assert_eq!(labels["port"], "53");
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("8.8.8.8:53").unwrap(),
            ("8.8.8.8".to_string(), Some(53))
        );
        assert_eq!(
            split_host_port("db.internal").unwrap(),
            ("db.internal".to_string(), None)
        );
        assert_eq!(
            split_host_port("[::1]:5432").unwrap(),
            ("::1".to_string(), Some(5432))
        );
        assert_eq!(split_host_port("::1").unwrap(), ("::1".to_string(), None));
    }

    #[test]
    fn test_split_host_port_errors() {
        assert!(split_host_port(":53").is_err());
        assert!(split_host_port("host:0").is_err());
        assert!(split_host_port("host:http").is_err());
        assert!(split_host_port("[::1").is_err());
    }
}
