//! DNS resolution probe.

use ipnetwork::IpNetwork;
use serde_yaml::Value;
use std::net::{IpAddr, ToSocketAddrs};

use super::registry::{ProbeKind, RegistryError};
use super::{CheckResult, Labels, Probe, ProbeArgs, arg_map, labels};

/// Resolves `name` and optionally checks the address against expected IPs
/// or subnets.
#[derive(Debug, Clone)]
pub struct DnsProbe {
    name: String,
    targets: Vec<IpNetwork>,
}

impl DnsProbe {
    pub const KIND: ProbeKind = ProbeKind {
        name: "dns",
        help: "DNS resolution check against given IPv4 (e.g. www.google.com=172.217.23.36) \
               NOTE: it is possible to use subnets as target using CIDR notation",
        parameters: &["name", "ips"],
        constructor: Self::build,
        parse_target: Self::parse_target,
    };

    pub fn new(name: impl Into<String>, targets: Vec<IpNetwork>) -> Self {
        Self {
            name: name.into(),
            targets,
        }
    }

    fn build(args: ProbeArgs) -> Result<Box<dyn Probe>, RegistryError> {
        let name = args.required_str("name")?;
        let targets = args
            .string_list("ips")?
            .iter()
            .map(|raw| {
                raw.parse::<IpNetwork>()
                    .map_err(|e| args.invalid("ips", format!("'{}': {}", raw, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Box::new(Self::new(name, targets)))
    }

    fn parse_target(literal: &str) -> Result<serde_yaml::Mapping, String> {
        let (name, ips) = match literal.split_once('=') {
            Some((name, ips)) => (name.trim(), ips),
            None => (literal.trim(), ""),
        };
        if name.is_empty() {
            return Err("missing name".to_string());
        }

        let mut targets = Vec::new();
        for ip in ips.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            ip.parse::<IpNetwork>()
                .map_err(|e| format!("'{}' is not an address or subnet ({})", ip, e))?;
            targets.push(Value::String(ip.to_string()));
        }

        Ok(arg_map([
            ("name", Value::String(name.to_string())),
            ("ips", Value::Sequence(targets)),
        ]))
    }

    fn target_list(&self) -> String {
        self.targets
            .iter()
            .map(display_target)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn has_subnet(&self) -> bool {
        self.targets.iter().any(|t| t.prefix() < max_prefix(t))
    }

    /// Classify a resolved address against the configured targets.
    fn classify(&self, ip: IpAddr) -> CheckResult {
        let name = &self.name;
        if self.targets.is_empty() {
            return CheckResult::ok(format!("DNS resolution for '{}' returned ip '{}'", name, ip));
        }

        let target = self.target_list();
        let matched = self.targets.iter().any(|t| t.contains(ip));
        match (self.has_subnet(), matched) {
            (true, true) => CheckResult::ok(format!(
                "DNS resolution for '{}' returned ip '{}' in expected subnet '{}'",
                name, ip, target
            )),
            (true, false) => CheckResult::err(format!(
                "DNS resolution for '{}' did not return ip '{}' in expected subnet '{}'",
                name, ip, target
            )),
            (false, true) => CheckResult::ok(format!(
                "DNS resolution for '{}' returned expected ip '{}'",
                name, ip
            )),
            (false, false) => CheckResult::err(format!(
                "DNS resolution for '{}' did not return expected ip '{}' but '{}'",
                name, target, ip
            )),
        }
    }
}

fn max_prefix(network: &IpNetwork) -> u8 {
    match network {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    }
}

fn display_target(network: &IpNetwork) -> String {
    if network.prefix() == max_prefix(network) {
        network.ip().to_string()
    } else {
        network.to_string()
    }
}

impl Probe for DnsProbe {
    fn invoke(&self) -> CheckResult {
        let resolved = match (self.name.as_str(), 0).to_socket_addrs() {
            Ok(addrs) => addrs.map(|a| a.ip()).collect::<Vec<_>>(),
            Err(e) => {
                return CheckResult::err(format!(
                    "DNS resolution for '{}' failed ({})",
                    self.name, e
                ));
            }
        };

        let ip = resolved
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| resolved.first())
            .copied();
        match ip {
            Some(ip) => self.classify(ip),
            None => CheckResult::err(format!(
                "DNS resolution for '{}' returned no address",
                self.name
            )),
        }
    }

    fn labels(&self) -> Labels {
        labels([("name", self.name.clone())])
    }
}
