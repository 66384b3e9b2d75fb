//! MySQL handshake probe.
//!
//! Connects to the server and reads the initial handshake packet without
//! authenticating.

use serde_yaml::Value;
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::registry::{ProbeKind, RegistryError};
use super::tcp::DEFAULT_TCP_TIMEOUT;
use super::{CheckResult, Labels, Probe, ProbeArgs, arg_map, labels, split_host_port};

pub const DEFAULT_MYSQL_PORT: u16 = 3306;

const PROTOCOL_V10: u8 = 10;
const ERR_PACKET: u8 = 0xff;
const MAX_GREETING_LEN: usize = 64 * 1024;

/// First packet a MySQL server sends after accepting a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Greeting {
    Handshake { version: String },
    Error { code: u16, message: String },
    Unsupported(u8),
}

/// Parse the payload of the greeting packet (without the 4-byte header).
pub fn parse_greeting(payload: &[u8]) -> Option<Greeting> {
    let (&first, rest) = payload.split_first()?;
    match first {
        PROTOCOL_V10 => {
            let end = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
            Some(Greeting::Handshake {
                version: String::from_utf8_lossy(&rest[..end]).into_owned(),
            })
        }
        ERR_PACKET if rest.len() >= 2 => {
            let code = u16::from_le_bytes([rest[0], rest[1]]);
            let mut message = &rest[2..];
            if message.first() == Some(&b'#') && message.len() >= 6 {
                message = &message[6..];
            }
            Some(Greeting::Error {
                code,
                message: String::from_utf8_lossy(message).into_owned(),
            })
        }
        other => Some(Greeting::Unsupported(other)),
    }
}

#[derive(Debug, Clone)]
pub struct MysqlProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl MysqlProbe {
    pub const KIND: ProbeKind = ProbeKind {
        name: "mysql",
        help: "MySQL server handshake check (e.g. db.local:3306)",
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
        let port = args.u16("port")?.unwrap_or(DEFAULT_MYSQL_PORT);
        let timeout = args.duration("tcp_timeout", DEFAULT_TCP_TIMEOUT)?;
        Ok(Box::new(Self::new(host, port, timeout)))
    }

    fn parse_target(literal: &str) -> Result<serde_yaml::Mapping, String> {
        let (host, port) = split_host_port(literal)?;
        Ok(match port {
            Some(port) => arg_map([
                ("host", Value::String(host)),
                ("port", Value::Number(port.into())),
            ]),
            None => arg_map([("host", Value::String(host))]),
        })
    }

    fn read_greeting(&self) -> io::Result<Vec<u8>> {
        let addrs = (self.host.as_str(), self.port).to_socket_addrs()?;
        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no address resolved");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(mut stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    let mut header = [0u8; 4];
                    stream.read_exact(&mut header)?;
                    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
                    let mut payload = vec![0u8; len.min(MAX_GREETING_LEN)];
                    stream.read_exact(&mut payload)?;
                    return Ok(payload);
                }
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }
}

impl Probe for MysqlProbe {
    fn invoke(&self) -> CheckResult {
        let endpoint = format!("{}:{}", self.host, self.port);
        let payload = match self.read_greeting() {
            Ok(payload) => payload,
            Err(e) => {
                return CheckResult::err(format!(
                    "MySQL connection failed on port {} for {} ({})",
                    self.port, self.host, e
                ));
            }
        };

        match parse_greeting(&payload) {
            Some(Greeting::Handshake { version }) => CheckResult::ok(format!(
                "MySQL server on {} ready (version {})",
                endpoint, version
            )),
            Some(Greeting::Error { code, message }) => CheckResult::err(format!(
                "MySQL server on {} refused connection ({}: {})",
                endpoint, code, message
            )),
            Some(Greeting::Unsupported(protocol)) => CheckResult::warn(format!(
                "MySQL server on {} sent unexpected protocol version {}",
                endpoint, protocol
            )),
            None => CheckResult::err(format!("MySQL server on {} sent an empty greeting", endpoint)),
        }
    }

    fn labels(&self) -> Labels {
        labels([("host", self.host.clone()), ("port", self.port.to_string())])
    }
}
