//! HTTP request probe.

use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Method, Url, redirect};
use serde_yaml::Value;
use std::error::Error as StdError;
use std::time::Duration;

use super::registry::{ProbeKind, RegistryError};
use super::{CheckResult, Labels, Probe, ProbeArgs, arg_map, labels};

pub const DEFAULT_HTTP_METHOD: &str = "HEAD";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status codes accepted when `http_status` is not given: 200-207 and 300-307.
pub fn default_http_status() -> Vec<u16> {
    (200..208).chain(300..308).collect()
}

/// Sends one request to `url` and classifies the response.
///
/// Redirects are never followed, so a `301` is judged on its own status.
/// With `insecure`, a certificate failure is retried without verification
/// and a success on the retry is downgraded to a warning.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: Url,
    /// `url` exactly as configured, used for labels.
    target: String,
    method: Method,
    accepted: Vec<u16>,
    ca_certs: Option<String>,
    insecure: bool,
    headers: HeaderMap,
    content_regex: Option<String>,
    content_exact: Option<String>,
}

impl HttpProbe {
    pub const KIND: ProbeKind = ProbeKind {
        name: "http",
        help: "HTTP request checking on response status (not >=400)",
        parameters: &[
            "url",
            "http_status",
            "http_method",
            "ca_certs",
            "insecure",
            "http_headers",
            "content_regex",
            "content_exact",
        ],
        constructor: Self::build,
        parse_target: Self::parse_target,
    };

    pub fn new(url: Url) -> Self {
        Self {
            target: url.to_string(),
            url,
            method: Method::HEAD,
            accepted: default_http_status(),
            ca_certs: None,
            insecure: false,
            headers: HeaderMap::new(),
            content_regex: None,
            content_exact: None,
        }
    }

    fn build(args: ProbeArgs) -> Result<Box<dyn Probe>, RegistryError> {
        let raw_url = args.required_str("url")?;
        let url = Url::parse(&raw_url).map_err(|e| args.invalid("url", e.to_string()))?;
        let mut probe = Self::new(url);
        probe.target = raw_url;

        if let Some(method) = args.str("http_method")? {
            probe.method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|e| args.invalid("http_method", e.to_string()))?;
        }

        let accepted = args.u16_list("http_status")?;
        if !accepted.is_empty() {
            probe.accepted = accepted;
        }

        for (name, value) in args.string_map("http_headers")? {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| args.invalid("http_headers", format!("'{}': {}", name, e)))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| args.invalid("http_headers", format!("'{}': {}", name, e)))?;
            probe.headers.insert(header, value);
        }

        probe.ca_certs = args.str("ca_certs")?;
        probe.insecure = args.flag("insecure");
        probe.content_regex = args.str("content_regex")?;
        probe.content_exact = args.str("content_exact")?;
        Ok(Box::new(probe))
    }

    fn parse_target(literal: &str) -> Result<serde_yaml::Mapping, String> {
        let url = Url::parse(literal.trim()).map_err(|e| e.to_string())?;
        if !url.has_host() {
            return Err("expected an absolute URL with a host".to_string());
        }
        Ok(arg_map([("url", Value::String(literal.trim().to_string()))]))
    }

    fn client(&self, verify: bool) -> Result<Client, String> {
        let mut builder = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .default_headers(self.headers.clone());

        if let Some(path) = &self.ca_certs {
            let pem = std::fs::read(path).map_err(|e| format!("{}: {}", path, e))?;
            for cert in Certificate::from_pem_bundle(&pem).map_err(|e| error_chain(&e))? {
                builder = builder.add_root_certificate(cert);
            }
        }
        if !verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        builder.build().map_err(|e| error_chain(&e))
    }

    fn send(&self, verify: bool) -> Result<CheckResult, RequestError> {
        let client = self.client(verify).map_err(RequestError::Other)?;
        let response = client
            .request(self.method.clone(), self.url.clone())
            .send()
            .map_err(|e| {
                if is_certificate_error(&e) {
                    RequestError::Certificate(error_chain(&e))
                } else {
                    RequestError::Other(error_chain(&e))
                }
            })?;
        Ok(self.classify(response))
    }

    fn classify(&self, response: Response) -> CheckResult {
        let status = response.status().as_u16();
        let prefix = format!("HTTP {} to '{}' returned {}", self.method, self.url, status);
        if !self.accepted.contains(&status) {
            return CheckResult::err(prefix);
        }
        if self.content_regex.is_none() && self.content_exact.is_none() {
            return CheckResult::ok(prefix);
        }

        let body = match response.text() {
            Ok(body) => body,
            Err(e) => {
                return CheckResult::err(format!("{} but reading body failed ({})", prefix, e));
            }
        };
        match self.check_content(&body) {
            Ok(()) => CheckResult::ok(prefix),
            Err(reason) => CheckResult::err(format!("{} but {}", prefix, reason)),
        }
    }

    /// Both content checks must pass when both are configured.
    fn check_content(&self, body: &str) -> Result<(), String> {
        if let Some(pattern) = &self.content_regex {
            let re = Regex::new(&format!("^(?:{})", pattern))
                .map_err(|e| format!("content_regex '{}' is invalid ({})", pattern, e))?;
            if !re.is_match(body) {
                return Err(format!("content did not match regex '{}'", pattern));
            }
        }
        if let Some(expected) = &self.content_exact
            && body != expected
        {
            return Err("content did not match expected content".to_string());
        }
        Ok(())
    }
}

enum RequestError {
    Certificate(String),
    Other(String),
}

impl Probe for HttpProbe {
    fn invoke(&self) -> CheckResult {
        let cert_error = match self.send(true) {
            Ok(result) => return result,
            Err(RequestError::Other(e)) => {
                return CheckResult::err(format!(
                    "HTTP {} to '{}' failed ({})",
                    self.method, self.url, e
                ));
            }
            Err(RequestError::Certificate(e)) => e,
        };

        if !self.insecure {
            return CheckResult::err(format!(
                "HTTP {} to '{}' failed ({})",
                self.method, self.url, cert_error
            ));
        }

        tracing::debug!(url = %self.url, "certificate verification failed, retrying insecure");
        let retry = match self.send(false) {
            Ok(result) => result,
            Err(RequestError::Certificate(e) | RequestError::Other(e)) => CheckResult::err(format!(
                "HTTP {} to '{}' failed ({})",
                self.method, self.url, e
            )),
        };
        let message = format!(
            "{}. SSL Certificate verification failed on '{}' ({})",
            retry.message(),
            self.url,
            cert_error
        );
        if retry.is_err() {
            CheckResult::err(message)
        } else {
            CheckResult::warn(message)
        }
    }

    fn labels(&self) -> Labels {
        labels([("url", self.target.as_str())])
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn is_certificate_error(err: &dyn StdError) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.to_string().to_ascii_lowercase().contains("certificate") {
            return true;
        }
        current = e.source();
    }
    false
}
