//! Filtered keyword arguments handed to a probe constructor.

use serde_yaml::{Mapping, Value};
use std::time::Duration;

use super::registry::RegistryError;

/// Python-style truthiness: null, `false`, zero, and empty strings,
/// sequences or mappings are falsy.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        Value::Tagged(tagged) => is_falsy(&tagged.value),
    }
}

/// Arguments of one probe instance, restricted to the parameters its kind
/// declares and stripped of falsy values.
#[derive(Debug, Clone, Default)]
pub struct ProbeArgs {
    probe: &'static str,
    values: Mapping,
}

impl ProbeArgs {
    /// Keep only declared, truthy entries of `merged`.
    pub fn filter(probe: &'static str, merged: &Mapping, parameters: &[&str]) -> Self {
        let mut values = Mapping::new();
        for name in parameters {
            if let Some(value) = merged.get(*name)
                && !is_falsy(value)
            {
                values.insert(Value::String((*name).to_string()), value.clone());
            }
        }
        Self { probe, values }
    }

    pub fn probe(&self) -> &'static str {
        self.probe
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing(&self, key: &str) -> RegistryError {
        RegistryError::MissingArgument {
            probe: self.probe.to_string(),
            argument: key.to_string(),
        }
    }

    pub fn invalid(&self, key: &str, message: impl Into<String>) -> RegistryError {
        RegistryError::InvalidArgument {
            probe: self.probe.to_string(),
            argument: key.to_string(),
            message: message.into(),
        }
    }

    pub fn str(&self, key: &str) -> Result<Option<String>, RegistryError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => scalar_to_string(value)
                .map(Some)
                .ok_or_else(|| self.invalid(key, "expected a scalar value")),
        }
    }

    pub fn required_str(&self, key: &str) -> Result<String, RegistryError> {
        self.str(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn u16(&self, key: &str) -> Result<Option<u16>, RegistryError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value_to_u16(value)
                .map(Some)
                .ok_or_else(|| self.invalid(key, "expected an integer between 1 and 65535")),
        }
    }

    pub fn required_u16(&self, key: &str) -> Result<u16, RegistryError> {
        self.u16(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn u32(&self, key: &str) -> Result<Option<u32>, RegistryError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => {
                let parsed = match value {
                    Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                };
                parsed
                    .map(Some)
                    .ok_or_else(|| self.invalid(key, "expected a positive integer"))
            }
        }
    }

    pub fn f64(&self, key: &str) -> Result<Option<f64>, RegistryError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => {
                let parsed = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                };
                match parsed {
                    Some(secs) if secs.is_finite() && secs > 0.0 => Ok(Some(secs)),
                    _ => Err(self.invalid(key, "expected a positive number of seconds")),
                }
            }
        }
    }

    /// A positive number of seconds as a [`Duration`], or `default_secs`
    /// when absent. Values too large for a `Duration` are rejected.
    pub fn duration(&self, key: &str, default_secs: f64) -> Result<Duration, RegistryError> {
        let secs = self.f64(key)?.unwrap_or(default_secs);
        Duration::try_from_secs_f64(secs)
            .map_err(|e| self.invalid(key, format!("'{}' seconds is out of range ({})", secs, e)))
    }

    /// Falsy values were filtered out, so presence alone means `true`
    /// unless the value is the string `"false"`.
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            None => false,
            Some(Value::String(s)) => !s.eq_ignore_ascii_case("false"),
            Some(_) => true,
        }
    }

    /// A sequence of scalars, or a single comma-separated string.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, RegistryError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| {
                    scalar_to_string(item)
                        .ok_or_else(|| self.invalid(key, "expected a list of scalar values"))
                })
                .collect(),
            Some(value) => {
                let joined = scalar_to_string(value)
                    .ok_or_else(|| self.invalid(key, "expected a list or a string"))?;
                Ok(split_list(&joined))
            }
        }
    }

    pub fn u16_list(&self, key: &str) -> Result<Vec<u16>, RegistryError> {
        let items = match self.get(key) {
            None => return Ok(Vec::new()),
            Some(Value::Sequence(items)) => items.clone(),
            Some(Value::String(s)) => split_list(s).into_iter().map(Value::String).collect(),
            Some(value) => vec![value.clone()],
        };
        items
            .iter()
            .map(|item| value_to_u16(item).ok_or_else(|| self.invalid(key, "expected status codes")))
            .collect()
    }

    /// A flat mapping of scalar keys to scalar values.
    pub fn string_map(&self, key: &str) -> Result<Vec<(String, String)>, RegistryError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Mapping(map)) => map
                .iter()
                .map(|(k, v)| match (scalar_to_string(k), scalar_to_string(v)) {
                    (Some(k), Some(v)) => Ok((k, v)),
                    _ => Err(self.invalid(key, "expected a mapping of scalar values")),
                })
                .collect(),
            Some(_) => Err(self.invalid(key, "expected a mapping")),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_u16(value: &Value) -> Option<u16> {
    let port = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    port.filter(|p| *p != 0)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
