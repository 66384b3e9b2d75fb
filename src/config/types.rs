//! Configuration type definitions.

use serde_yaml::{Mapping, Value};

use super::merge::deep_merge;
use crate::probe::http::DEFAULT_HTTP_METHOD;
use crate::probe::ping::DEFAULT_PING_COUNT;
use crate::probe::tcp::DEFAULT_TCP_TIMEOUT;

/// Key that marks a mapping as a check definition.
pub const TYPE_KEY: &str = "type";

/// One check to run: a probe type name and its own arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSpec {
    pub kind: String,
    pub args: Mapping,
}

impl ProbeSpec {
    pub fn new(kind: impl Into<String>, args: Mapping) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }

    /// Build a spec from a leaf mapping carrying a `type` key. The `type`
    /// entry is not kept in `args`.
    pub fn from_leaf(leaf: &Mapping) -> Result<Self, String> {
        let kind = match leaf.get(TYPE_KEY) {
            Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
            Some(other) => return Err(format!("'type' must be a probe name, got {:?}", other)),
            None => return Err("missing 'type'".to_string()),
        };
        let args = leaf
            .iter()
            .filter(|(key, _)| key.as_str() != Some(TYPE_KEY))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Self { kind, args })
    }

    /// The spec as a leaf mapping, `type` first.
    pub fn to_leaf(&self) -> Mapping {
        let mut leaf = Mapping::new();
        leaf.insert(Value::from(TYPE_KEY), Value::from(self.kind.as_str()));
        for (key, value) in &self.args {
            leaf.insert(key.clone(), value.clone());
        }
        leaf
    }
}

/// Defaults applied to every check unless the check sets the same argument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalOptions(Mapping);

impl GlobalOptions {
    pub fn from_mapping(mapping: Mapping) -> Self {
        Self(mapping)
    }

    /// Built-in defaults: `tcp_timeout`, `http_method` and `ping_count`.
    pub fn builtin() -> Self {
        let mut mapping = Mapping::new();
        mapping.insert(Value::from("tcp_timeout"), Value::from(DEFAULT_TCP_TIMEOUT));
        mapping.insert(Value::from("http_method"), Value::from(DEFAULT_HTTP_METHOD));
        mapping.insert(Value::from("ping_count"), Value::from(DEFAULT_PING_COUNT));
        Self(mapping)
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(Value::from(key), value.into());
    }

    /// Layer `overlay` on top; its values win.
    pub fn merge(&mut self, overlay: &Mapping) {
        deep_merge(&mut self.0, overlay);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A parsed YAML check document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub options: Mapping,
    pub checks: Vec<ProbeSpec>,
}
