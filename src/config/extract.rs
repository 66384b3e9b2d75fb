//! Extraction of check definitions from nested YAML.
//!
//! A leaf is any mapping that carries a `type` key. The walk visits nested
//! mappings depth-first in document order and never descends into a leaf.

use serde_yaml::{Mapping, Value};

use super::merge::deep_merge;
use super::types::{ProbeSpec, TYPE_KEY};
use crate::probe::Registry;

fn is_leaf(mapping: &Mapping) -> bool {
    mapping.contains_key(TYPE_KEY)
}

/// Collect leaf mappings below `value`, including `value` itself.
pub fn extract_leaves(value: &Value) -> Vec<&Mapping> {
    let mut leaves = Vec::new();
    collect_leaves(value, &mut leaves);
    leaves
}

fn collect_leaves<'a>(value: &'a Value, out: &mut Vec<&'a Mapping>) {
    if let Value::Mapping(mapping) = value {
        if is_leaf(mapping) {
            out.push(mapping);
            return;
        }
        for child in mapping.values() {
            collect_leaves(child, out);
        }
    }
}

/// Leaves below `value` converted to specs.
pub fn extract_specs(value: &Value) -> Result<Vec<ProbeSpec>, String> {
    extract_leaves(value)
        .into_iter()
        .map(ProbeSpec::from_leaf)
        .collect()
}

/// Leaves keyed by the mapping key they were found under. A root that is
/// itself a leaf is keyed by `root_key`.
pub fn extract_keyed_leaves(root: &Mapping, root_key: &str) -> Mapping {
    let mut keyed = Mapping::new();
    if is_leaf(root) {
        keyed.insert(Value::from(root_key), Value::Mapping(root.clone()));
        return keyed;
    }
    collect_keyed(root, &mut keyed);
    keyed
}

fn collect_keyed(mapping: &Mapping, out: &mut Mapping) {
    for (key, value) in mapping {
        if let Value::Mapping(child) = value {
            if is_leaf(child) {
                let mut single = Mapping::new();
                single.insert(key.clone(), value.clone());
                deep_merge(out, &single);
            } else {
                collect_keyed(child, out);
            }
        }
    }
}

/// Specs from a `checks:` list. Each entry is either a leaf or a mapping of
/// probe type to a literal, a list of literals, or an argument mapping.
pub fn specs_from_list(entries: &[Value], registry: &Registry) -> Result<Vec<ProbeSpec>, String> {
    let mut specs = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let Value::Mapping(mapping) = entry else {
            return Err(format!("entry {} is not a mapping", index));
        };
        if is_leaf(mapping) {
            specs.push(ProbeSpec::from_leaf(mapping)?);
            continue;
        }
        for (kind, body) in mapping {
            let kind = kind
                .as_str()
                .ok_or_else(|| format!("entry {} has a non-string probe type", index))?;
            specs.extend(specs_for_kind(kind, body, registry)?);
        }
    }
    Ok(specs)
}

fn specs_for_kind(kind: &str, body: &Value, registry: &Registry) -> Result<Vec<ProbeSpec>, String> {
    match body {
        Value::Mapping(args) => Ok(vec![ProbeSpec::new(kind, args.clone())]),
        Value::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Value::Mapping(args) => Ok(ProbeSpec::new(kind, args.clone())),
                other => literal_spec(kind, other, registry),
            })
            .collect(),
        other => Ok(vec![literal_spec(kind, other, registry)?]),
    }
}

fn literal_spec(kind: &str, literal: &Value, registry: &Registry) -> Result<ProbeSpec, String> {
    let literal = match literal {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(format!("'{}' target must be a string, got {:?}", kind, other)),
    };
    let probe_kind = registry.lookup(kind).map_err(|e| e.to_string())?;
    probe_kind.target_spec(&literal).map_err(|e| e.to_string())
}
