//! Recursive merge of YAML mappings.

use serde_yaml::{Mapping, Value};

/// Merge `overlay` into `base`. Where both hold a mapping under the same key
/// the merge recurses; otherwise the overlay value replaces the base value.
pub fn deep_merge(base: &mut Mapping, overlay: &Mapping) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Fold `layers` left to right; later layers win.
pub fn merge_all<'a, I>(layers: I) -> Mapping
where
    I: IntoIterator<Item = &'a Mapping>,
{
    let mut merged = Mapping::new();
    for layer in layers {
        deep_merge(&mut merged, layer);
    }
    merged
}
