//! Configuration layer for pipecheck.
//!
//! Check definitions come from three sources: target flags on the command
//! line, a YAML document (file or stdin) and `Check` custom resources in
//! Kubernetes. This module loads and merges them into a flat list of
//! [`ProbeSpec`] plus the [`GlobalOptions`] applied to every probe.
//!
//! ## Layers
//! - `types`: spec, options and document types
//! - `merge`: recursive mapping merge
//! - `extract`: leaf walk over nested check mappings
//! - `loading`: YAML file and stdin loading
//! - `resolve`: source ordering and option layering

mod error;
mod extract;
mod loading;
mod merge;
mod resolve;
mod types;

pub use error::ConfigError;
pub use extract::{extract_keyed_leaves, extract_leaves, extract_specs, specs_from_list};
pub use loading::{STDIN_SOURCE, read_source};
pub use merge::{deep_merge, merge_all};
pub use resolve::{Resolved, cli_specs, resolve};
pub use types::{Document, GlobalOptions, ProbeSpec, TYPE_KEY};
