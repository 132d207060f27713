// EmuGen - Emulator Configuration Code Generator
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Configuration model for the emulator code generator.
//!
//! The model is loaded from Python-like configuration sources: each source
//! file holds class definitions with ordered attribute assignments and
//! optional multi-base inheritance. [`load_model`] produces the flat list of
//! [`ClassDef`]s; [`Resolver`] merges inherited attributes per class.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod parse;
mod resolve;

pub use parse::parse_source;
pub use resolve::Resolver;

/// Reserved attribute naming the owning component's C++ header. Collected
/// into the header index, never emitted as a generated constant.
pub const CXX_HEADER_ATTR: &str = "cxx_header";

/// Attribute mapping in declaration order. Overwriting an existing key keeps
/// its original position, matching the source-order semantics of the
/// configuration language.
pub type AttrMap = IndexMap<String, AttrValue>;

/// A configuration attribute value.
///
/// Values are statically evaluated where possible. Anything that is neither
/// a literal nor a resolvable cross-class reference is kept verbatim as
/// [`AttrValue::Unresolved`] and passed through to the generated source
/// uninterpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    IntList(Vec<i64>),
    Unresolved(String),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A single class-like configuration unit: name, ordered base list and
/// ordered attribute map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<String>,
    pub attributes: AttrMap,
}

impl ClassDef {
    /// The class's own declared `cxx_header`, if any. Inherited headers are
    /// only visible through the resolver.
    pub fn cxx_header(&self) -> Option<&str> {
        self.attributes.get(CXX_HEADER_ATTR).and_then(AttrValue::as_str)
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: {msg}", path.display())]
    Parse { path: PathBuf, line: usize, msg: String },
    #[error("inheritance cycle: {}", chain.join(" -> "))]
    InheritanceCycle { chain: Vec<String> },
}

fn read_source(path: &Path) -> Result<String, ModelError> {
    std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the full configuration model: every `*.py` file in `config_dir`
/// (lexicographic filename order) followed by the always-included primary
/// file.
///
/// A class name defined more than once keeps its first position in the model
/// but takes its definition from the last occurrence. Any file that fails to
/// parse aborts the load.
pub fn load_model(config_dir: &Path, primary: &Path) -> Result<Vec<ClassDef>, ModelError> {
    let mut sources = Vec::new();

    if let Ok(entries) = std::fs::read_dir(config_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "py") {
                sources.push(path);
            }
        }
    }
    sources.sort();

    let primary_canon = primary.canonicalize().ok();
    sources.retain(|p| p.canonicalize().ok() != primary_canon || primary_canon.is_none());
    sources.push(primary.to_path_buf());

    let mut merged: IndexMap<String, ClassDef> = IndexMap::new();
    for path in &sources {
        let text = read_source(path)?;
        for class in parse_source(path, &text)? {
            if merged.contains_key(&class.name) {
                tracing::warn!(class = %class.name, file = %path.display(),
                    "class redefined, later definition wins");
            }
            merged.insert(class.name.clone(), class);
        }
    }
    tracing::debug!(classes = merged.len(), files = sources.len(), "model loaded");
    Ok(merged.into_values().collect())
}
