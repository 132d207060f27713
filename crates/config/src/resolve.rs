// EmuGen - Emulator Configuration Code Generator
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Attribute inheritance resolution.
//!
//! `resolve` merges the attribute sets of a class's ancestors in
//! base-declaration order (each later base overwriting earlier ones) and
//! applies the class's own attributes last. Results are memoized, so shared
//! ancestors in diamond shapes are computed once. A base-inheritance cycle
//! is a fatal configuration error.

use crate::{AttrMap, ClassDef, ModelError};
use indexmap::IndexMap;
use std::collections::HashMap;

pub struct Resolver {
    classes: IndexMap<String, ClassDef>,
    memo: HashMap<String, AttrMap>,
}

impl Resolver {
    pub fn new(classes: &[ClassDef]) -> Self {
        let mut map = IndexMap::new();
        for class in classes {
            map.insert(class.name.clone(), class.clone());
        }
        Self {
            classes: map,
            memo: HashMap::new(),
        }
    }

    /// Fully merged attribute set for `name`. Undefined names resolve to an
    /// empty set rather than failing, so partially specified models still
    /// generate output.
    pub fn resolve(&mut self, name: &str) -> Result<AttrMap, ModelError> {
        let mut stack = Vec::new();
        self.resolve_inner(name, &mut stack)
    }

    /// Resolve every defined class, in model order.
    pub fn resolve_all(&mut self) -> Result<IndexMap<String, AttrMap>, ModelError> {
        let names: Vec<String> = self.classes.keys().cloned().collect();
        let mut resolved = IndexMap::with_capacity(names.len());
        for name in names {
            let attrs = self.resolve(&name)?;
            resolved.insert(name, attrs);
        }
        Ok(resolved)
    }

    fn resolve_inner(&mut self, name: &str, stack: &mut Vec<String>) -> Result<AttrMap, ModelError> {
        if let Some(merged) = self.memo.get(name) {
            return Ok(merged.clone());
        }
        if stack.iter().any(|n| n == name) {
            let mut chain = stack.clone();
            chain.push(name.to_string());
            return Err(ModelError::InheritanceCycle { chain });
        }

        let Some(class) = self.classes.get(name) else {
            tracing::warn!(class = name, "undefined base class resolves to an empty attribute set");
            self.memo.insert(name.to_string(), AttrMap::new());
            return Ok(AttrMap::new());
        };
        let bases = class.bases.clone();
        let own = class.attributes.clone();

        stack.push(name.to_string());
        let mut merged = AttrMap::new();
        for base in &bases {
            for (attr, value) in self.resolve_inner(base, stack)? {
                merged.insert(attr, value);
            }
        }
        stack.pop();

        for (attr, value) in own {
            merged.insert(attr, value);
        }
        self.memo.insert(name.to_string(), merged.clone());
        Ok(merged)
    }
}
