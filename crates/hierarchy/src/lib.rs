// EmuGen - Emulator Configuration Code Generator
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Structural description loader.
//!
//! `layer.xml` describes which component embeds which children. Exactly two
//! top-level subtrees are walked: the first element whose tag matches the
//! CPU naming convention (its tag becomes the active CPU selection) and the
//! element literally named `CacheManager`, if present. Every other
//! top-level subtree is ignored. Traversal is purely structural; names are
//! matched against the class model only at emission time.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Tag of the optional second root subtree.
pub const CACHE_MANAGER_TAG: &str = "CacheManager";

#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("failed to read structural description {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed structural description: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("no top-level element matches the CPU naming convention")]
    NoCpuRoot,
}

/// One child descriptor under a parent component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
    /// Child component (class) name, taken from the element tag.
    pub child: String,
    /// Parent member receiving the child. `None` means the element is
    /// structural only and is not wired into the parent.
    pub container: Option<String>,
    /// True when a `type` marker is present: the container holds a sequence
    /// of children instead of a single instance.
    pub is_collection: bool,
}

/// Parent name to ordered child descriptors, plus the recorded CPU
/// selection.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    cpu: String,
    map: IndexMap<String, Vec<HierarchyNode>>,
}

impl Hierarchy {
    pub fn from_file(path: &Path) -> Result<Self, HierarchyError> {
        let text = std::fs::read_to_string(path).map_err(|source| HierarchyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_xml(&text)
    }

    pub fn from_xml(xml: &str) -> Result<Self, HierarchyError> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();

        let cpu = root
            .children()
            .filter(|n| n.is_element())
            .find(|n| n.tag_name().name().contains("CPU"))
            .ok_or(HierarchyError::NoCpuRoot)?;

        let mut map = IndexMap::new();
        collect(cpu, &mut map);

        if let Some(cache) = root
            .children()
            .filter(|n| n.is_element())
            .find(|n| n.tag_name().name() == CACHE_MANAGER_TAG)
        {
            collect(cache, &mut map);
        }

        let cpu = cpu.tag_name().name().to_string();
        tracing::debug!(cpu = %cpu, parents = map.len(), "hierarchy loaded");
        Ok(Self { cpu, map })
    }

    /// The active CPU selection, recorded for the generated selection
    /// record.
    pub fn cpu(&self) -> &str {
        &self.cpu
    }

    pub fn children(&self, parent: &str) -> Option<&[HierarchyNode]> {
        self.map.get(parent).map(Vec::as_slice)
    }

    pub fn contains(&self, parent: &str) -> bool {
        self.map.contains_key(parent)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Consume the hierarchy into its ordered parent map; the emitter
    /// partitions this into matched and fallback sets.
    pub fn into_map(self) -> IndexMap<String, Vec<HierarchyNode>> {
        self.map
    }
}

fn collect(node: roxmltree::Node, map: &mut IndexMap<String, Vec<HierarchyNode>>) {
    let parent = node.tag_name().name().to_string();
    for child in node.children().filter(|n| n.is_element()) {
        map.entry(parent.clone()).or_default().push(HierarchyNode {
            child: child.tag_name().name().to_string(),
            container: child.attribute("container").map(str::to_string),
            is_collection: child.attribute("type").is_some(),
        });
    }
    for child in node.children().filter(|n| n.is_element()) {
        collect(child, map);
    }
}
