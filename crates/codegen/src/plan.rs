//! Emission planning.
//!
//! The hierarchy map is consumed into an owned two-phase plan before any
//! file is written: every discovered class takes (and removes) its
//! hierarchy entry, and whatever remains becomes the fallback set of
//! structural-only classes. The partition makes the exhaustive-and-
//! exclusive property checkable up front instead of relying on in-place
//! mutation during emission.

use emugen_config::ClassDef;
use emugen_hierarchy::{Hierarchy, HierarchyNode};

pub struct MatchedUnit {
    pub class: String,
    pub children: Vec<HierarchyNode>,
}

pub struct FallbackUnit {
    pub class: String,
    pub children: Vec<HierarchyNode>,
}

pub struct EmissionPlan {
    /// One unit per discovered class, in model order. Classes absent from
    /// the hierarchy get an empty child list; their load routine still
    /// assigns parameters.
    pub matched: Vec<MatchedUnit>,
    /// Hierarchy parents with no class definition, in document order.
    pub fallback: Vec<FallbackUnit>,
}

impl EmissionPlan {
    pub fn build(classes: &[ClassDef], hierarchy: Hierarchy) -> Self {
        let mut map = hierarchy.into_map();

        let matched = classes
            .iter()
            .map(|class| MatchedUnit {
                class: class.name.clone(),
                children: map.shift_remove(&class.name).unwrap_or_default(),
            })
            .collect();

        let fallback = map
            .into_iter()
            .map(|(class, children)| {
                tracing::debug!(class = %class, "structural-only class emitted via fallback pass");
                FallbackUnit { class, children }
            })
            .collect();

        Self { matched, fallback }
    }
}
