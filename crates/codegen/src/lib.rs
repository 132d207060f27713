// EmuGen - Emulator Configuration Code Generator
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Code emitter: combines the resolved configuration model with the
//! component hierarchy and writes the generated C++ initialization source
//! (parameter headers, load routines and the CPU selection record) into the
//! output directory.

use emugen_config::{AttrMap, AttrValue, ClassDef, CXX_HEADER_ATTR};
use emugen_hierarchy::Hierarchy;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

mod header;
mod load;
mod plan;

pub use header::ParamHeader;
pub use load::{child_statements, LoadStmt, LoadUnit};
pub use plan::{EmissionPlan, FallbackUnit, MatchedUnit};

/// File name of the generated selection record.
pub const SELECTION_RECORD: &str = "params_EMU.h";

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Class name to declared C++ header path, collected from the resolved
/// attribute sets (so an inherited `cxx_header` counts).
pub struct HeaderIndex {
    map: IndexMap<String, String>,
}

impl HeaderIndex {
    pub fn from_resolved(resolved: &IndexMap<String, AttrMap>) -> Self {
        let mut map = IndexMap::new();
        for (class, attrs) in resolved {
            match attrs.get(CXX_HEADER_ATTR) {
                Some(AttrValue::Str(path)) => {
                    map.insert(class.clone(), path.clone());
                }
                Some(_) => {
                    tracing::warn!(class = %class, "cxx_header is not a string, ignored");
                }
                None => {
                    tracing::warn!(class = %class, "class declares no cxx_header");
                }
            }
        }
        Self { map }
    }

    pub fn get(&self, class: &str) -> Option<&str> {
        self.map.get(class).map(String::as_str)
    }
}

/// The CPU selection record consumed by the runtime's top-level bootstrap.
pub fn selection_record(cpu: &str) -> String {
    format!(
        "#ifndef PARAMS_EMU_H\n\
         #define PARAMS_EMU_H\n\
         \n\
         static constexpr std::string CPU_NAME = \"{cpu}\";\n\
         #endif // PARAMS_EMU_H\n"
    )
}

pub struct Emitter {
    out_dir: PathBuf,
    include_dir: PathBuf,
}

impl Emitter {
    pub fn new(out_dir: impl Into<PathBuf>, include_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            include_dir: include_dir.into(),
        }
    }

    /// Emit every generated file. Returns the written paths, in emission
    /// order.
    pub fn emit(
        &self,
        classes: &[ClassDef],
        resolved: &IndexMap<String, AttrMap>,
        hierarchy: Hierarchy,
    ) -> Result<Vec<PathBuf>, EmitError> {
        std::fs::create_dir_all(&self.out_dir).map_err(|source| EmitError::CreateDir {
            path: self.out_dir.clone(),
            source,
        })?;

        let cpu = hierarchy.cpu().to_string();
        let headers = HeaderIndex::from_resolved(resolved);
        let empty = AttrMap::new();
        let mut written = Vec::new();

        for class in classes {
            let attrs = resolved.get(&class.name).unwrap_or(&empty);
            let param_header = ParamHeader::new(&class.name, attrs);
            written.push(self.write_file(&param_header.file_name(), &param_header.render())?);
        }

        let plan = EmissionPlan::build(classes, hierarchy);

        for unit in &plan.matched {
            let own_header = match headers.get(&unit.class) {
                Some(path) => path.to_string(),
                None => self.find_header(&unit.class),
            };
            let mut includes = vec![own_header, format!("params_{}.h", unit.class)];
            push_child_includes(&mut includes, &headers, unit.children.iter().map(|c| c.child.as_str()));

            let load = LoadUnit {
                class: unit.class.clone(),
                includes,
                expand_params: true,
                stmts: child_statements(&unit.children),
            };
            written.push(self.write_file(&load.file_name(), &load.render())?);
        }

        for unit in &plan.fallback {
            let mut includes = vec![self.find_header(&unit.class)];
            push_child_includes(&mut includes, &headers, unit.children.iter().map(|c| c.child.as_str()));

            let load = LoadUnit {
                class: unit.class.clone(),
                includes,
                expand_params: false,
                stmts: child_statements(&unit.children),
            };
            written.push(self.write_file(&load.file_name(), &load.render())?);
        }

        written.push(self.write_file(SELECTION_RECORD, &selection_record(&cpu))?);
        tracing::info!(files = written.len(), out_dir = %self.out_dir.display(), "emission complete");
        Ok(written)
    }

    /// Locate `<lowercase class>.h` in the include tree: depth-first walk
    /// in sorted order, first match wins, path relative to the include root
    /// with `/` separators. Falls back to the bare file name.
    fn find_header(&self, class: &str) -> String {
        let needle = format!("{}.h", class.to_lowercase());
        for entry in WalkDir::new(&self.include_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() && entry.file_name().to_string_lossy() == needle {
                let rel = entry
                    .path()
                    .strip_prefix(&self.include_dir)
                    .unwrap_or_else(|_| entry.path());
                return rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
            }
        }
        tracing::warn!(class = %class, header = %needle,
            "header not found in include tree, using bare name");
        needle
    }

    fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf, EmitError> {
        let path = self.out_dir.join(name);
        std::fs::write(&path, contents).map_err(|source| EmitError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Append each distinctly-named child's declared header, skipping children
/// with no index entry and paths already included.
fn push_child_includes<'a>(
    includes: &mut Vec<String>,
    headers: &HeaderIndex,
    children: impl Iterator<Item = &'a str>,
) {
    for child in children {
        match headers.get(child) {
            Some(path) => {
                if !includes.iter().any(|inc| inc == path) {
                    includes.push(path.to_string());
                }
            }
            None => {
                tracing::debug!(child = %child, "no declared header for child, include skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emugen_config::{load_model, Resolver};
    use tempfile::tempdir;

    fn demo_model(dir: &Path) -> (Vec<ClassDef>, IndexMap<String, AttrMap>) {
        let primary = dir.join("params.py");
        std::fs::write(
            &primary,
            r#"
class CPU:
    cxx_header = "cpu/cpu.h"
    fetch_width = 4

class AtomicCPU(CPU):
    cxx_header = "cpu/atomiccpu.h"

class ICache:
    cxx_header = "cache/icache.h"
    line_size = 64

class CacheManager:
    cxx_header = "cache/cachemanager.h"
"#,
        )
        .unwrap();
        let model = load_model(dir, &primary).unwrap();
        let resolved = Resolver::new(&model).resolve_all().unwrap();
        (model, resolved)
    }

    fn demo_hierarchy() -> Hierarchy {
        Hierarchy::from_xml(
            r#"<EMU>
                 <AtomicCPU>
                   <ICache container="icache_"/>
                   <BusMatrix container="bus_">
                     <ICache container="caches_" type="cache"/>
                     <ICache container="caches_" type="cache"/>
                   </BusMatrix>
                 </AtomicCPU>
                 <CacheManager/>
               </EMU>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_emit_writes_all_units_once() {
        let work = tempdir().unwrap();
        let out = work.path().join("obj");
        let (model, resolved) = demo_model(work.path());

        let emitter = Emitter::new(&out, work.path().join("inc"));
        let files = emitter.emit(&model, &resolved, demo_hierarchy()).unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        // One params header per class, one load unit per class plus the
        // fallback BusMatrix, one selection record.
        assert_eq!(
            names.iter().filter(|n| n.starts_with("params_")).count(),
            5 // 4 classes + params_EMU.h
        );
        assert_eq!(names.iter().filter(|n| n.ends_with("_load.cpp")).count(), 5);
        assert_eq!(names.iter().filter(|n| *n == "BusMatrix_load.cpp").count(), 1);
    }

    #[test]
    fn test_matched_unit_content() {
        let work = tempdir().unwrap();
        let out = work.path().join("obj");
        let (model, resolved) = demo_model(work.path());

        Emitter::new(&out, work.path().join("inc"))
            .emit(&model, &resolved, demo_hierarchy())
            .unwrap();

        let atomic = std::fs::read_to_string(out.join("AtomicCPU_load.cpp")).unwrap();
        assert!(atomic.starts_with("#include \"cpu/atomiccpu.h\"\n#include \"params_AtomicCPU.h\"\n"));
        assert!(atomic.contains("#include \"cache/icache.h\"\n"));
        assert!(atomic.contains("    AtomicCPU_SET_PARAMS\n"));
        assert!(atomic.contains("    icache_ = new ICache();\n    icache_->load();\n"));
        // BusMatrix has no declared header but is still wired in.
        assert!(atomic.contains("    bus_ = new BusMatrix();\n"));

        let params = std::fs::read_to_string(out.join("params_AtomicCPU.h")).unwrap();
        assert!(params.contains("static constexpr uint64_t AtomicCPU_fetch_width = 4;\n"));
        assert!(!params.contains("cxx_header"));
    }

    #[test]
    fn test_fallback_unit_content_and_header_search() {
        let work = tempdir().unwrap();
        let out = work.path().join("obj");
        let inc = work.path().join("inc");
        std::fs::create_dir_all(inc.join("bus")).unwrap();
        std::fs::write(inc.join("bus/busmatrix.h"), "// stub\n").unwrap();
        let (model, resolved) = demo_model(work.path());

        Emitter::new(&out, &inc)
            .emit(&model, &resolved, demo_hierarchy())
            .unwrap();

        let bus = std::fs::read_to_string(out.join("BusMatrix_load.cpp")).unwrap();
        assert!(bus.starts_with("#include \"bus/busmatrix.h\"\n"));
        assert!(bus.contains("#include \"cache/icache.h\"\n"));
        assert!(!bus.contains("SET_PARAMS"));
        assert!(bus.contains("    ICache* ICache_obj0 = new ICache;\n"));
        assert!(bus.contains("    ICache* ICache_obj1 = new ICache;\n"));
        assert!(bus.contains("    caches_.push_back(ICache_obj1);\n"));
    }

    #[test]
    fn test_fallback_header_bare_name_when_absent() {
        let work = tempdir().unwrap();
        let out = work.path().join("obj");
        let (model, resolved) = demo_model(work.path());

        // Include tree does not exist at all.
        Emitter::new(&out, work.path().join("inc"))
            .emit(&model, &resolved, demo_hierarchy())
            .unwrap();

        let bus = std::fs::read_to_string(out.join("BusMatrix_load.cpp")).unwrap();
        assert!(bus.starts_with("#include \"busmatrix.h\"\n"));
    }

    #[test]
    fn test_selection_record_content() {
        let work = tempdir().unwrap();
        let out = work.path().join("obj");
        let (model, resolved) = demo_model(work.path());

        Emitter::new(&out, work.path().join("inc"))
            .emit(&model, &resolved, demo_hierarchy())
            .unwrap();

        let emu = std::fs::read_to_string(out.join(SELECTION_RECORD)).unwrap();
        assert_eq!(
            emu,
            "#ifndef PARAMS_EMU_H\n\
             #define PARAMS_EMU_H\n\
             \n\
             static constexpr std::string CPU_NAME = \"AtomicCPU\";\n\
             #endif // PARAMS_EMU_H\n"
        );
    }

    #[test]
    fn test_child_includes_deduplicated() {
        let mut includes = vec!["cpu/cpu.h".to_string()];
        let mut resolved = IndexMap::new();
        let mut attrs = AttrMap::new();
        attrs.insert(
            CXX_HEADER_ATTR.to_string(),
            AttrValue::Str("cache/icache.h".into()),
        );
        resolved.insert("ICache".to_string(), attrs);
        let headers = HeaderIndex::from_resolved(&resolved);

        push_child_includes(&mut includes, &headers, ["ICache", "ICache", "Ghost"].into_iter());
        assert_eq!(includes, vec!["cpu/cpu.h", "cache/icache.h"]);
    }
}
