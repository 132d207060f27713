//! Load-routine builder.
//!
//! One `<Class>_load.cpp` per emitted class: includes, then a `load()` body
//! that expands the parameter macro (matched classes only) and constructs
//! and wires the class's children per the hierarchy.

use emugen_hierarchy::HierarchyNode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStmt {
    /// Heap-allocate one instance, assign it to the container field and
    /// load it.
    AssignSingleton { container: String, child: String },
    /// Heap-allocate one element, load it and append it to the container
    /// sequence. `index` numbers collection elements within one load body.
    AppendElement {
        container: String,
        child: String,
        index: usize,
    },
}

pub struct LoadUnit {
    pub class: String,
    pub includes: Vec<String>,
    /// False for structural-only classes, which have no resolved
    /// attributes to assign.
    pub expand_params: bool,
    pub stmts: Vec<LoadStmt>,
}

impl LoadUnit {
    pub fn file_name(&self) -> String {
        format!("{}_load.cpp", self.class)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for include in &self.includes {
            out.push_str(&format!("#include \"{include}\"\n"));
        }
        out.push_str(&format!("void {}::load() {{\n", self.class));
        if self.expand_params {
            out.push_str(&format!("    {}_SET_PARAMS\n", self.class));
        }
        for stmt in &self.stmts {
            match stmt {
                LoadStmt::AssignSingleton { container, child } => {
                    out.push_str(&format!("    {container} = new {child}();\n"));
                    out.push_str(&format!("    {container}->load();\n"));
                }
                LoadStmt::AppendElement {
                    container,
                    child,
                    index,
                } => {
                    out.push_str(&format!("    {child}* {child}_obj{index} = new {child};\n"));
                    out.push_str(&format!("    {child}_obj{index}->load();\n"));
                    out.push_str(&format!("    {container}.push_back({child}_obj{index});\n"));
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

/// Turn child descriptors into load statements, in document order. Children
/// without a container field are structural only and produce nothing; the
/// element index counts collection children only.
pub fn child_statements(children: &[HierarchyNode]) -> Vec<LoadStmt> {
    let mut stmts = Vec::new();
    let mut index = 0;
    for node in children {
        let Some(container) = &node.container else {
            continue;
        };
        if node.is_collection {
            stmts.push(LoadStmt::AppendElement {
                container: container.clone(),
                child: node.child.clone(),
                index,
            });
            index += 1;
        } else {
            stmts.push(LoadStmt::AssignSingleton {
                container: container.clone(),
                child: node.child.clone(),
            });
        }
    }
    stmts
}
