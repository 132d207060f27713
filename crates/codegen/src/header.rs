//! Parameter header builder.
//!
//! One `params_<Class>.h` per class: an include-guarded block of typed
//! constants (one per resolved attribute) followed by a function-like
//! `<Class>_SET_PARAMS` macro that assigns each attribute as a field on the
//! enclosing object.

use emugen_config::{AttrMap, AttrValue, CXX_HEADER_ATTR};

pub struct ParamHeader {
    class: String,
    attrs: Vec<(String, AttrValue)>,
}

impl ParamHeader {
    /// Build from a class's fully resolved attribute set. The header-path
    /// attribute is excluded from generated constants.
    pub fn new(class: &str, resolved: &AttrMap) -> Self {
        let attrs = resolved
            .iter()
            .filter(|(name, _)| name.as_str() != CXX_HEADER_ATTR)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            class: class.to_string(),
            attrs,
        }
    }

    pub fn file_name(&self) -> String {
        format!("params_{}.h", self.class)
    }

    pub fn render(&self) -> String {
        let guard = format!("PARAMS_{}_H", self.class.to_uppercase());
        let mut out = String::new();
        out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));

        for (attr, value) in &self.attrs {
            out.push_str(&const_decl(&format!("{}_{}", self.class, attr), value));
            out.push('\n');
        }
        out.push('\n');

        out.push_str(&format!("#define {}_SET_PARAMS \\\n", self.class));
        for (attr, value) in &self.attrs {
            match value {
                // Lists are assigned as an inline brace initializer rather
                // than referencing the constant array.
                AttrValue::IntList(items) => {
                    out.push_str(&format!("    {} = {{ {} }};\\\n", attr, join_ints(items)));
                }
                _ => {
                    out.push_str(&format!("    {} = {}_{};\\\n", attr, self.class, attr));
                }
            }
        }
        out.push('\n');

        out.push_str(&format!("#endif // {guard}\n"));
        out
    }
}

fn const_decl(name: &str, value: &AttrValue) -> String {
    match value {
        AttrValue::Int(v) => format!("static constexpr uint64_t {name} = {v};"),
        AttrValue::Float(v) => format!("static constexpr double {name} = {};", format_float(*v)),
        AttrValue::Str(v) => format!("static const std::string {name} = \"{v}\";"),
        AttrValue::Bool(v) => format!("static constexpr bool {name} = {v};"),
        AttrValue::IntList(items) => {
            format!("static constexpr int {name}[] = {{ {} }};", join_ints(items))
        }
        // The deliberate escape hatch: unresolved expression text is
        // emitted verbatim, uninterpreted.
        AttrValue::Unresolved(text) => format!("static constexpr auto {name} = {text};"),
    }
}

fn join_ints(items: &[i64]) -> String {
    items
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Integral floats keep a trailing `.0` so the constant stays a double
/// literal in the generated source.
fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}
