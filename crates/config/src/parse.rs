// EmuGen - Emulator Configuration Code Generator
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Parser for the Python-like configuration sources.
//!
//! The accepted subset is deliberately small: `class Name(Base, ...):`
//! headers at the left margin and indented `attr = value` assignments.
//! Values are literals (integers, floats, strings, booleans, integer
//! lists), simple cross-class references (`Other.attr`), or anything else,
//! which is kept verbatim as an unresolved expression.
//!
//! Cross-class references need two passes because the referenced class may
//! be declared later in the same file: pass one collects every attribute
//! that is a plain literal, pass two substitutes references against that
//! scratch map and degrades the rest to unresolved text.

use crate::{AttrMap, AttrValue, ClassDef, ModelError};
use std::collections::HashMap;
use std::path::Path;

struct RawAssign {
    name: String,
    expr: String,
}

struct RawClass {
    name: String,
    bases: Vec<String>,
    assigns: Vec<RawAssign>,
}

/// Parse one configuration source file into class definitions, resolving
/// same-file cross-class attribute references.
pub fn parse_source(path: &Path, text: &str) -> Result<Vec<ClassDef>, ModelError> {
    let raw = scan_classes(path, text)?;

    // Pass 1: literal-only attributes, keyed by class name. A redefined
    // class resets its scratch entry.
    let mut scratch: HashMap<&str, HashMap<&str, AttrValue>> = HashMap::new();
    for class in &raw {
        let mut literals = HashMap::new();
        for assign in &class.assigns {
            if let Some(value) = parse_literal(&assign.expr) {
                literals.insert(assign.name.as_str(), value);
            }
        }
        scratch.insert(class.name.as_str(), literals);
    }

    // Pass 2: full attribute maps, substituting resolved references.
    let mut classes = Vec::with_capacity(raw.len());
    for class in &raw {
        let mut attributes = AttrMap::new();
        for assign in &class.assigns {
            let value = evaluate(&assign.expr, &scratch).unwrap_or_else(|| {
                tracing::warn!(class = %class.name, attr = %assign.name, expr = %assign.expr,
                    "attribute kept as unresolved expression");
                AttrValue::Unresolved(assign.expr.clone())
            });
            attributes.insert(assign.name.clone(), value);
        }
        classes.push(ClassDef {
            name: class.name.clone(),
            bases: class.bases.clone(),
            attributes,
        });
    }
    Ok(classes)
}

fn evaluate(expr: &str, scratch: &HashMap<&str, HashMap<&str, AttrValue>>) -> Option<AttrValue> {
    if let Some(value) = parse_literal(expr) {
        return Some(value);
    }
    let (class, attr) = parse_class_ref(expr)?;
    scratch.get(class)?.get(attr).cloned()
}

fn scan_classes(path: &Path, text: &str) -> Result<Vec<RawClass>, ModelError> {
    let mut classes = Vec::new();
    let mut current: Option<RawClass> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line = strip_comment(raw_line);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let indented = line.starts_with(' ') || line.starts_with('\t');
        if !indented {
            if let Some(done) = current.take() {
                classes.push(done);
            }
            if let Some(rest) = trimmed.strip_prefix("class ") {
                current = Some(parse_class_header(path, idx + 1, rest)?);
            }
            // Other top-level statements (imports and the like) carry no
            // model information and are skipped.
        } else if let Some(class) = current.as_mut() {
            if let Some(assign) = parse_assignment(trimmed) {
                class.assigns.push(assign);
            }
            // Non-assignment members (methods, docstrings) are skipped.
        }
    }
    if let Some(done) = current.take() {
        classes.push(done);
    }
    Ok(classes)
}

fn parse_class_header(path: &Path, line: usize, rest: &str) -> Result<RawClass, ModelError> {
    let fail = |msg: String| ModelError::Parse {
        path: path.to_path_buf(),
        line,
        msg,
    };

    let header = rest
        .trim()
        .strip_suffix(':')
        .ok_or_else(|| fail("expected ':' after class header".into()))?
        .trim();

    let (name, bases) = match header.split_once('(') {
        Some((name, bases)) => {
            let inner = bases
                .trim()
                .strip_suffix(')')
                .ok_or_else(|| fail("unterminated base list".into()))?;
            let bases: Vec<String> = inner
                .split(',')
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string)
                .collect();
            (name.trim(), bases)
        }
        None => (header, Vec::new()),
    };

    if !is_identifier(name) {
        return Err(fail(format!("invalid class name '{}'", name)));
    }
    for base in &bases {
        if !is_identifier(base) {
            return Err(fail(format!("invalid base class name '{}'", base)));
        }
    }
    Ok(RawClass {
        name: name.to_string(),
        bases,
        assigns: Vec::new(),
    })
}

fn parse_assignment(line: &str) -> Option<RawAssign> {
    let (lhs, rhs) = line.split_once('=')?;
    if rhs.starts_with('=') {
        return None; // comparison, not an assignment
    }
    let name = lhs.trim();
    let expr = rhs.trim();
    if !is_identifier(name) || expr.is_empty() {
        return None;
    }
    Some(RawAssign {
        name: name.to_string(),
        expr: expr.to_string(),
    })
}

/// Truncate at the first `#` that is not inside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '#') => return &line[..i],
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    line
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a directly evaluable literal, or `None` if the expression needs
/// cross-class resolution (or cannot be evaluated at all).
fn parse_literal(expr: &str) -> Option<AttrValue> {
    let s = expr.trim();
    match s {
        "True" => return Some(AttrValue::Bool(true)),
        "False" => return Some(AttrValue::Bool(false)),
        _ => {}
    }
    if let Some(v) = parse_int(s) {
        return Some(AttrValue::Int(v));
    }
    if let Some(v) = parse_float(s) {
        return Some(AttrValue::Float(v));
    }
    if let Some(v) = parse_str_literal(s) {
        return Some(AttrValue::Str(v));
    }
    if let Some(v) = parse_int_list(s) {
        return Some(AttrValue::IntList(v));
    }
    None
}

fn parse_int(s: &str) -> Option<i64> {
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, s),
    };
    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()?
    };
    Some(if neg { -value } else { value })
}

fn parse_float(s: &str) -> Option<f64> {
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        return None;
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }
    s.parse().ok()
}

fn parse_str_literal(s: &str) -> Option<String> {
    let mut chars = s.chars();
    let quote = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner = s.strip_prefix(quote)?.strip_suffix(quote)?;
    if inner.contains(quote) {
        return None;
    }
    Some(inner.to_string())
}

fn parse_int_list(s: &str) -> Option<Vec<i64>> {
    let inner = s.strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }
    inner.split(',').map(|item| parse_int(item.trim())).collect()
}

/// Recognize `Class.attr` cross-references. Anything with more dots or
/// non-identifier parts is not a reference.
fn parse_class_ref(expr: &str) -> Option<(&str, &str)> {
    let (class, attr) = expr.split_once('.')?;
    let (class, attr) = (class.trim(), attr.trim());
    (is_identifier(class) && is_identifier(attr)).then_some((class, attr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(text: &str) -> Vec<ClassDef> {
        parse_source(&PathBuf::from("test.py"), text).unwrap()
    }

    #[test]
    fn test_literals() {
        let classes = parse(
            r#"
class Cache:
    line_size = 64
    size = 0x40000000
    ratio = 1.5
    replace_method = "lru"
    enabled = True
    ways = [1, 2, 4]
"#,
        );
        assert_eq!(classes.len(), 1);
        let attrs = &classes[0].attributes;
        assert_eq!(attrs.get("line_size"), Some(&AttrValue::Int(64)));
        assert_eq!(attrs.get("size"), Some(&AttrValue::Int(0x40000000)));
        assert_eq!(attrs.get("ratio"), Some(&AttrValue::Float(1.5)));
        assert_eq!(attrs.get("replace_method"), Some(&AttrValue::Str("lru".into())));
        assert_eq!(attrs.get("enabled"), Some(&AttrValue::Bool(true)));
        assert_eq!(attrs.get("ways"), Some(&AttrValue::IntList(vec![1, 2, 4])));
    }

    #[test]
    fn test_bases_declaration_order() {
        let classes = parse("class D(B, C):\n    x = 1\n");
        assert_eq!(classes[0].bases, vec!["B", "C"]);
    }

    #[test]
    fn test_no_bases_forms() {
        let classes = parse("class A:\n    x = 1\nclass B():\n    y = 2\n");
        assert!(classes[0].bases.is_empty());
        assert!(classes[1].bases.is_empty());
    }

    #[test]
    fn test_cross_class_reference_resolved_forward_and_backward() {
        let classes = parse(
            r#"
class Frontend:
    fetch_width = CPU.fetch_width

class CPU:
    fetch_width = 4

class Backend:
    fetch_width = CPU.fetch_width
"#,
        );
        assert_eq!(
            classes[0].attributes.get("fetch_width"),
            Some(&AttrValue::Int(4))
        );
        assert_eq!(
            classes[2].attributes.get("fetch_width"),
            Some(&AttrValue::Int(4))
        );
    }

    #[test]
    fn test_reference_to_unresolved_degrades_to_text() {
        // OtherClass.z is itself unresolved, so y keeps the reference text.
        let classes = parse(
            r#"
class OtherClass:
    z = some_call()

class User:
    y = OtherClass.z
"#,
        );
        assert_eq!(
            classes[1].attributes.get("y"),
            Some(&AttrValue::Unresolved("OtherClass.z".into()))
        );
    }

    #[test]
    fn test_unknown_expression_kept_verbatim() {
        let classes = parse("class A:\n    x = 1 << 20\n");
        assert_eq!(
            classes[0].attributes.get("x"),
            Some(&AttrValue::Unresolved("1 << 20".into()))
        );
    }

    #[test]
    fn test_duplicate_attribute_last_write_wins_keeps_position() {
        let classes = parse("class A:\n    x = 1\n    y = 2\n    x = 3\n");
        let attrs = &classes[0].attributes;
        assert_eq!(attrs.get("x"), Some(&AttrValue::Int(3)));
        let keys: Vec<_> = attrs.keys().collect();
        assert_eq!(keys, vec!["x", "y"]);
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let classes = parse(
            r#"
# class Ghost:
#     x = 1

class Real:  # trailing comment
    path = "a#b"  # hash inside string is kept
    x = 2
"#,
        );
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name, "Real");
        assert_eq!(classes[0].attributes.get("path"), Some(&AttrValue::Str("a#b".into())));
        assert_eq!(classes[0].attributes.get("x"), Some(&AttrValue::Int(2)));
    }

    #[test]
    fn test_non_assignment_members_skipped() {
        let classes = parse(
            r#"
class A:
    """doc"""
    x = 1
    def load(self):
        pass
"#,
        );
        assert_eq!(classes[0].attributes.len(), 1);
    }

    #[test]
    fn test_negative_and_hex_integers() {
        let classes = parse("class A:\n    a = -5\n    b = 0x10\n");
        assert_eq!(classes[0].attributes.get("a"), Some(&AttrValue::Int(-5)));
        assert_eq!(classes[0].attributes.get("b"), Some(&AttrValue::Int(16)));
    }

    #[test]
    fn test_malformed_header_is_fatal() {
        let err = parse_source(&PathBuf::from("bad.py"), "class Broken(\n    x = 1\n");
        assert!(err.is_err());
        let err = parse_source(&PathBuf::from("bad.py"), "class 3Name:\n    x = 1\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_top_level_statement_ends_class_body() {
        let classes = parse("class A:\n    x = 1\nimport os\nclass B:\n    y = 2\n");
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].attributes.len(), 1);
    }
}
