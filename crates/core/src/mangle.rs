//! Target identifiers derived from verbs, fields and argument cases.
//!
//! Overloading is by argument case set: the same verb called with a
//! different set of cases is a different function.

use crate::morphology::Case;

/// Order arguments by case tag, the order parameters take in generated code.
pub fn sort_by_case<T>(items: &mut [(Case, T)]) {
    items.sort_by(|a, b| a.0.tag().cmp(b.0.tag()));
}

fn abbreviations(cases: &[Case]) -> String {
    let mut sorted = cases.to_vec();
    sorted.sort_by(|a, b| a.tag().cmp(b.tag()));
    sorted.iter().map(|c| c.abbreviation()).collect()
}

/// `verb_ABBRS` for procedures, `verb_ABBRS_SUBJ` for methods.
pub fn call_name(verb: &str, arg_cases: &[Case], subject: Option<Case>) -> String {
    let mut name = format!("{}_{}", verb, abbreviations(arg_cases));
    if let Some(s) = subject {
        name.push('_');
        name.push_str(s.abbreviation());
    }
    name
}

/// Accessor name of a field or field-backed function.
pub fn function_name(field: &str, arg: Option<Case>) -> String {
    match arg {
        Some(c) => format!("f_{}_{}", field, c.abbreviation()),
        None => format!("f_{}", field),
    }
}

pub fn comparison_name(adjective: &str) -> String {
    format!("c_{}", adjective)
}

/// Property key as seen from string contexts such as `obj["key"]`.
pub fn property_key(raw: &str) -> String {
    raw.replace('-', "_")
}

/// ASCII-safe identifier: hyphens become underscores and every other
/// non-ASCII character becomes a `\u` escape.
pub fn escape_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '-' => out.push('_'),
            c if c.is_ascii() => out.push(c),
            c if (c as u32) <= 0xFFFF => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
        }
    }
    out
}
