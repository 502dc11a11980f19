//! `${VAR}` expansion for configure arguments

use std::collections::BTreeMap;

/// Placeholder names a formula may use in `build.args`
pub const PLACEHOLDERS: &[&str] = &[
    "NAME",
    "VERSION",
    "PREFIX",
    "BIN",
    "LIB",
    "SOURCE_DIR",
    "BUILD_DIR",
    "JOBS",
];

/// Values substituted for placeholders, keyed by name
pub type PlaceholderVars = BTreeMap<&'static str, String>;

/// Expand every `${VAR}` whose name is in `vars`
///
/// Unknown names are left untouched; the parser rejects them up front.
#[must_use]
pub fn expand_placeholders(input: &str, vars: &PlaceholderVars) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match vars.get(name) {
                    Some(value) => result.push_str(value),
                    None => {
                        result.push_str("${");
                        result.push_str(name);
                        result.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}

/// Names referenced as `${VAR}` in `input`
pub(crate) fn referenced_names(input: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        names.push(&after[..end]);
        rest = &after[end + 1..];
    }
    names
}
