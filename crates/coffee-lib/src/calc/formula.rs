//! Formula reference extraction
//!
//! Calculated constant properties reference other constant properties by
//! writing their names in square brackets, e.g. `[PRICE] * [QUANTITY]`.
//! Names are upper-case letters, digits, and underscores.

use regex::Regex;
use std::sync::LazyLock;

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Z0-9_]+)\]").unwrap());

/// Names referenced by a formula, in order of first appearance
pub fn formula_references(formula: &str) -> Vec<String> {
    let mut references: Vec<String> = Vec::new();
    for capture in REFERENCE_PATTERN.captures_iter(formula) {
        let name = &capture[1];
        if !references.iter().any(|existing| existing == name) {
            references.push(name.to_string());
        }
    }
    references
}

/// Whether a formula contains anything worth evaluating
pub fn is_blank(formula: Option<&str>) -> bool {
    formula.is_none_or(|f| f.trim().is_empty())
}

#[cfg(test)]
mod tests {
    include!("formula.test.rs");
}
