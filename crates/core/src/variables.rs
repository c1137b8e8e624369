//! Template variable detection, substitution, and validation.
//!
//! A variable is a `{{identifier}}` token where the identifier matches
//! `[A-Za-z0-9_]+`. There is no nesting, no escaping, and no whitespace
//! tolerance inside the braces. Every function here is pure.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Regex pattern matching `{{variable}}` tokens in template bodies.
pub const VARIABLE_PATTERN: &str = r"\{\{([A-Za-z0-9_]+)\}\}";

/// Compiled regex for `{{variable}}` extraction. Compiled once, reused forever.
static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(VARIABLE_PATTERN).expect("valid regex"));

/// Lowercase letter immediately followed by an uppercase letter.
static CAMEL_BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Result of checking a body against a set of supplied values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableValidation {
    /// `true` iff `missing` is empty.
    pub complete: bool,
    /// Variables with no value or only a blank value, in first-appearance order.
    pub missing: Vec<String>,
}

/// One occurrence of a variable inside a body.
///
/// Offsets count characters (not bytes) from the start of the body;
/// `end_offset` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariablePosition {
    pub name: String,
    pub start_offset: usize,
    pub end_offset: usize,
    /// 1-based line on which the token starts.
    pub line_number: usize,
}

/// A form field derived from a variable, used to collect values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableField {
    pub name: String,
    pub label: String,
    pub required: bool,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract the distinct variable names from a body, in order of first appearance.
pub fn extract_variables(body: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in VARIABLE_RE.captures_iter(body) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Whether the body contains at least one variable token.
pub fn has_variables(body: &str) -> bool {
    VARIABLE_RE.is_match(body)
}

/// Count every variable occurrence, repeats included.
pub fn count_occurrences(body: &str) -> usize {
    VARIABLE_RE.find_iter(body).count()
}

/// Report the span and line of every variable occurrence, ordered by start offset.
pub fn variable_positions(body: &str) -> Vec<VariablePosition> {
    let mut positions = Vec::new();
    let mut scanned_bytes = 0;
    let mut chars_before = 0;
    let mut newlines_before = 0;

    for caps in VARIABLE_RE.captures_iter(body) {
        // Group 0 always exists for a successful match.
        let Some(token) = caps.get(0) else { continue };
        let skipped = &body[scanned_bytes..token.start()];
        chars_before += skipped.chars().count();
        newlines_before += skipped.matches('\n').count();
        scanned_bytes = token.start();

        let start_offset = chars_before;
        positions.push(VariablePosition {
            name: caps[1].to_string(),
            start_offset,
            end_offset: start_offset + token.as_str().chars().count(),
            line_number: newlines_before + 1,
        });
    }
    positions
}

// ---------------------------------------------------------------------------
// Substitution and validation
// ---------------------------------------------------------------------------

/// Substitute supplied values into a body.
///
/// A token is replaced only when `values` holds a non-empty string for its
/// name; otherwise the literal `{{name}}` stays in the output. Substituted
/// values are never re-scanned.
pub fn resolve(body: &str, values: &HashMap<String, String>) -> String {
    VARIABLE_RE
        .replace_all(body, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) if !value.is_empty() => value.clone(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

/// Check that every variable in the body has a non-blank value.
pub fn validate(body: &str, values: &HashMap<String, String>) -> VariableValidation {
    let missing: Vec<String> = extract_variables(body)
        .into_iter()
        .filter(|name| values.get(name).is_none_or(|value| value.trim().is_empty()))
        .collect();

    VariableValidation {
        complete: missing.is_empty(),
        missing,
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Turn a variable name into a display label.
///
/// `user_name` -> `User Name`, `firstName` -> `First Name`, `id` -> `Id`.
pub fn humanize_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let split = CAMEL_BOUNDARY_RE.replace_all(&spaced, "$1 $2");

    let mut label = String::with_capacity(split.len());
    let mut at_word_start = true;
    for c in split.chars() {
        let word_char = is_word_char(c);
        if at_word_start && word_char {
            label.push(c.to_ascii_uppercase());
        } else {
            label.push(c);
        }
        at_word_start = !word_char;
    }
    label
}

/// Build one required form field per distinct variable.
pub fn variable_schema(body: &str) -> Vec<VariableField> {
    extract_variables(body)
        .into_iter()
        .map(|name| VariableField {
            label: humanize_label(&name),
            name,
            required: true,
        })
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
