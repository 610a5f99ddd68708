//! Reference tokens inside formula text.
//!
//! A token is `$` followed by one or more ASCII digits and always spans the
//! whole digit run: `$12` is one token, never `$1` followed by `2`.
use crate::error::EngineError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[0-9]+").expect("token pattern is a valid regex"));
static WHOLE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$[0-9]+$").expect("token pattern is a valid regex"));

/// Every distinct token in `expression`.
pub fn extract_variables(expression: &str) -> HashSet<String> {
    TOKEN.find_iter(expression).map(|m| m.as_str().to_string()).collect()
}

pub fn is_token(candidate: &str) -> bool {
    WHOLE_TOKEN.is_match(candidate)
}

/// Replaces each token occurrence that has an entry in `mapping`.
///
/// Every key must itself be a token. The input is scanned once, so text
/// coming from a replacement (including any `$`) is never matched again.
pub fn substitute(
    expression: &str,
    mapping: &HashMap<String, String>,
) -> Result<String, EngineError> {
    if let Some(bad) = mapping.keys().find(|key| !is_token(key)) {
        return Err(EngineError::InvalidToken(bad.clone()));
    }
    let replaced = TOKEN.replace_all(expression, |caps: &Captures| match mapping.get(&caps[0]) {
        Some(replacement) => replacement.clone(),
        None => caps[0].to_string(),
    });
    Ok(replaced.into_owned())
}
