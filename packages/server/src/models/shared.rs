use std::collections::BTreeSet;

use crate::error::AppError;

/// Split `a,b , c` into its non-empty trimmed parts.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a comma-separated list of ids, keeping the first occurrence of each.
pub fn parse_ids(raw: &str) -> Result<Vec<i64>, AppError> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::new();
    for part in split_list(raw) {
        let id = part
            .parse::<i64>()
            .map_err(|_| AppError::WrongParams(format!("ids: '{part}' is not a valid id")))?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(AppError::WrongParams("ids: at least one id is required".into()));
    }
    Ok(ids)
}

/// Check the length of a string field, counted in characters.
pub fn validate_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::field(
            field,
            format!("size must be between {min} and {max}"),
        ));
    }
    Ok(())
}

pub fn validate_max_len(field: &str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    match value {
        Some(v) => validate_len(field, v, 0, max),
        None => Ok(()),
    }
}

/// Empty and blank optional strings mean "not provided".
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
