use crate::error::{StoreError, StoreResult};

/// Validate a document key.
///
/// A key is one or more `/`-separated segments. Each segment is non-empty,
/// is not `.` or `..`, and uses only ASCII alphanumerics, `-`, `_` and `.`.
pub fn validate(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(invalid(key, "key is empty"));
    }
    for segment in key.split('/') {
        validate_segment(key, segment)?;
    }
    Ok(())
}

/// Validate a listing prefix. The empty prefix denotes the top level.
pub fn validate_prefix(prefix: &str) -> StoreResult<()> {
    if prefix.is_empty() {
        return Ok(());
    }
    validate(prefix)
}

/// Join a prefix and a single-segment name into a key.
pub fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn validate_segment(key: &str, segment: &str) -> StoreResult<()> {
    if segment.is_empty() {
        return Err(invalid(key, "empty path segment"));
    }
    if segment == "." || segment == ".." {
        return Err(invalid(key, "relative path segment"));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid(key, &format!("forbidden character {c:?}")));
    }
    Ok(())
}

fn invalid(key: &str, reason: &str) -> StoreError {
    StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
