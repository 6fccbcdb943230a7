/// Asset validation errors.
/// Raised before any remote call is made, so a failing document never
/// causes partial uploads.
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("asset at {location} is too large ({size} bytes). Limit is {limit}")]
    AssetTooLarge {
        location: String,
        size: usize,
        limit: usize,
    },
    #[error("asset at {location} has a malformed {mime} payload: {reason}")]
    MalformedPayload {
        location: String,
        mime: String,
        reason: String,
    },
    #[error("nothing to publish")]
    EmptyFileSet,
    #[error("file path {0:?} is not a clean repository-relative path")]
    InvalidPath(String),
    #[error("file path {0:?} appears more than once")]
    DuplicatePath(String),
}

/// Reject payloads whose decoded size exceeds `limit`.
pub fn validate_asset_size(location: &str, size: usize, limit: usize) -> Result<(), ValidationError> {
    if size > limit {
        return Err(ValidationError::AssetTooLarge {
            location: location.to_string(),
            size,
            limit,
        });
    }
    Ok(())
}

/// Validate a path the publisher is about to write.
///
/// Paths are relative, `/`-separated, and free of empty, `.` and `..`
/// segments.
pub fn validate_repo_path(path: &str) -> Result<(), ValidationError> {
    let clean = !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if clean {
        Ok(())
    } else {
        Err(ValidationError::InvalidPath(path.to_string()))
    }
}
