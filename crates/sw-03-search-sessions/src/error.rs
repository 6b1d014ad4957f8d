//! Error types for the session layer.

use thiserror::Error;
use uuid::Uuid;

/// A paging request that cannot be served from the session cache.
///
/// Every variant means the caller should start the search over without a
/// cursor.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Unsupported cursor version {0}")]
    UnsupportedVersion(u32),

    #[error("Session {0} not found or expired")]
    NotFound(Uuid),

    #[error("Session {0} has expired")]
    Expired(Uuid),

    #[error("Cursor has expired")]
    CursorExpired,

    #[error("Search parameters changed since the cursor was issued")]
    ParamsMismatch,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to encode cursor: {0}")]
    Encoding(String),
}

impl SessionError {
    /// Label for the eviction / rejection metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCursor(_) | Self::UnsupportedVersion(_) => "invalid_cursor",
            Self::NotFound(_) => "not_found",
            Self::Expired(_) | Self::CursorExpired => "expired",
            Self::ParamsMismatch => "params_mismatch",
            Self::Validation(_) => "validation",
            Self::Encoding(_) => "encoding",
        }
    }
}

/// A request parameter outside its allowed range.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("page_size {value} is out of range (must be between 1 and {max})")]
    PageSize { value: usize, max: usize },

    #[error("threshold {value} is out of range (must be between 0.0 and 1.0)")]
    Threshold { value: f32 },

    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Check a requested page size against `[1, max]`.
pub fn validate_page_size(value: usize, max: usize) -> Result<usize, ValidationError> {
    if value == 0 || value > max {
        return Err(ValidationError::PageSize { value, max });
    }
    Ok(value)
}

/// Check a similarity threshold against `[0, 1]`. NaN is rejected.
pub fn validate_threshold(value: f32) -> Result<f32, ValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::Threshold { value });
    }
    Ok(value)
}
