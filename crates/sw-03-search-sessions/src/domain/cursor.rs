//! Opaque pagination cursors.
//!
//! A cursor is base64 (standard alphabet, padded) of a compact JSON object.
//! Clients must treat it as opaque; only the store that issued it can read it.

use crate::error::SessionError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const CURSOR_VERSION: u32 = 1;

/// Page size assumed for cursors that predate `original_page_size`.
const LEGACY_PAGE_SIZE: usize = 50;

fn legacy_page_size() -> usize {
    LEGACY_PAGE_SIZE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub session_id: Uuid,
    /// Index of the first result on the page this cursor points at
    pub offset: usize,
    pub search_params_hash: String,
    /// Seconds since the Unix epoch when the cursor was issued
    pub timestamp: u64,
    pub version: u32,
    /// Page size of the first page; every later page reuses it
    #[serde(default = "legacy_page_size")]
    pub original_page_size: usize,
}

impl Cursor {
    #[must_use]
    pub fn new(
        session_id: Uuid,
        offset: usize,
        search_params_hash: impl Into<String>,
        original_page_size: usize,
    ) -> Self {
        Self {
            session_id,
            offset,
            search_params_hash: search_params_hash.into(),
            timestamp: unix_now(),
            version: CURSOR_VERSION,
            original_page_size,
        }
    }

    pub fn encode(&self) -> Result<String, SessionError> {
        let json = serde_json::to_vec(self).map_err(|e| SessionError::Encoding(e.to_string()))?;
        Ok(BASE64.encode(json))
    }

    pub fn decode(encoded: &str) -> Result<Self, SessionError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| SessionError::InvalidCursor(format!("not base64: {}", e)))?;

        let cursor: Self = serde_json::from_slice(&bytes)
            .map_err(|e| SessionError::InvalidCursor(format!("bad structure: {}", e)))?;

        if cursor.version != CURSOR_VERSION {
            return Err(SessionError::UnsupportedVersion(cursor.version));
        }
        if cursor.original_page_size == 0 {
            return Err(SessionError::InvalidCursor("page size is 0".to_string()));
        }
        Ok(cursor)
    }

    /// Seconds since issue; 0 if the clock went backwards.
    #[must_use]
    pub fn age_secs(&self) -> u64 {
        unix_now().saturating_sub(self.timestamp)
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
