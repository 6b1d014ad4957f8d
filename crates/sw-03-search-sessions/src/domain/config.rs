//! Session store configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Sessions idle longer than this are expired.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(300);

/// Concurrent sessions before the least recently used one is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 100;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

pub const DEFAULT_SNIPPET_LENGTH: usize = 500;
pub const MAX_SNIPPET_LENGTH: usize = 2000;

/// Serialized page size above which snippets are shortened, then dropped.
pub const DEFAULT_MAX_PAGE_BYTES: usize = 256 * 1024;

/// Length snippets are cut to on the first truncation pass.
pub const MIN_SNIPPET_LENGTH: usize = 80;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionConfigError {
    #[error("ttl cannot be 0")]
    ZeroTtl,

    #[error("max_sessions must be at least 1")]
    ZeroMaxSessions,

    #[error("default_page_size {default} must be between 1 and max_page_size {max}")]
    PageSize { default: usize, max: usize },

    #[error("default_snippet_length {default} exceeds max_snippet_length {max}")]
    SnippetLength { default: usize, max: usize },

    #[error("sweep_interval cannot be 0")]
    ZeroSweepInterval,
}

/// Limits and timings for the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which a session is gone
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Session cap; admitting past it evicts the least recently accessed
    pub max_sessions: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub default_snippet_length: usize,
    pub max_snippet_length: usize,
    /// Byte ceiling for the serialized match list of one page; the payload
    /// envelope around it is not counted
    pub max_page_bytes: usize,
    /// How often the background sweep runs
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            default_snippet_length: DEFAULT_SNIPPET_LENGTH,
            max_snippet_length: MAX_SNIPPET_LENGTH,
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SessionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), SessionConfigError> {
        if self.ttl.is_zero() {
            return Err(SessionConfigError::ZeroTtl);
        }

        if self.max_sessions == 0 {
            return Err(SessionConfigError::ZeroMaxSessions);
        }

        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(SessionConfigError::PageSize {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }

        if self.default_snippet_length > self.max_snippet_length {
            return Err(SessionConfigError::SnippetLength {
                default: self.default_snippet_length,
                max: self.max_snippet_length,
            });
        }

        if self.sweep_interval.is_zero() {
            return Err(SessionConfigError::ZeroSweepInterval);
        }

        Ok(())
    }
}
