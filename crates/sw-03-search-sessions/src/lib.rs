//! # SW-03 Search Sessions
//!
//! Server-side paging for search results. The first request runs the search
//! and caches the complete ranked list; later requests present an opaque
//! cursor and are served from the cache.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`)
//!   - `SearchParams`: what was searched, hashed into every cursor
//!   - `PageRequest` / `PageOptions`: page size and snippet rendering
//!   - `Cursor`: base64 of compact JSON, version 1
//!   - `SearchSession` / `SearchPage` / `SessionStats`
//!   - `snippet`: per-result truncation and the page byte ceiling
//!
//! - **Service Layer** (`service.rs`)
//!   - `SessionStore`: create, page, sweep, evict
//!
//! ## Cursor rules
//!
//! A cursor is accepted only if it decodes, has version 1, is younger than
//! the TTL, names a live session, and carries the parameter hash of both the
//! current request and the stored session. Every later page uses the page
//! size of the first one.
//!
//! ## Usage Example
//!
//! ```ignore
//! let store = Arc::new(SessionStore::new(SessionConfig::default())?);
//! let _sweeper = store.spawn_sweeper();
//!
//! let page = store
//!     .paginate(params, &request, |p| backend.search(p))
//!     .await?;
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod domain;
pub mod error;
pub mod service;

pub use domain::{
    Cursor, PageOptions, PageRequest, SearchPage, SearchParams, SearchSession, SessionConfig,
    SessionConfigError, SessionStats, CURSOR_VERSION, SNIPPET_OMITTED,
};
pub use error::{validate_page_size, validate_threshold, SessionError, ValidationError};
pub use service::{PaginateError, SessionStore};
