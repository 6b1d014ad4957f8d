//! # SW-02 Search Client
//!
//! Typed operations over the tool surface of a seekwire subprocess:
//! `search`, `index_status`, `reindex`, `default_ignore_content` and
//! `health_check`.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`)
//!   - `SearchOptions`: mode-specific tool arguments and local validation
//!   - `transform`: tool envelopes to typed records, with permissive defaults
//!
//! - **Ports Layer** (`ports/`)
//!   - `SearchApi`: inbound port implemented by the service
//!   - `RpcCaller`: outbound port to the JSON-RPC peer
//!
//! - **Adapters Layer** (`adapters/`)
//!   - `RpcCaller` for `sw_01_transport::Transport`
//!
//! - **Service Layer** (`service.rs`)
//!   - `SearchClient`: ensure, call, unwrap, transform
//!
//! ## Usage Example
//!
//! ```ignore
//! let client = SearchClient::new(Transport::with_process(config)?);
//! let options = SearchOptions::semantic("retry", ".").with_page_size(20);
//! let first = client.search(&options).await?;
//! if let Some(cursor) = first.next_cursor {
//!     let second = client.search(&options.next_page(cursor)).await?;
//! }
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{HealthStatus, SearchOptions, UNKNOWN_LANGUAGE};
pub use error::ClientError;
pub use ports::{RpcCaller, SearchApi};
pub use service::SearchClient;
