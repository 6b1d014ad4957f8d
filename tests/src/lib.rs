//! # Seekwire Test Suite
//!
//! End-to-end flows that run the real client stack against the real tool
//! server, connected through in-memory pipes instead of a subprocess.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # criterion benchmarks
//! └── src/integration/
//!     ├── harness.rs    # launchers, backends and fixtures
//!     ├── paging.rs     # cursor paging across the wire
//!     ├── lifecycle.rs  # spawn, handshake, death and respawn
//!     └── directory.rs  # the filesystem backend behind the client
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sw-tests
//! cargo bench -p sw-tests
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod integration;
