//! Adapters for the tool server's ports.

pub mod directory;

pub use directory::{default_exclude_patterns, DirectoryBackend};
