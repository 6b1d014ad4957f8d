//! Domain layer: configuration, tool arguments, payloads and caches.

pub mod args;
pub mod catalog;
pub mod config;
pub mod payload;
pub mod stats_cache;

pub use catalog::{tool_catalog, INSTRUCTIONS};
pub use config::{ServerConfig, ServerConfigError, DEFAULT_STATS_CACHE_TTL, DEFAULT_TOP_K};
pub use stats_cache::StatsCache;
