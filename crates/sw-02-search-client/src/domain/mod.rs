//! Domain layer: request options and reply parsing.

pub mod options;
pub mod transform;

pub use options::SearchOptions;
pub use transform::{HealthStatus, UNKNOWN_LANGUAGE};
