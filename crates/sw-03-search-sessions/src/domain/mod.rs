//! Domain layer: sessions, cursors, parameters and snippet shaping.

pub mod config;
pub mod cursor;
pub mod params;
pub mod session;
pub mod snippet;

pub use config::{SessionConfig, SessionConfigError};
pub use cursor::{Cursor, CURSOR_VERSION};
pub use params::{PageOptions, PageRequest, SearchParams};
pub use session::{SearchPage, SearchSession, SessionStats};
pub use snippet::{fit_to_budget, shape_snippets, truncate_snippet, BudgetFit, SNIPPET_OMITTED};
