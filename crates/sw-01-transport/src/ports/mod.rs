//! Ports layer.

pub mod launcher;

pub use launcher::{BoxedReader, BoxedWriter, ExitReason, KillSwitch, LaunchedProcess, Launcher};
