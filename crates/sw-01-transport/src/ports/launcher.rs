//! Outbound port: starting the subprocess.
//!
//! The transport never touches `tokio::process` directly. It asks a
//! [`Launcher`] for a [`LaunchedProcess`] (three byte streams, an exit future
//! and a kill switch) and drives everything else itself.

use crate::error::TransportError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Notify;

pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Normal exit with a status code.
    Code(i32),
    /// Terminated by a signal.
    Signal(i32),
    /// The status could not be determined.
    Unknown(String),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {}", code),
            Self::Signal(signal) => write!(f, "signal {}", signal),
            Self::Unknown(detail) => write!(f, "unknown status: {}", detail),
        }
    }
}

/// Asks the process to die. Firing before anyone waits is remembered.
#[derive(Debug, Clone, Default)]
pub struct KillSwitch {
    notify: Arc<Notify>,
}

impl KillSwitch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.notify.notify_one();
    }

    /// Resolves once [`KillSwitch::fire`] has been called.
    pub async fn fired(&self) {
        self.notify.notified().await;
    }
}

/// A running process as seen by the transport.
pub struct LaunchedProcess {
    pub pid: Option<u32>,
    pub stdin: BoxedWriter,
    pub stdout: BoxedReader,
    pub stderr: Option<BoxedReader>,
    /// Resolves when the process has ended.
    pub exit: BoxFuture<'static, ExitReason>,
    pub kill: KillSwitch,
}

impl fmt::Debug for LaunchedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchedProcess")
            .field("pid", &self.pid)
            .field("stderr", &self.stderr.is_some())
            .finish_non_exhaustive()
    }
}

/// Starts subprocesses (Driven Port).
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start a process for `generation`.
    async fn launch(&self, generation: u64) -> Result<LaunchedProcess, TransportError>;
}
