//! Production launcher over `tokio::process`.

use crate::domain::TransportConfig;
use crate::error::TransportError;
use crate::ports::{BoxedReader, ExitReason, KillSwitch, LaunchedProcess, Launcher};
use async_trait::async_trait;
use futures::FutureExt;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Spawns the configured program with piped stdio.
///
/// The child is owned by a supervisor task that waits for it to exit or for
/// the kill switch, whichever comes first. `kill_on_drop` covers the case
/// where the runtime shuts down under the supervisor.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    config: TransportConfig,
}

impl ProcessLauncher {
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .envs(&self.config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, generation: u64) -> Result<LaunchedProcess, TransportError> {
        let program = self.config.program.display().to_string();

        let mut child = self
            .command()
            .spawn()
            .map_err(|e| TransportError::Spawn(format!("{}: {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Spawn("stdin was not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Spawn("stdout was not piped".to_string()))?;
        let stderr = child.stderr.take();
        let pid = child.id();

        info!(generation = generation, pid = ?pid, program = %program, "Subprocess spawned");

        let kill = KillSwitch::new();
        let (exit_tx, exit_rx) = oneshot::channel();

        let supervisor_kill = kill.clone();
        tokio::spawn(async move {
            let reason = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => exit_reason(status),
                    Err(e) => ExitReason::Unknown(e.to_string()),
                },
                () = supervisor_kill.fired() => {
                    debug!(generation = generation, "Killing subprocess");
                    if let Err(e) = child.kill().await {
                        warn!(generation = generation, error = %e, "Kill failed");
                    }
                    match child.wait().await {
                        Ok(status) => exit_reason(status),
                        Err(e) => ExitReason::Unknown(e.to_string()),
                    }
                }
            };
            let _ = exit_tx.send(reason);
        });

        let exit = exit_rx
            .map(|received| {
                received.unwrap_or_else(|_| ExitReason::Unknown("supervisor dropped".to_string()))
            })
            .boxed();

        Ok(LaunchedProcess {
            pid,
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: stderr.map(|s| -> BoxedReader { Box::new(s) }),
            exit,
            kill,
        })
    }
}

fn exit_reason(status: ExitStatus) -> ExitReason {
    if let Some(code) = status.code() {
        return ExitReason::Code(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitReason::Signal(signal);
        }
    }

    ExitReason::Unknown(status.to_string())
}
