//! In-memory launcher.
//!
//! Each launch runs an async script against the far ends of three
//! `tokio::io::duplex` pipes instead of starting a real process. When the
//! script returns, its pipe ends are dropped, which looks to the transport
//! exactly like a process closing its stdio and exiting.

use crate::error::TransportError;
use crate::ports::{ExitReason, KillSwitch, LaunchedProcess, Launcher};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};
use shared_types::framing::{decode_line, encode_line};
use shared_types::{
    methods, InitializeParams, InitializeResult, Message, Notification, Request, RequestId,
    Response, RpcError,
};
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::sync::oneshot;
use tracing::debug;

const PIPE_CAPACITY: usize = 64 * 1024;

type Script = Arc<dyn Fn(u64, ScriptedPeer) -> BoxFuture<'static, ExitReason> + Send + Sync>;

/// Launcher whose "process" is an async closure.
pub struct MemoryLauncher {
    script: Script,
    spawns: AtomicU64,
}

impl MemoryLauncher {
    /// `script` receives the generation and the peer side of the pipes and
    /// returns how the fake process exits.
    pub fn new<F, Fut>(script: F) -> Self
    where
        F: Fn(u64, ScriptedPeer) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ExitReason> + Send + 'static,
    {
        Self {
            script: Arc::new(move |generation, peer| script(generation, peer).boxed()),
            spawns: AtomicU64::new(0),
        }
    }

    /// Launches performed so far.
    #[must_use]
    pub fn spawn_count(&self) -> u64 {
        self.spawns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Launcher for MemoryLauncher {
    async fn launch(&self, generation: u64) -> Result<LaunchedProcess, TransportError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);

        let (client_stdin, peer_stdin) = duplex(PIPE_CAPACITY);
        let (peer_stdout, client_stdout) = duplex(PIPE_CAPACITY);
        let (peer_stderr, client_stderr) = duplex(PIPE_CAPACITY);

        let peer = ScriptedPeer {
            generation,
            lines: BufReader::new(peer_stdin).lines(),
            stdout: peer_stdout,
            stderr: peer_stderr,
        };
        let script = (self.script)(generation, peer);

        let kill = KillSwitch::new();
        let supervisor_kill = kill.clone();
        let (exit_tx, exit_rx) = oneshot::channel();
        tokio::spawn(async move {
            let reason = tokio::select! {
                reason = script => reason,
                () = supervisor_kill.fired() => ExitReason::Signal(9),
            };
            debug!(generation = generation, reason = %reason, "Scripted peer finished");
            let _ = exit_tx.send(reason);
        });

        Ok(LaunchedProcess {
            pid: None,
            stdin: Box::new(client_stdin),
            stdout: Box::new(client_stdout),
            stderr: Some(Box::new(client_stderr)),
            exit: exit_rx
                .map(|r| r.unwrap_or_else(|_| ExitReason::Unknown("script panicked".into())))
                .boxed(),
            kill,
        })
    }
}

/// The subprocess side of an in-memory launch.
pub struct ScriptedPeer {
    generation: u64,
    lines: Lines<BufReader<DuplexStream>>,
    stdout: DuplexStream,
    stderr: DuplexStream,
}

impl ScriptedPeer {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Next well-formed message from the client, `None` at end of input.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            let line = self.lines.next_line().await.ok()??;
            match decode_line(&line) {
                Ok(Some(message)) => return Some(message),
                Ok(None) => continue,
                Err(e) => debug!(error = %e, "Scripted peer skipped a line"),
            }
        }
    }

    /// Next request, skipping notifications.
    pub async fn recv_request(&mut self) -> Option<Request> {
        loop {
            if let Message::Request(request) = self.recv().await? {
                return Some(request);
            }
        }
    }

    pub async fn send(&mut self, message: impl Into<Message>) -> io::Result<()> {
        let line = encode_line(&message.into())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        self.send_raw(&line).await
    }

    /// The peer's stdin and stdout, for running a real server loop as the
    /// process. Stderr is closed.
    pub fn into_pipes(self) -> (BufReader<DuplexStream>, DuplexStream) {
        (self.lines.into_inner(), self.stdout)
    }

    /// Write bytes verbatim, for feeding the client malformed input.
    pub async fn send_raw(&mut self, text: &str) -> io::Result<()> {
        self.stdout.write_all(text.as_bytes()).await?;
        self.stdout.flush().await
    }

    pub async fn reply(&mut self, id: RequestId, result: Value) -> io::Result<()> {
        self.send(Response::success(id, result)).await
    }

    pub async fn reply_error(&mut self, id: RequestId, error: RpcError) -> io::Result<()> {
        self.send(Response::failure(id, error)).await
    }

    pub async fn notify(&mut self, method: &str, params: Value) -> io::Result<()> {
        self.send(Notification::new(method, params)).await
    }

    pub async fn stderr_line(&mut self, line: &str) -> io::Result<()> {
        self.stderr.write_all(line.as_bytes()).await?;
        self.stderr.write_all(b"\n").await?;
        self.stderr.flush().await
    }

    /// Answer `initialize` and wait for `notifications/initialized`.
    ///
    /// Returns the client's initialize params, or `None` if the client went
    /// away or opened with something else.
    pub async fn accept_handshake(&mut self) -> Option<InitializeParams> {
        let request = self.recv_request().await?;
        if request.method != methods::INITIALIZE {
            return None;
        }
        let params: InitializeParams = serde_json::from_value(request.params).ok()?;

        let result = InitializeResult {
            protocol_version: params.protocol_version.clone(),
            capabilities: json!({"tools": {}}),
            server_info: shared_types::Implementation::new("scripted-peer", "0.0.0"),
            instructions: None,
        };
        self.reply(request.id, serde_json::to_value(result).ok()?)
            .await
            .ok()?;

        loop {
            match self.recv().await? {
                Message::Notification(n) if n.method == methods::INITIALIZED => {
                    return Some(params)
                }
                _ => continue,
            }
        }
    }

    /// Handshake, then answer every request with `handler` until the client
    /// disconnects. Exits with code 0.
    pub async fn serve<F>(mut self, mut handler: F) -> ExitReason
    where
        F: FnMut(&str, &Value) -> Result<Value, RpcError> + Send,
    {
        if self.accept_handshake().await.is_none() {
            return ExitReason::Code(1);
        }

        while let Some(message) = self.recv().await {
            let Message::Request(request) = message else {
                continue;
            };
            let sent = match handler(&request.method, &request.params) {
                Ok(result) => self.reply(request.id, result).await,
                Err(error) => self.reply_error(request.id, error).await,
            };
            if sent.is_err() {
                break;
            }
        }
        ExitReason::Code(0)
    }
}
