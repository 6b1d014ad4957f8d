//! Per-process I/O tasks.
//!
//! Every spawned process gets three tasks: a writer that owns stdin, a reader
//! that owns stdout and a drain for stderr. They share a [`ChannelContext`]
//! and never touch the transport's lifecycle lock.

use crate::domain::{GenerationHandle, PendingCalls};
use crate::error::TransportError;
use crate::ports::{BoxedReader, BoxedWriter, KillSwitch};
use serde_json::json;
use shared_bus::NotificationRouter;
use shared_types::framing::{decode_line, encode_line};
use shared_types::{methods, Message, Request, Response, RpcError};
use std::sync::Arc;
use sw_telemetry::metrics::PROTOCOL_ERRORS;
use sw_telemetry::SUBPROCESS_TARGET;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// One line queued for stdin.
///
/// `ack`, when present, learns whether the line reached the pipe.
#[derive(Debug)]
pub struct OutboundFrame {
    pub line: String,
    pub ack: Option<oneshot::Sender<Result<(), TransportError>>>,
}

impl OutboundFrame {
    #[must_use]
    pub fn new(line: String) -> Self {
        Self { line, ack: None }
    }

    /// Frame plus the receiver that reports its write.
    #[must_use]
    pub fn acknowledged(line: String) -> (Self, oneshot::Receiver<Result<(), TransportError>>) {
        let (tx, rx) = oneshot::channel();
        (Self { line, ack: Some(tx) }, rx)
    }
}

/// State shared by the tasks of one generation.
#[derive(Clone)]
pub struct ChannelContext {
    pub handle: Arc<GenerationHandle>,
    pub pending: Arc<PendingCalls>,
    pub router: Arc<NotificationRouter>,
    pub kill: KillSwitch,
}

impl ChannelContext {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.handle.generation()
    }

    /// Take this generation down: record the cause, fail its calls, kill it.
    pub fn fail(&self, error: TransportError) {
        self.handle.mark_down(error);
        let rejected = self
            .pending
            .reject_generation(self.generation(), &self.handle.down_error());
        if rejected > 0 {
            debug!(generation = self.generation(), rejected = rejected, "Rejected pending calls");
        }
        self.kill.fire();
    }
}

/// Drain `outbound` into stdin, one line per frame.
///
/// Ends when every sender is dropped, which closes stdin, or on the first
/// write error, which takes the generation down.
pub fn spawn_writer(
    ctx: ChannelContext,
    mut stdin: BoxedWriter,
    mut outbound: mpsc::Receiver<OutboundFrame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let written = async {
                stdin.write_all(frame.line.as_bytes()).await?;
                stdin.flush().await
            }
            .await;

            if let Err(e) = written {
                warn!(generation = ctx.generation(), error = %e, "Write to subprocess failed");
                let error = TransportError::Write(e.to_string());
                if let Some(ack) = frame.ack {
                    let _ = ack.send(Err(error.clone()));
                }
                ctx.fail(error);
                return;
            }
            trace!(generation = ctx.generation(), bytes = frame.line.len(), "Frame written");
            if let Some(ack) = frame.ack {
                let _ = ack.send(Ok(()));
            }
        }
        debug!(generation = ctx.generation(), "Outbound queue closed, closing stdin");
        let _ = stdin.shutdown().await;
    })
}

/// Read stdout line by line and dispatch each message.
///
/// Invalid UTF-8 is replaced rather than fatal. End of stream only ends the
/// task; the exit watcher decides what the death means for pending calls.
pub fn spawn_reader(
    ctx: ChannelContext,
    stdout: BoxedReader,
    outbound: mpsc::Sender<OutboundFrame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::with_capacity(4096);
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    debug!(generation = ctx.generation(), "Subprocess stdout closed");
                    break;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    dispatch_line(&ctx, &outbound, &line).await;
                }
                Err(e) => {
                    warn!(generation = ctx.generation(), error = %e, "Reading subprocess stdout failed");
                    break;
                }
            }
        }
    })
}

/// Forward stderr lines to the log and the diagnostics topic.
pub fn spawn_stderr(ctx: ChannelContext, stderr: BoxedReader) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::with_capacity(1024);
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    info!(target: SUBPROCESS_TARGET, generation = ctx.generation(), "{}", line);
                    ctx.router.diagnostic(ctx.generation(), line).await;
                }
            }
        }
    })
}

async fn dispatch_line(ctx: &ChannelContext, outbound: &mpsc::Sender<OutboundFrame>, line: &str) {
    match decode_line(line) {
        Ok(None) => {}
        Ok(Some(Message::Response(response))) => {
            ctx.pending.complete(response);
        }
        Ok(Some(Message::Notification(notification))) => {
            ctx.router.route(notification).await;
        }
        Ok(Some(Message::Request(request))) => {
            answer_server_request(ctx, outbound, request).await;
        }
        Err(e) => {
            PROTOCOL_ERRORS.with_label_values(&[e.kind()]).inc();
            warn!(generation = ctx.generation(), error = %e, "Skipping line from subprocess");
        }
    }
}

/// The subprocess may ask things of us; only `ping` is understood.
async fn answer_server_request(
    ctx: &ChannelContext,
    outbound: &mpsc::Sender<OutboundFrame>,
    request: Request,
) {
    let response = if request.method == methods::PING {
        Response::success(request.id, json!({}))
    } else {
        debug!(generation = ctx.generation(), method = %request.method, "Refusing server request");
        Response::failure(request.id, RpcError::method_not_found(&request.method))
    };

    match encode_line(&Message::from(response)) {
        Ok(line) => {
            let _ = outbound.send(OutboundFrame::new(line)).await;
        }
        Err(e) => warn!(error = %e, "Could not encode reply to server request"),
    }
}
