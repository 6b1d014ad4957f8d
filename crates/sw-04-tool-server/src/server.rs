//! Connection loop: lines in, lines out.
//!
//! Each request runs in its own task; a single writer task owns the output
//! stream, so responses leave in completion order.

use crate::error::ServerError;
use crate::ports::SearchBackend;
use crate::service::ToolServer;
use shared_types::framing::{decode_line, encode_line};
use shared_types::Message;
use std::sync::Arc;
use sw_telemetry::metrics::PROTOCOL_ERRORS;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, trace, warn};

fn spawn_writer<W>(mut writer: W, mut outbound: mpsc::Receiver<Message>) -> JoinHandle<Result<(), ServerError>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let line = match encode_line(&message) {
                Ok(line) => line,
                Err(e) => {
                    PROTOCOL_ERRORS.with_label_values(&[e.kind()]).inc();
                    warn!(error = %e, "Dropping unencodable message");
                    continue;
                }
            };
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
            trace!(bytes = line.len(), "Line written");
        }
        writer.shutdown().await?;
        Ok(())
    })
}

/// Serve one client until `reader` reaches end of stream.
///
/// Requests still running at end of stream are answered before the writer
/// is closed.
pub async fn serve<B, R, W>(
    server: Arc<ToolServer<B>>,
    reader: R,
    writer: W,
) -> Result<(), ServerError>
where
    B: SearchBackend,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(server.config().outbound_capacity);
    let writer = spawn_writer(writer, rx);
    let mut requests = JoinSet::new();

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(4096);
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("Input closed");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Reading input failed");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        match decode_line(&line) {
            Ok(None) => {}
            Ok(Some(Message::Request(request))) => {
                let server = Arc::clone(&server);
                let tx = tx.clone();
                requests.spawn(async move {
                    let response = server.handle_request(request, &tx).await;
                    if tx.send(response.into()).await.is_err() {
                        debug!("Writer closed before the response was sent");
                    }
                });
            }
            Ok(Some(Message::Notification(notification))) => {
                server.handle_notification(&notification);
            }
            Ok(Some(Message::Response(response))) => {
                debug!(id = %response.id, "Ignoring response from client");
            }
            Err(e) => {
                PROTOCOL_ERRORS.with_label_values(&[e.kind()]).inc();
                warn!(error = %e, "Skipping unparsable line");
            }
        }

        while requests.try_join_next().is_some() {}
    }

    while let Some(joined) = requests.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Request task failed");
        }
    }
    drop(tx);

    let result = match writer.await {
        Ok(result) => result,
        Err(e) => Err(ServerError::Io(std::io::Error::other(e.to_string()))),
    };
    info!("Connection closed");
    result
}
