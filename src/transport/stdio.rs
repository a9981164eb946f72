//! Stdio transport for the gateway.
//!
//! Requests arrive one JSON object per line on stdin and every response is
//! written as one line on stdout, flushed immediately. The reader and writer
//! are generic so the loop can run over in-memory buffers as well.

use crate::error::{DbError, DbResult};
use crate::protocol::GatewayService;
use crate::protocol::envelope::error_envelope;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::signal;
use tracing::{debug, info, warn};

/// Why the request loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    EndOfInput,
    Signal,
}

pub struct StdioTransport {
    service: GatewayService,
}

impl StdioTransport {
    pub fn new(service: GatewayService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &GatewayService {
        &self.service
    }

    /// Serve requests until the input ends or `shutdown` resolves.
    ///
    /// Requests are handled strictly one at a time and in order. The database
    /// connection is closed before returning, whatever the reason.
    pub async fn serve<R, W, S>(
        &mut self,
        mut reader: R,
        mut writer: W,
        shutdown: S,
    ) -> DbResult<ShutdownReason>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        info!("Starting gateway with stdio transport");
        tokio::pin!(shutdown);

        let outcome = self.request_loop(&mut reader, &mut writer, &mut shutdown).await;

        info!("Closing database connection");
        self.service.close().await;

        if let Ok(reason) = &outcome {
            info!(reason = ?reason, "Stdio transport stopped");
        }
        outcome
    }

    async fn request_loop<R, W, S>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        shutdown: &mut Pin<&mut S>,
    ) -> DbResult<ShutdownReason>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = tokio::select! {
                _ = shutdown.as_mut() => return Ok(ShutdownReason::Signal),
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            let n = read.map_err(|e| DbError::internal(format!("Failed to read stdin: {}", e)))?;
            if n == 0 {
                debug!("End of input");
                return Ok(ShutdownReason::EndOfInput);
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    tokio::select! {
                        _ = shutdown.as_mut() => return Ok(ShutdownReason::Signal),
                        response = self.service.handle_line(line) => response,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Request line is not valid UTF-8");
                    error_envelope(&DbError::decode(e.to_string()))
                }
            };

            write_response(writer, &response).await?;
        }
    }
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &JsonValue) -> DbResult<()> {
    let mut line = serde_json::to_vec(response)
        .map_err(|e| DbError::internal(format!("Failed to serialize response: {}", e)))?;
    line.push(b'\n');

    writer
        .write_all(&line)
        .await
        .map_err(|e| DbError::internal(format!("Failed to write stdout: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| DbError::internal(format!("Failed to flush stdout: {}", e)))
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
