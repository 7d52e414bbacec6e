use crate::constants::{BAD_REQUEST, NOT_FOUND};
use crate::error::CustomError;
use crate::ledger::controller::LedgerController;
use crate::ledger::model::OperationType;
use crate::req::Method::{GET, POST};
use crate::req::Request;
use crate::utils::error_body;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot::Receiver;
use tracing::{error, info, warn};

pub struct Server {
    addr: String,
    controller: Arc<LedgerController>,
}

impl Server {
    pub fn new(addr: impl Into<String>, controller: Arc<LedgerController>) -> Self {
        Self {
            addr: addr.into(),
            controller,
        }
    }

    pub async fn start(&self, mut shutdown_rx: Receiver<()>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        info!("Server running on http://{}", self.addr);

        loop {
            tokio::select! {
                conn = listener.accept() => {
                    let (mut stream, peer) = conn?;

                    let controller = Arc::clone(&self.controller);

                    tokio::spawn(async move {
                        let (reader, writer) = stream.split();
                        if let Err(e) = Self::handle_client(reader, writer, &controller).await {
                            error!(%peer, "Connection error: {:#}", e);
                        }
                    });
                }
                // Shutdown signal check
                _ = &mut shutdown_rx => {
                    info!("Shutting down server...");
                    break;
                }
            }
        }
        Ok(())
    }

    pub async fn handle_client<Reader, Writer>(
        reader: Reader,
        mut writer: Writer,
        controller: &Arc<LedgerController>,
    ) -> Result<()>
    where
        Reader: AsyncRead + Unpin,
        Writer: AsyncWrite + Unpin,
    {
        let (status_line, content) = match Request::new(reader).await {
            Ok(request) => Self::route(&request, controller).await,
            Err(e) => {
                warn!("Bad request: {:#}", e);
                (
                    BAD_REQUEST.to_string(),
                    error_body(&CustomError::Validation("Invalid request".to_string())),
                )
            }
        };

        writer
            .write_all(
                format!(
                    "{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    content.len(),
                    content
                )
                .as_bytes(),
            )
            .await
            .context("Failed to write")?;
        writer.flush().await.context("Failed to flush")
    }

    async fn route(request: &Request, controller: &LedgerController) -> (String, String) {
        // Routes are served both bare and under `/api`.
        let path = match request.path.strip_prefix("/api") {
            Some(rest) if rest.starts_with('/') => rest,
            _ => request.path.as_str(),
        };

        match (&request.method, path) {
            (GET, p) if p.starts_with("/balance/") => {
                controller.balance(&p["/balance/".len()..]).await
            }
            (POST, "/deposit") => {
                controller
                    .transaction(OperationType::Deposit, &request.body)
                    .await
            }
            (POST, "/withdraw") => {
                controller
                    .transaction(OperationType::Withdraw, &request.body)
                    .await
            }
            (POST, "/transfer") => controller.transfer(&request.body).await,
            _ => (
                NOT_FOUND.to_string(),
                r#"{"error":"Not Found"}"#.to_string(),
            ),
        }
    }
}
