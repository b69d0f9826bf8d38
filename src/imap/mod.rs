pub mod capability;
pub mod command;
pub mod flow;
pub mod response;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::watch;

use crate::config::ImapConfig;
use crate::proto::line::LineReader;
use crate::registry::{ConnectionRegistry, Protocol, SessionHandle};
use crate::storage::Stores;

use command::ImapCommand;
use response::Response;
use session::Instance;

pub struct ImapServer {
    bind_addr: SocketAddr,
    stores: Stores,
    development: bool,
    registry: Arc<ConnectionRegistry>,
}

impl ImapServer {
    pub fn new(
        config: &ImapConfig,
        development: bool,
        stores: Stores,
        registry: Arc<ConnectionRegistry>,
    ) -> Arc<Self> {
        if config.use_tls {
            tracing::warn!(
                "IMAP TLS port variant selected; the TLS handshake is expected to be terminated upstream"
            );
        }
        Arc::new(Self {
            bind_addr: config.effective_bind_addr(),
            stores,
            development,
            registry,
        })
    }

    pub async fn run(self: &Arc<Self>, mut must_exit: watch::Receiver<bool>) -> Result<()> {
        let tcp = TcpListener::bind(self.bind_addr).await?;
        tracing::info!("IMAP server listening on {:#}", self.bind_addr);

        let mut connections = FuturesUnordered::new();

        while !*must_exit.borrow() {
            let wait_conn_finished = async {
                if connections.is_empty() {
                    futures::future::pending().await
                } else {
                    connections.next().await
                }
            };
            let (socket, remote_addr) = select! {
                a = tcp.accept() => a?,
                _ = wait_conn_finished => continue,
                _ = must_exit.changed() => continue,
            };
            tracing::info!("IMAP: accepted connection from {}", remote_addr);

            let stores = self.stores.clone();
            let development = self.development;
            let handle = self.registry.register(Protocol::Imap, Some(remote_addr));
            let conn = tokio::spawn(async move {
                let session = handle.id();
                match serve(socket, stores, development, handle).await {
                    Ok(()) => {
                        tracing::info!(%session, "closing successful IMAP session for {}", remote_addr)
                    }
                    Err(e) => {
                        tracing::error!(%session, "closing errored IMAP session for {}: {}", remote_addr, e)
                    }
                }
            });

            connections.push(conn);
        }
        drop(tcp);

        tracing::info!("IMAP server shutting down, draining remaining connections...");
        while connections.next().await.is_some() {}

        Ok(())
    }
}

/// One connection's command loop: greeting, then read / dispatch / respond
/// strictly in arrival order until EOF or LOGOUT.
pub async fn serve<S>(
    stream: S,
    stores: Stores,
    development: bool,
    handle: SessionHandle,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = LineReader::new(read_half);

    write_half
        .write_all(b"* OK IMAP4rev1 Service Ready\r\n")
        .await?;
    write_half.flush().await?;

    let mut instance = Instance::new(stores, development);
    while let Some(line) = reader.read_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        handle.touch();

        let response = match ImapCommand::parse(&line) {
            Some(cmd) => instance.command(cmd).await,
            None => Response::build().message("Invalid command format").bad(),
        };
        write_half.write_all(response.render().as_bytes()).await?;
        write_half.flush().await?;

        if instance.is_logout() {
            break;
        }
    }

    Ok(())
}
