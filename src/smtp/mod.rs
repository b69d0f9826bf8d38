pub mod command;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::watch;

use crate::config::SmtpConfig;
use crate::mail::delivery::DeliveryPipeline;
use crate::registry::{ConnectionRegistry, Protocol};
use crate::smtp::session::{SessionParams, SmtpContext};
use crate::storage::Stores;

pub struct SmtpServer {
    bind_addr: SocketAddr,
    ctx: Arc<SmtpContext>,
    registry: Arc<ConnectionRegistry>,
}

impl SmtpServer {
    pub fn new(
        config: &SmtpConfig,
        stores: Stores,
        registry: Arc<ConnectionRegistry>,
    ) -> Arc<Self> {
        if config.use_tls {
            tracing::warn!(
                "SMTP TLS port variant selected; the TLS handshake is expected to be terminated upstream"
            );
        }
        Arc::new(Self {
            bind_addr: config.effective_bind_addr(),
            ctx: Arc::new(SmtpContext {
                hostname: config.hostname.clone(),
                pipeline: DeliveryPipeline::new(stores),
                params: SessionParams::default(),
            }),
            registry,
        })
    }

    pub async fn run(self: &Arc<Self>, mut must_exit: watch::Receiver<bool>) -> Result<()> {
        let tcp = TcpListener::bind(self.bind_addr).await?;
        tracing::info!("SMTP server listening on {:#}", self.bind_addr);

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
            tracing::info!("SMTP: accepted connection from {}", remote_addr);

            let ctx = self.ctx.clone();
            let handle = self.registry.register(Protocol::Smtp, Some(remote_addr));
            let conn = tokio::spawn(async move {
                let session = handle.id();
                match session::serve(socket, ctx, handle).await {
                    Ok(()) => {
                        tracing::info!(%session, "closing successful SMTP session for {}", remote_addr)
                    }
                    Err(e) => {
                        tracing::error!(%session, "closing errored SMTP session for {}: {}", remote_addr, e)
                    }
                }
            });

            connections.push(conn);
        }
        drop(tcp);

        tracing::info!("SMTP server shutting down, draining remaining connections...");
        while connections.next().await.is_some() {}

        Ok(())
    }
}
