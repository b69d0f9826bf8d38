use std::sync::Arc;

use anyhow::{bail, Result};
use futures::try_join;
use tokio::sync::watch;

use crate::config::Config;
use crate::imap::ImapServer;
use crate::registry::ConnectionRegistry;
use crate::smtp::SmtpServer;
use crate::storage::in_memory;

pub struct Server {
    smtp_server: Option<Arc<SmtpServer>>,
    imap_server: Option<Arc<ImapServer>>,
}

impl Server {
    pub fn new(config: Config) -> Result<Self> {
        let stores = in_memory::build(&config.users);
        let registry = ConnectionRegistry::new();

        let smtp_server = config
            .smtp
            .as_ref()
            .map(|cfg| SmtpServer::new(cfg, stores.clone(), registry.clone()));
        let imap_server = config
            .imap
            .as_ref()
            .map(|cfg| ImapServer::new(cfg, config.development, stores.clone(), registry.clone()));

        if smtp_server.is_none() && imap_server.is_none() {
            bail!("no listener is configured, enable [smtp] and/or [imap]");
        }

        Ok(Self {
            smtp_server,
            imap_server,
        })
    }

    pub async fn run(self) -> Result<()> {
        tracing::info!("Starting postale...");

        let (exit_signal, _provoke_exit) = watch_ctrl_c();

        try_join!(
            async {
                match self.smtp_server.as_ref() {
                    None => Ok(()),
                    Some(s) => s.run(exit_signal.clone()).await,
                }
            },
            async {
                match self.imap_server.as_ref() {
                    None => Ok(()),
                    Some(s) => s.run(exit_signal.clone()).await,
                }
            }
        )?;

        Ok(())
    }
}

pub fn watch_ctrl_c() -> (watch::Receiver<bool>, Arc<watch::Sender<bool>>) {
    let (send_cancel, watch_cancel) = watch::channel(false);
    let send_cancel = Arc::new(send_cancel);
    let send_cancel_2 = send_cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C signal handler");
        tracing::info!("Received CTRL+C, shutting down.");
        let _ = send_cancel.send(true);
    });
    (watch_cancel, send_cancel_2)
}
