#![allow(dead_code)]

//! Shared harness for the dialogue tests: the real session loops are
//! spawned over an in-process duplex pipe and driven line by line, with
//! the in-memory stores inspected for side effects.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

use postale::mail::address::EmailAddress;
use postale::mail::delivery::DeliveryPipeline;
use postale::registry::{ConnectionRegistry, Protocol};
use postale::smtp::session::{SessionParams, SmtpContext};
use postale::storage::in_memory::{
    DemoDirectory, MemAttachmentStore, MemEmailStore, StaticDirectory,
};
use postale::storage::{ArcUserDirectory, EmailStatus, MessageData, Stores};

pub struct TestStores {
    pub stores: Stores,
    pub emails: Arc<MemEmailStore>,
    pub attachments: Arc<MemAttachmentStore>,
}

pub fn demo_stores() -> TestStores {
    with_directory(Arc::new(DemoDirectory))
}

pub fn static_stores(pairs: &[(&str, &str)]) -> TestStores {
    with_directory(Arc::new(StaticDirectory::with_mapping(pairs)))
}

fn with_directory(users: ArcUserDirectory) -> TestStores {
    let emails = Arc::new(MemEmailStore::default());
    let attachments = Arc::new(MemAttachmentStore::default());
    TestStores {
        stores: Stores {
            users,
            emails: emails.clone(),
            attachments: attachments.clone(),
        },
        emails,
        attachments,
    }
}

pub fn message(subject: &str, status: EmailStatus) -> MessageData {
    MessageData {
        subject: subject.to_string(),
        body: "stored body".to_string(),
        html_body: None,
        from_address: EmailAddress::unknown(),
        to_addresses: vec![],
        cc_addresses: vec![],
        attachments: vec![],
        status,
        received_at: Utc::now(),
    }
}

/// Scripted client end of the pipe.
pub struct Client {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
}

impl Client {
    pub fn new(stream: DuplexStream) -> Self {
        let (read_half, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .expect("write to session");
        self.writer.flush().await.expect("flush to session");
    }

    /// One reply line without its ending; panics on EOF.
    pub async fn line(&mut self) -> String {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).await.expect("read reply");
        assert!(n > 0, "session closed the connection unexpectedly");
        buf.trim_end_matches(|c| c == '\r' || c == '\n').to_string()
    }

    pub async fn expect(&mut self, prefix: &str) -> String {
        let line = self.line().await;
        assert!(
            line.starts_with(prefix),
            "expected reply starting with {:?}, got {:?}",
            prefix,
            line
        );
        line
    }

    /// Read replies until the line carrying `tag`, returning everything in
    /// order (untagged lines first, tagged completion last).
    pub async fn until_tag(&mut self, tag: &str) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.line().await;
            let done = line.starts_with(&format!("{} ", tag));
            lines.push(line);
            if done {
                return lines;
            }
        }
    }

    pub async fn expect_eof(&mut self) {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).await.expect("read at eof");
        assert_eq!(n, 0, "expected EOF, got {:?}", buf);
    }
}

pub fn short_params() -> SessionParams {
    SessionParams {
        data_line_timeout: Duration::from_millis(100),
        data_max_lines: 1_000,
        delivery_timeout: Duration::from_secs(5),
    }
}

pub fn spawn_smtp(stores: Stores, params: SessionParams) -> (Client, JoinHandle<()>) {
    let (client_side, server_side) = tokio::io::duplex(64 * 1024);
    let registry = ConnectionRegistry::new();
    let handle = registry.register(Protocol::Smtp, None);
    let ctx = Arc::new(SmtpContext {
        hostname: "localhost".to_string(),
        pipeline: DeliveryPipeline::new(stores),
        params,
    });
    let task = tokio::spawn(async move {
        let _ = postale::smtp::session::serve(server_side, ctx, handle).await;
    });
    (Client::new(client_side), task)
}

pub fn spawn_imap(stores: Stores, development: bool) -> (Client, JoinHandle<()>) {
    let (client_side, server_side) = tokio::io::duplex(64 * 1024);
    let registry = ConnectionRegistry::new();
    let handle = registry.register(Protocol::Imap, None);
    let task = tokio::spawn(async move {
        let _ = postale::imap::serve(server_side, stores, development, handle).await;
    });
    (Client::new(client_side), task)
}
