//! Boundary to the collaborator stores. Everything durable (users, email
//! records, attachment bytes) lives behind these traits; the protocol core
//! only ever holds the in-memory implementation used by development mode
//! and the tests.

pub mod in_memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::mail::address::EmailAddress;
use crate::mail::unique_ident::UniqueIdent;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found")]
    NotFound,
    #[error("internal storage error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmailStatus {
    Received,
    Sent,
    Draft,
    Trash,
    Spam,
}

/// Message record handed to the email store, one per delivered recipient.
#[derive(Clone, Debug)]
pub struct MessageData {
    pub subject: String,
    pub body: String,
    pub html_body: Option<String>,
    pub from_address: EmailAddress,
    pub to_addresses: Vec<EmailAddress>,
    pub cc_addresses: Vec<EmailAddress>,
    pub attachments: Vec<AttachmentRef>,
    pub status: EmailStatus,
    pub received_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct PersistedEmail {
    pub id: UniqueIdent,
    pub owner: UserId,
    pub subject: String,
}

/// What IMAP SELECT needs to compute EXISTS/UNSEEN.
#[derive(Clone, Debug)]
pub struct EmailSummary {
    pub id: UniqueIdent,
    pub subject: String,
    pub size: usize,
    pub is_read: bool,
}

/// Stored attachment metadata as returned by the attachment store. The
/// store assigns storage identity; the core only forwards it.
#[derive(Clone, Debug)]
pub struct AttachmentRef {
    pub id: UniqueIdent,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
    pub url: String,
}

/// Anything that can produce attachment bytes: a part carved out of a MIME
/// payload here, or an uploaded file in the compose path that shares this
/// store.
pub trait AttachmentSource: Send + Sync {
    fn read_bytes(&self) -> anyhow::Result<Vec<u8>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a recipient address to a local account, `None` when nobody
    /// local owns the address.
    async fn lookup_user_by_email(&self, address: &str) -> Result<Option<UserId>, StorageError>;
}

#[async_trait]
pub trait EmailStore: Send + Sync {
    async fn create_email(
        &self,
        message: &MessageData,
        owner: &UserId,
    ) -> Result<PersistedEmail, StorageError>;

    async fn emails_for_mailbox(
        &self,
        owner: &UserId,
        mailbox: &str,
    ) -> Result<Vec<EmailSummary>, StorageError>;
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn save_attachment(
        &self,
        filename: &str,
        content_type: &str,
        source: &dyn AttachmentSource,
        owner: &UserId,
    ) -> Result<AttachmentRef, StorageError>;
}

pub type ArcUserDirectory = Arc<dyn UserDirectory>;
pub type ArcEmailStore = Arc<dyn EmailStore>;
pub type ArcAttachmentStore = Arc<dyn AttachmentStore>;

/// Handles to the three collaborator stores, cloned into every session.
#[derive(Clone)]
pub struct Stores {
    pub users: ArcUserDirectory,
    pub emails: ArcEmailStore,
    pub attachments: ArcAttachmentStore,
}
