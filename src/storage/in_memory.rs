//! In-memory implementation of the collaborator stores, used by the
//! development mode and by the test suite.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::{StaticUsers, UserManagement};
use crate::mail::unique_ident::{gen_ident, UniqueIdent};
use crate::storage::*;

pub const DEMO_USER: &str = "dev_user";

pub fn build(users: &UserManagement) -> Stores {
    let users: ArcUserDirectory = match users {
        UserManagement::Demo => Arc::new(DemoDirectory),
        UserManagement::Static(conf) => Arc::new(StaticDirectory::from_config(conf)),
    };
    Stores {
        users,
        emails: Arc::new(MemEmailStore::default()),
        attachments: Arc::new(MemAttachmentStore::default()),
    }
}

/// Resolves every address to the demo account.
pub struct DemoDirectory;

#[async_trait]
impl UserDirectory for DemoDirectory {
    async fn lookup_user_by_email(&self, _address: &str) -> Result<Option<UserId>, StorageError> {
        Ok(Some(UserId(DEMO_USER.to_string())))
    }
}

/// Address book built from the `[users]` config section.
pub struct StaticDirectory {
    by_address: HashMap<String, UserId>,
}

impl StaticDirectory {
    pub fn from_config(conf: &StaticUsers) -> Self {
        let mut by_address = HashMap::new();
        for (login, entry) in &conf.users {
            for addr in &entry.email_addresses {
                by_address.insert(addr.to_lowercase(), UserId(login.clone()));
            }
        }
        Self { by_address }
    }

    pub fn with_mapping(pairs: &[(&str, &str)]) -> Self {
        let by_address = pairs
            .iter()
            .map(|(addr, login)| (addr.to_lowercase(), UserId(login.to_string())))
            .collect();
        Self { by_address }
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn lookup_user_by_email(&self, address: &str) -> Result<Option<UserId>, StorageError> {
        Ok(self.by_address.get(&address.to_lowercase()).cloned())
    }
}

struct StoredEmail {
    id: UniqueIdent,
    data: MessageData,
    is_read: bool,
}

#[derive(Default)]
pub struct MemEmailStore {
    emails: Mutex<HashMap<UserId, Vec<StoredEmail>>>,
}

impl MemEmailStore {
    /// Test hook: every record created for `owner`, in creation order.
    pub fn messages_for(&self, owner: &UserId) -> Vec<MessageData> {
        match self.emails.lock() {
            Ok(map) => map
                .get(owner)
                .map(|v| v.iter().map(|e| e.data.clone()).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Test hook: seed a mailbox without going through the SMTP path.
    pub fn seed(&self, owner: &UserId, data: MessageData, is_read: bool) {
        if let Ok(mut map) = self.emails.lock() {
            map.entry(owner.clone()).or_default().push(StoredEmail {
                id: gen_ident(),
                data,
                is_read,
            });
        }
    }
}

fn mailbox_status(mailbox: &str) -> Option<EmailStatus> {
    match mailbox.to_lowercase().as_str() {
        "inbox" => Some(EmailStatus::Received),
        "sent" => Some(EmailStatus::Sent),
        "drafts" => Some(EmailStatus::Draft),
        "trash" => Some(EmailStatus::Trash),
        "spam" => Some(EmailStatus::Spam),
        _ => None,
    }
}

#[async_trait]
impl EmailStore for MemEmailStore {
    async fn create_email(
        &self,
        message: &MessageData,
        owner: &UserId,
    ) -> Result<PersistedEmail, StorageError> {
        let id = gen_ident();
        let mut map = self
            .emails
            .lock()
            .map_err(|_| StorageError::Internal("email store lock poisoned".into()))?;
        map.entry(owner.clone()).or_default().push(StoredEmail {
            id,
            data: message.clone(),
            is_read: false,
        });
        Ok(PersistedEmail {
            id,
            owner: owner.clone(),
            subject: message.subject.clone(),
        })
    }

    async fn emails_for_mailbox(
        &self,
        owner: &UserId,
        mailbox: &str,
    ) -> Result<Vec<EmailSummary>, StorageError> {
        let status = match mailbox_status(mailbox) {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };
        let map = self
            .emails
            .lock()
            .map_err(|_| StorageError::Internal("email store lock poisoned".into()))?;
        Ok(map
            .get(owner)
            .map(|emails| {
                emails
                    .iter()
                    .filter(|e| e.data.status == status)
                    .map(|e| EmailSummary {
                        id: e.id,
                        subject: e.data.subject.clone(),
                        size: e.data.body.len(),
                        is_read: e.is_read,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemAttachmentStore {
    saved: Mutex<HashMap<UserId, Vec<(AttachmentRef, Vec<u8>)>>>,
}

impl MemAttachmentStore {
    /// Test hook: attachment metadata stored for `owner`.
    pub fn saved_for(&self, owner: &UserId) -> Vec<AttachmentRef> {
        match self.saved.lock() {
            Ok(map) => map
                .get(owner)
                .map(|v| v.iter().map(|(r, _)| r.clone()).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl AttachmentStore for MemAttachmentStore {
    async fn save_attachment(
        &self,
        filename: &str,
        content_type: &str,
        source: &dyn AttachmentSource,
        owner: &UserId,
    ) -> Result<AttachmentRef, StorageError> {
        let bytes = source
            .read_bytes()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let id = gen_ident();
        let reference = AttachmentRef {
            id,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
            url: format!("/attachments/{}/{}", owner, id),
        };
        let mut map = self
            .saved
            .lock()
            .map_err(|_| StorageError::Internal("attachment store lock poisoned".into()))?;
        map.entry(owner.clone())
            .or_default()
            .push((reference.clone(), bytes));
        Ok(reference)
    }
}
