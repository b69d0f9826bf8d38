//! Delivery of a completed SMTP transaction: resolve each recipient to a
//! local account, persist attachment copies per owner, then persist the
//! message record. One bad recipient never blocks the others.

use std::time::Duration;

use anyhow::Result;

use crate::mail::mime::{self, ParsedMessage};
use crate::mail::Envelope;
use crate::storage::{EmailStatus, MessageData, Stores, UserId};

/// Bound on a single user-directory lookup.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DeliveryPipeline {
    stores: Stores,
    lookup_timeout: Duration,
}

#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub skipped: usize,
}

impl DeliveryPipeline {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            lookup_timeout: LOOKUP_TIMEOUT,
        }
    }

    pub async fn deliver(&self, envelope: Envelope) -> Result<DeliveryReport> {
        let message = mime::decompose(&envelope.data, envelope.received_at);
        tracing::debug!(
            sender = %envelope.sender,
            recipients = envelope.recipients.len(),
            subject = %message.subject,
            attachments = message.attachments.len(),
            "delivering message"
        );

        let mut report = DeliveryReport::default();
        for recipient in &envelope.recipients {
            let owner = match self.resolve(recipient).await {
                Some(owner) => owner,
                None => {
                    report.skipped += 1;
                    continue;
                }
            };
            match self.deliver_to(&message, &owner).await {
                Ok(()) => {
                    tracing::info!(recipient = %recipient, owner = %owner, subject = %message.subject, "message delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(recipient = %recipient, owner = %owner, error = %e, "delivery failed, skipping recipient");
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }

    async fn resolve(&self, recipient: &str) -> Option<UserId> {
        let lookup = self.stores.users.lookup_user_by_email(recipient);
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(Some(owner))) => Some(owner),
            Ok(Ok(None)) => {
                tracing::info!(recipient = %recipient, "no local account, skipping recipient");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(recipient = %recipient, error = %e, "user lookup failed, skipping recipient");
                None
            }
            Err(_) => {
                tracing::warn!(recipient = %recipient, "user lookup timed out, skipping recipient");
                None
            }
        }
    }

    /// Each owner gets their own stored copy of every attachment, since the
    /// attachment store is scoped per account.
    async fn deliver_to(&self, message: &ParsedMessage, owner: &UserId) -> Result<()> {
        let mut attachment_refs = Vec::with_capacity(message.attachments.len());
        for part in &message.attachments {
            let saved = self
                .stores
                .attachments
                .save_attachment(&part.filename, &part.content_type, part, owner)
                .await?;
            attachment_refs.push(saved);
        }

        let data = MessageData {
            subject: message.subject.clone(),
            body: message.body.clone(),
            html_body: message.html_body.clone(),
            from_address: message.from_address.clone(),
            to_addresses: message.to_addresses.clone(),
            cc_addresses: message.cc_addresses.clone(),
            attachments: attachment_refs,
            status: EmailStatus::Received,
            received_at: message.received_at,
        };
        self.stores.emails.create_email(&data, owner).await?;
        Ok(())
    }
}
