use chrono::{DateTime, Utc};

pub mod address;
pub mod delivery;
pub mod mime;
pub mod unique_ident;

/// One SMTP transaction in progress: opened by MAIL, extended by RCPT,
/// filled by DATA, consumed by the delivery pipeline or dropped by RSET.
/// Distinct from the parsed message derived from its data.
pub struct Envelope {
    pub sender: String,
    pub recipients: Vec<String>,
    pub data: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(sender: String) -> Self {
        Self {
            sender,
            recipients: Vec::new(),
            data: Vec::new(),
            received_at: Utc::now(),
        }
    }
}
