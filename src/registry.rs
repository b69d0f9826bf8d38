//! Connection registry: observability bookkeeping for live sessions, keyed
//! by session id. Never used for cross-session coordination. Entries are
//! removed by a drop guard so teardown happens on every exit path.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::mail::unique_ident::{gen_ident, now_msec, UniqueIdent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Smtp,
    Imap,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Smtp => write!(f, "smtp"),
            Protocol::Imap => write!(f, "imap"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConnectionInfo {
    pub protocol: Protocol,
    pub peer: Option<SocketAddr>,
    pub created_at_msec: u64,
    pub last_activity_msec: u64,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<HashMap<UniqueIdent, ConnectionInfo>>,
}

impl ConnectionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(
        self: &Arc<Self>,
        protocol: Protocol,
        peer: Option<SocketAddr>,
    ) -> SessionHandle {
        let id = gen_ident();
        let now = now_msec();
        if let Ok(mut map) = self.inner.lock() {
            map.insert(
                id,
                ConnectionInfo {
                    protocol,
                    peer,
                    created_at_msec: now,
                    last_activity_msec: now,
                },
            );
        }
        SessionHandle {
            registry: self.clone(),
            id,
        }
    }

    pub fn active(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or(0)
    }

    fn touch(&self, id: UniqueIdent) {
        if let Ok(mut map) = self.inner.lock() {
            if let Some(info) = map.get_mut(&id) {
                info.last_activity_msec = now_msec();
            }
        }
    }

    fn remove(&self, id: UniqueIdent) {
        if let Ok(mut map) = self.inner.lock() {
            map.remove(&id);
        }
    }
}

/// Owned by the session task; removing the entry is tied to its drop.
pub struct SessionHandle {
    registry: Arc<ConnectionRegistry>,
    id: UniqueIdent,
}

impl SessionHandle {
    pub fn id(&self) -> UniqueIdent {
        self.id
    }

    pub fn touch(&self) {
        self.registry.touch(self.id);
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
