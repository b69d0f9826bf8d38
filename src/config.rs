use std::collections::HashMap;
use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// Relaxes authentication to always-succeed and binds a placeholder
    /// identity. Recipients still go through the user directory.
    #[serde(default)]
    pub development: bool,

    pub smtp: Option<SmtpConfig>,
    pub imap: Option<ImapConfig>,

    #[serde(default)]
    pub users: UserManagement,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SmtpConfig {
    pub bind_addr: SocketAddr,
    pub hostname: String,

    /// Bind the TLS port variant instead of `bind_addr`. The handshake
    /// itself is terminated in front of this process, not here.
    #[serde(default)]
    pub use_tls: bool,
    pub tls_bind_addr: Option<SocketAddr>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ImapConfig {
    pub bind_addr: SocketAddr,

    #[serde(default)]
    pub use_tls: bool,
    pub tls_bind_addr: Option<SocketAddr>,
}

impl SmtpConfig {
    pub fn effective_bind_addr(&self) -> SocketAddr {
        pick_bind_addr(self.use_tls, self.tls_bind_addr, self.bind_addr)
    }
}

impl ImapConfig {
    pub fn effective_bind_addr(&self) -> SocketAddr {
        pick_bind_addr(self.use_tls, self.tls_bind_addr, self.bind_addr)
    }
}

fn pick_bind_addr(use_tls: bool, tls: Option<SocketAddr>, plain: SocketAddr) -> SocketAddr {
    match (use_tls, tls) {
        (true, Some(addr)) => addr,
        _ => plain,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "user_driver")]
pub enum UserManagement {
    /// Every address resolves to the demo account.
    Demo,
    Static(StaticUsers),
}

impl Default for UserManagement {
    fn default() -> Self {
        UserManagement::Demo
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StaticUsers {
    pub users: HashMap<String, UserEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserEntry {
    #[serde(default)]
    pub email_addresses: Vec<String>,
}

pub fn read_config(config_file: PathBuf) -> Result<Config> {
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .open(config_file.as_path())?;

    let mut config = String::new();
    file.read_to_string(&mut config)?;

    Ok(toml::from_str(&config)?)
}

pub fn dev_config() -> Config {
    use std::net::{IpAddr, Ipv4Addr};
    Config {
        development: true,
        smtp: Some(SmtpConfig {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 2525),
            hostname: "localhost".to_string(),
            use_tls: false,
            tls_bind_addr: None,
        }),
        imap: Some(ImapConfig {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 1143),
            use_tls: false,
            tls_bind_addr: None,
        }),
        users: UserManagement::Demo,
    }
}
