/// Capabilities advertised in the untagged CAPABILITY response. STARTTLS
/// is announced at the protocol level only; the upgrade itself happens in
/// front of this process.
#[derive(Debug, Clone)]
pub struct ServerCapability(Vec<&'static str>);

impl Default for ServerCapability {
    fn default() -> Self {
        Self(vec![
            "IMAP4rev1",
            "STARTTLS",
            "AUTH=PLAIN",
            "AUTH=LOGIN",
            "IDLE",
            "NAMESPACE",
            "QUOTA",
            "ID",
            "ENABLE",
            "CONDSTORE",
            "QRESYNC",
        ])
    }
}

impl ServerCapability {
    pub fn advertisement(&self) -> String {
        self.0.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertises_auth_mechanisms() {
        let caps = ServerCapability::default().advertisement();
        assert!(caps.starts_with("IMAP4rev1"));
        assert!(caps.contains("AUTH=PLAIN"));
        assert!(caps.contains("AUTH=LOGIN"));
    }
}
