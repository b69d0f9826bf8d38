//! Address-header parsing: `"Name" <addr>` and bare `addr` forms, with a
//! sentinel fallback so a bad header never fails the whole message.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailAddress {
    pub name: String,
    pub email: String,
}

impl EmailAddress {
    /// Sentinel used whenever a header value does not yield an address.
    pub fn unknown() -> Self {
        Self {
            name: "Unknown".to_string(),
            email: "unknown@example.com".to_string(),
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Parse one address. Invalid or empty input yields the sentinel.
pub fn parse_address(raw: &str) -> EmailAddress {
    let raw = raw.trim();
    if raw.is_empty() {
        return EmailAddress::unknown();
    }

    let (name, email) = match (raw.find('<'), raw.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            let email = raw[open + 1..close].trim().to_string();
            let name = raw[..open].trim().trim_matches('"').to_string();
            (name, email)
        }
        _ => {
            let email = raw.to_string();
            let name = match email.split_once('@') {
                Some((local, _)) => local.to_string(),
                None => email.clone(),
            };
            (name, email)
        }
    };

    if email.is_empty() || !email.contains('@') {
        return EmailAddress::unknown();
    }

    let name = if name.is_empty() {
        email
            .split_once('@')
            .map(|(local, _)| local.to_string())
            .unwrap_or_else(|| email.clone())
    } else {
        name
    };

    EmailAddress { name, email }
}

/// Parse a comma-separated address list, skipping empty elements.
pub fn parse_address_list(raw: &str) -> Vec<EmailAddress> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_address)
        .collect()
}
