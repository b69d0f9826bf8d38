//! SMTP command model: one parsed input line, immutable for one dispatch.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmtpCommand {
    pub verb: String,
    pub args: Vec<String>,
}

impl SmtpCommand {
    /// `None` for a blank line; the verb is uppercased, arguments keep
    /// their case.
    pub fn parse(line: &str) -> Option<SmtpCommand> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let mut parts = line.splitn(2, ' ');
        let verb = parts.next()?.to_ascii_uppercase();
        let args = parts
            .next()
            .map(|rest| rest.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Some(SmtpCommand { verb, args })
    }

    /// The raw argument text after the verb, for address extraction.
    pub fn arg_text(&self) -> String {
        self.args.join(" ")
    }
}

/// Pull a bare address out of `FROM:<a@b>` / `TO:<a@b>` forms: strip the
/// label and the angle brackets. Input without brackets is accepted
/// verbatim, trimmed. Empty output means no usable address.
pub fn extract_address(raw: &str) -> String {
    let rest = match raw.split_once(':') {
        Some((_, rest)) => rest,
        None => raw,
    };
    if let Some(open) = rest.find('<') {
        if let Some(close) = rest[open + 1..].find('>') {
            return rest[open + 1..open + 1 + close].trim().to_string();
        }
    }
    // Bracketless form: the address is the first token, trailing
    // extension parameters are ignored.
    rest.split_whitespace().next().unwrap_or("").to_string()
}
