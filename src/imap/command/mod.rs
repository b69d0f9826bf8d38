//! Command model plus the per-state handlers. Command behavior is
//! modulated by the session state, so each state gets its own dispatch
//! path.

pub mod anonymous;
pub mod anystate;
pub mod authenticated;
pub mod selected;

/// One parsed input line: client tag + uppercased verb + arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImapCommand {
    pub tag: String,
    pub verb: String,
    pub args: Vec<String>,
}

impl ImapCommand {
    /// A line must carry at least a tag and a verb; anything else is a
    /// format error answered with an untagged BAD.
    pub fn parse(line: &str) -> Option<ImapCommand> {
        let line = line.trim();
        let mut parts = line.splitn(3, ' ');
        let tag = parts.next()?.to_string();
        let verb = parts.next()?.to_ascii_uppercase();
        if tag.is_empty() || verb.is_empty() {
            return None;
        }
        let args = parts
            .next()
            .map(|rest| rest.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Some(ImapCommand { tag, verb, args })
    }
}
