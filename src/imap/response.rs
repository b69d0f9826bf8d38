//! Tagged/untagged response model. Untagged data lines go out first, each
//! prefixed with `*`, then the tagged completion line.

use crate::imap::command::ImapCommand;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    No,
    Bad,
}

impl Status {
    fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::No => "NO",
            Status::Bad => "BAD",
        }
    }
}

pub struct Response {
    tag: Option<String>,
    status: Status,
    message: String,
    data: Vec<String>,
}

pub struct ResponseBuilder {
    tag: Option<String>,
    message: String,
    data: Vec<String>,
}

impl Response {
    pub fn build() -> ResponseBuilder {
        ResponseBuilder {
            tag: None,
            message: String::new(),
            data: Vec::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Wire form, untagged data lines then the completion line. A missing
    /// tag renders the completion line untagged too.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.data {
            out.push_str("* ");
            out.push_str(line);
            out.push_str("\r\n");
        }
        out.push_str(self.tag.as_deref().unwrap_or("*"));
        out.push(' ');
        out.push_str(self.status.as_str());
        out.push(' ');
        out.push_str(&self.message);
        out.push_str("\r\n");
        out
    }
}

impl ResponseBuilder {
    pub fn to_req(mut self, cmd: &ImapCommand) -> Self {
        self.tag = Some(cmd.tag.clone());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.message = text.into();
        self
    }

    /// Append one untagged data line (without the `* ` prefix).
    pub fn data(mut self, line: impl Into<String>) -> Self {
        self.data.push(line.into());
        self
    }

    pub fn ok(self) -> Response {
        self.with_status(Status::Ok)
    }

    pub fn no(self) -> Response {
        self.with_status(Status::No)
    }

    pub fn bad(self) -> Response {
        self.with_status(Status::Bad)
    }

    fn with_status(self, status: Status) -> Response {
        Response {
            tag: self.tag,
            status,
            message: self.message,
            data: self.data,
        }
    }
}
