//! MIME decomposition of a raw RFC 822 payload into plain body, HTML body
//! and attachment parts. Parsing is deliberately forgiving: a malformed
//! header, encoding or boundary degrades to a safe default and never fails
//! the message.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};

use crate::mail::address::{parse_address, parse_address_list, EmailAddress};
use crate::storage::AttachmentSource;

/// Message derived from one envelope, alive only for the delivery pipeline.
pub struct ParsedMessage {
    pub subject: String,
    pub body: String,
    pub html_body: Option<String>,
    pub from_address: EmailAddress,
    pub to_addresses: Vec<EmailAddress>,
    pub cc_addresses: Vec<EmailAddress>,
    pub attachments: Vec<AttachmentPart>,
    pub received_at: DateTime<Utc>,
}

/// A non-text leaf part carrying a filename, before persistence.
pub struct AttachmentPart {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl AttachmentPart {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl AttachmentSource for AttachmentPart {
    fn read_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.data.clone())
    }
}

/// Nesting bound for multipart-inside-multipart payloads.
const MAX_MULTIPART_DEPTH: usize = 8;

pub fn decompose(raw: &[u8], received_at: DateTime<Utc>) -> ParsedMessage {
    let (headers, body) = split_message(raw);

    let subject = header(&headers, "Subject")
        .unwrap_or("No Subject")
        .to_string();
    let from_address = parse_address(header(&headers, "From").unwrap_or(""));
    let to_addresses = parse_address_list(header(&headers, "To").unwrap_or(""));
    let cc_addresses = parse_address_list(header(&headers, "Cc").unwrap_or(""));
    let received_at = header(&headers, "Date")
        .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(received_at);

    let mut message = ParsedMessage {
        subject,
        body: String::new(),
        html_body: None,
        from_address,
        to_addresses,
        cc_addresses,
        attachments: Vec::new(),
        received_at,
    };

    let content_type = parse_content_type(header(&headers, "Content-Type").unwrap_or(""));
    if content_type.main == "multipart" {
        match content_type.param("boundary") {
            Some(boundary) => {
                for part in split_multipart(body, boundary) {
                    walk_part(part, 1, &mut message);
                }
            }
            None => {
                tracing::debug!("multipart without boundary, keeping payload as plain body");
                message.body = String::from_utf8_lossy(body).into_owned();
            }
        }
    } else {
        let decoded = decode_transfer(body, header(&headers, "Content-Transfer-Encoding"));
        message.body = String::from_utf8_lossy(&decoded).into_owned();
    }

    message
}

fn walk_part(raw: &[u8], depth: usize, out: &mut ParsedMessage) {
    let (headers, body) = split_message(raw);
    let content_type = parse_content_type(header(&headers, "Content-Type").unwrap_or(""));

    if content_type.main == "multipart" {
        if depth >= MAX_MULTIPART_DEPTH {
            tracing::debug!(depth, "multipart nesting too deep, ignoring inner parts");
            return;
        }
        if let Some(boundary) = content_type.param("boundary") {
            for part in split_multipart(body, boundary) {
                walk_part(part, depth + 1, out);
            }
        }
        return;
    }

    let decoded = decode_transfer(body, header(&headers, "Content-Transfer-Encoding"));
    let filename = header(&headers, "Content-Disposition")
        .and_then(|v| param_of(v, "filename").map(str::to_string))
        .or_else(|| content_type.param("name").map(str::to_string));

    match content_type.main.as_str() {
        "text" if content_type.sub == "plain" => {
            if out.body.is_empty() {
                out.body = String::from_utf8_lossy(&decoded).into_owned();
            }
        }
        "text" if content_type.sub == "html" => {
            if out.html_body.is_none() {
                out.html_body = Some(String::from_utf8_lossy(&decoded).into_owned());
            }
        }
        "image" | "application" | "audio" | "video" => {
            if let Some(filename) = filename {
                out.attachments.push(AttachmentPart {
                    filename,
                    content_type: format!("{}/{}", content_type.main, content_type.sub),
                    data: decoded,
                });
            }
        }
        _ => {}
    }
}

// ---- headers ----

type Headers = Vec<(String, String)>;

/// Split a part into folded headers and body at the first blank line. A
/// line that is neither a header nor a continuation also ends the header
/// block and starts the body, so headerless payloads survive as content.
fn split_message(raw: &[u8]) -> (Headers, &[u8]) {
    let mut headers = Headers::new();
    let mut offset = 0;
    while offset < raw.len() {
        let line_end = match raw[offset..].iter().position(|&b| b == b'\n') {
            Some(i) => offset + i + 1,
            None => raw.len(),
        };
        let line = trim_line_ending(&raw[offset..line_end]);
        if line.is_empty() {
            return (headers, &raw[line_end..]);
        }
        let text = String::from_utf8_lossy(line).into_owned();
        if text.starts_with(' ') || text.starts_with('\t') {
            if let Some(last) = headers.last_mut() {
                last.1.push(' ');
                last.1.push_str(text.trim());
            }
        } else if let Some((name, value)) = text.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        } else {
            return (headers, &raw[offset..]);
        }
        offset = line_end;
    }
    (headers, &[])
}

fn header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    if line.ends_with(b"\r\n") {
        &line[..line.len() - 2]
    } else if line.ends_with(b"\n") {
        &line[..line.len() - 1]
    } else {
        line
    }
}

// ---- content-type / parameters ----

struct ContentType {
    main: String,
    sub: String,
    params: Vec<(String, String)>,
}

impl ContentType {
    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Missing or malformed values default to `text/plain`.
fn parse_content_type(value: &str) -> ContentType {
    let mut segments = value.split(';');
    let mime = segments.next().unwrap_or("").trim();
    let (main, sub) = match mime.split_once('/') {
        Some((m, s)) => (m.trim().to_ascii_lowercase(), s.trim().to_ascii_lowercase()),
        None => ("text".to_string(), "plain".to_string()),
    };
    let params = segments.filter_map(parse_param).collect();
    ContentType { main, sub, params }
}

fn parse_param(segment: &str) -> Option<(String, String)> {
    let (key, value) = segment.split_once('=')?;
    Some((
        key.trim().to_ascii_lowercase(),
        value.trim().trim_matches('"').to_string(),
    ))
}

fn param_of<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    value.split(';').skip(1).find_map(|segment| {
        let (key, v) = segment.split_once('=')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(v.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

// ---- multipart framing ----

/// Return the raw sub-parts between `--boundary` markers, excluding the
/// line ending that belongs to the marker itself.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let open = format!("--{}", boundary);
    let close = format!("--{}--", boundary);

    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;
    while offset < body.len() {
        let line_end = match body[offset..].iter().position(|&b| b == b'\n') {
            Some(i) => offset + i + 1,
            None => body.len(),
        };
        let line = trim_line_ending(&body[offset..line_end]);
        if line == close.as_bytes() {
            if let Some(s) = start.take() {
                parts.push(strip_trailing_crlf(&body[s..offset]));
            }
            return parts;
        }
        if line == open.as_bytes() {
            if let Some(s) = start {
                parts.push(strip_trailing_crlf(&body[s..offset]));
            }
            start = Some(line_end);
        }
        offset = line_end;
    }
    // Missing close marker: keep what was opened.
    if let Some(s) = start {
        parts.push(strip_trailing_crlf(&body[s..]));
    }
    parts
}

fn strip_trailing_crlf(part: &[u8]) -> &[u8] {
    if part.ends_with(b"\r\n") {
        &part[..part.len() - 2]
    } else if part.ends_with(b"\n") {
        &part[..part.len() - 1]
    } else {
        part
    }
}

// ---- transfer encodings ----

fn decode_transfer(body: &[u8], encoding: Option<&str>) -> Vec<u8> {
    match encoding.map(|e| e.trim().to_ascii_lowercase()).as_deref() {
        Some("base64") => {
            let filtered: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            match BASE64.decode(&filtered) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::debug!(error = %e, "invalid base64 part, keeping raw payload");
                    body.to_vec()
                }
            }
        }
        Some("quoted-printable") => decode_quoted_printable(body),
        _ => body.to_vec(),
    }
}

fn decode_quoted_printable(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let b = body[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }
        // soft line break
        if body.get(i + 1) == Some(&b'\r') && body.get(i + 2) == Some(&b'\n') {
            i += 3;
            continue;
        }
        if body.get(i + 1) == Some(&b'\n') {
            i += 2;
            continue;
        }
        match (
            body.get(i + 1).and_then(hex_val),
            body.get(i + 2).and_then(hex_val),
        ) {
            (Some(hi), Some(lo)) => {
                out.push((hi << 4) | lo);
                i += 3;
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn hex_val(b: &u8) -> Option<u8> {
    (*b as char).to_digit(16).map(|d| d as u8)
}
