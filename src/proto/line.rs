//! Line framing over a raw byte stream: one CRLF-terminated command line at
//! a time (bare LF tolerated, invalid bytes replaced), plus the bounded
//! multi-line read that services the SMTP DATA phase.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::time::timeout;

/// Outcome of a DATA-phase read. `Complete` also covers EOF before the
/// terminator: the transaction proceeds with whatever was buffered.
pub enum DataBody {
    Complete(Vec<u8>),
    TimedOut { partial: Vec<u8> },
    TooLong,
}

pub struct LineReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }

    /// Read one line without its ending. `None` on EOF.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        let n = self.inner.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        let mut line = String::from_utf8_lossy(&buf).into_owned();
        if line.ends_with('\n') {
            line.pop();
        }
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Read a message body until a line holding a single `.`, undoing
    /// receiver-side dot-stuffing (the leading dot of a dotted line is
    /// deleted, so `..` becomes `.`). Each line read is bounded by
    /// `line_timeout` and the whole body by `max_lines`.
    pub async fn read_data_block(
        &mut self,
        line_timeout: Duration,
        max_lines: usize,
    ) -> io::Result<DataBody> {
        let mut data: Vec<u8> = Vec::new();
        let mut lines = 0usize;
        loop {
            let mut buf = Vec::new();
            let n = match timeout(line_timeout, self.inner.read_until(b'\n', &mut buf)).await {
                Ok(read) => read?,
                Err(_) => return Ok(DataBody::TimedOut { partial: data }),
            };
            if n == 0 {
                break;
            }
            lines += 1;
            if lines > max_lines {
                return Ok(DataBody::TooLong);
            }
            if without_line_ending(&buf) == b"." {
                break;
            }
            let content = match buf.first() {
                Some(b'.') => &buf[1..],
                _ => &buf[..],
            };
            data.extend_from_slice(content);
        }
        Ok(DataBody::Complete(data))
    }
}

fn without_line_ending(line: &[u8]) -> &[u8] {
    if line.ends_with(b"\r\n") {
        &line[..line.len() - 2]
    } else if line.ends_with(b"\n") {
        &line[..line.len() - 1]
    } else {
        line
    }
}
