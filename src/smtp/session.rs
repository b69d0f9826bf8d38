//! The SMTP-receive session: one task per connection, commands processed
//! strictly in arrival order, transaction state carried by the nullable
//! envelope (no envelope = idle, envelope = transaction in progress).

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::mail::delivery::DeliveryPipeline;
use crate::mail::Envelope;
use crate::proto::line::{DataBody, LineReader};
use crate::registry::SessionHandle;
use crate::smtp::command::{extract_address, SmtpCommand};

/// Timeouts and bounds of one session. Tests inject shorter values.
#[derive(Clone, Debug)]
pub struct SessionParams {
    pub data_line_timeout: Duration,
    pub data_max_lines: usize,
    pub delivery_timeout: Duration,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            data_line_timeout: Duration::from_secs(10),
            data_max_lines: 100_000,
            delivery_timeout: Duration::from_secs(30),
        }
    }
}

pub struct SmtpContext {
    pub hostname: String,
    pub pipeline: DeliveryPipeline,
    pub params: SessionParams,
}

pub async fn serve<S>(stream: S, ctx: Arc<SmtpContext>, handle: SessionHandle) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = LineReader::new(read_half);

    reply(&mut write_half, 220, "SMTP Service Ready").await?;

    let mut envelope: Option<Envelope> = None;
    while let Some(line) = reader.read_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        handle.touch();

        let cmd = match SmtpCommand::parse(&line) {
            Some(cmd) => cmd,
            None => {
                reply(&mut write_half, 500, "Invalid command").await?;
                continue;
            }
        };
        tracing::trace!(session = %handle.id(), verb = %cmd.verb, "smtp command");

        match cmd.verb.as_str() {
            "HELO" | "EHLO" => {
                let peer = cmd.args.first().map(String::as_str).unwrap_or("unknown");
                let text = format!("{} Hello {}", ctx.hostname, peer);
                reply(&mut write_half, 250, &text).await?;
            }
            "MAIL" => {
                let (code, text) = handle_mail(&cmd, &mut envelope);
                reply(&mut write_half, code, text).await?;
            }
            "RCPT" => {
                let (code, text) = handle_rcpt(&cmd, &mut envelope);
                reply(&mut write_half, code, text).await?;
            }
            "DATA" => {
                handle_data(&mut reader, &mut write_half, &ctx, &mut envelope).await?;
            }
            "RSET" => {
                envelope = None;
                reply(&mut write_half, 250, "Reset OK").await?;
            }
            "NOOP" => reply(&mut write_half, 250, "OK").await?,
            "QUIT" => {
                reply(&mut write_half, 221, "Bye").await?;
                break;
            }
            "VRFY" => reply(&mut write_half, 252, "User not verified").await?,
            "EXPN" => reply(&mut write_half, 252, "List not expanded").await?,
            "HELP" => reply(&mut write_half, 214, "Help message").await?,
            _ => reply(&mut write_half, 500, "Unknown command").await?,
        }
    }

    Ok(())
}

fn handle_mail(cmd: &SmtpCommand, envelope: &mut Option<Envelope>) -> (u16, &'static str) {
    if envelope.is_some() {
        return (503, "Sender already specified");
    }
    if cmd.args.is_empty() {
        return (501, "Sender address required");
    }
    let sender = extract_address(&cmd.arg_text());
    if sender.is_empty() {
        return (501, "Sender address required");
    }
    *envelope = Some(Envelope::new(sender));
    (250, "Sender OK")
}

fn handle_rcpt(cmd: &SmtpCommand, envelope: &mut Option<Envelope>) -> (u16, &'static str) {
    let env = match envelope {
        Some(env) => env,
        None => return (503, "Need MAIL command"),
    };
    if cmd.args.is_empty() {
        return (501, "Recipient address required");
    }
    let recipient = extract_address(&cmd.arg_text());
    if recipient.is_empty() {
        return (501, "Recipient address required");
    }
    env.recipients.push(recipient);
    (250, "Recipient OK")
}

async fn handle_data<R, W>(
    reader: &mut LineReader<R>,
    writer: &mut W,
    ctx: &SmtpContext,
    envelope: &mut Option<Envelope>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match envelope.take() {
        None => reply(writer, 503, "Need MAIL command").await?,
        Some(env) if env.recipients.is_empty() => {
            *envelope = Some(env);
            reply(writer, 503, "Need RCPT command").await?;
        }
        Some(mut env) => {
            reply(writer, 354, "End data with <CR><LF>.<CR><LF>").await?;
            let body = reader
                .read_data_block(ctx.params.data_line_timeout, ctx.params.data_max_lines)
                .await?;
            // The transaction ends here either way; the envelope is gone.
            match body {
                DataBody::Complete(data) => {
                    env.data = data;
                    let outcome =
                        tokio::time::timeout(ctx.params.delivery_timeout, ctx.pipeline.deliver(env))
                            .await;
                    match outcome {
                        Ok(Ok(report)) => {
                            tracing::debug!(
                                delivered = report.delivered,
                                skipped = report.skipped,
                                "message processed"
                            );
                            reply(writer, 250, "Message accepted for delivery").await?;
                        }
                        Ok(Err(e)) => {
                            tracing::error!(error = %e, "message processing failed");
                            reply(writer, 500, "Error processing message").await?;
                        }
                        Err(_) => {
                            tracing::error!("delivery pipeline timed out");
                            reply(writer, 500, "Error processing message").await?;
                        }
                    }
                }
                DataBody::TimedOut { partial } => {
                    tracing::warn!(buffered = partial.len(), "DATA read timed out");
                    reply(writer, 500, "Data timeout").await?;
                }
                DataBody::TooLong => {
                    tracing::warn!("DATA exceeded the line limit");
                    reply(writer, 500, "Message too long").await?;
                }
            }
        }
    }
    Ok(())
}

async fn reply<W: AsyncWrite + Unpin>(writer: &mut W, code: u16, text: &str) -> io::Result<()> {
    writer
        .write_all(format!("{} {}\r\n", code, text).as_bytes())
        .await?;
    writer.flush().await
}
