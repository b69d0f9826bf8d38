//! AUTHENTICATED state: mailbox selection and listing.

use crate::imap::capability::ServerCapability;
use crate::imap::command::{anystate, ImapCommand};
use crate::imap::flow::{SelectedMailbox, Transition, User};
use crate::imap::response::Response;
use crate::storage::Stores;

/// The fixed mailbox set every account gets.
pub const MAILBOXES: [&str; 5] = ["INBOX", "Sent", "Drafts", "Trash", "Spam"];

pub struct AuthenticatedContext<'a> {
    pub req: &'a ImapCommand,
    pub user: &'a User,
    pub stores: &'a Stores,
    pub capabilities: &'a ServerCapability,
}

pub async fn dispatch(ctx: AuthenticatedContext<'_>) -> (Response, Transition) {
    match ctx.req.verb.as_str() {
        // Any state
        "CAPABILITY" => anystate::capability(ctx.req.tag.clone(), ctx.capabilities),
        "NOOP" => anystate::noop(ctx.req.tag.clone()),
        "LOGOUT" => anystate::logout(ctx.req.tag.clone()),

        // Specific to this state
        "SELECT" => select(ctx.req, ctx.user, ctx.stores).await,
        "LIST" => list(ctx.req),

        "STARTTLS" => (
            Response::build()
                .to_req(ctx.req)
                .message("STARTTLS not allowed in current state")
                .bad(),
            Transition::None,
        ),
        "AUTHENTICATE" | "LOGIN" => (
            Response::build()
                .to_req(ctx.req)
                .message("Already authenticated")
                .bad(),
            Transition::None,
        ),
        "FETCH" | "SEARCH" | "STORE" | "EXPUNGE" => (
            Response::build()
                .to_req(ctx.req)
                .message("No mailbox selected")
                .bad(),
            Transition::None,
        ),
        _ => anystate::unknown(ctx.req.tag.clone()),
    }
}

/// Shared with the SELECTED state, which may switch mailboxes.
pub(crate) async fn select(
    req: &ImapCommand,
    user: &User,
    stores: &Stores,
) -> (Response, Transition) {
    let name = match req.args.first() {
        Some(raw) => raw.trim_matches('"').to_string(),
        None => {
            return (
                Response::build()
                    .to_req(req)
                    .message("SELECT requires mailbox name")
                    .bad(),
                Transition::None,
            )
        }
    };

    match stores.emails.emails_for_mailbox(&user.id, &name).await {
        Ok(summaries) => {
            let exists = summaries.len();
            let unseen = summaries.iter().filter(|s| !s.is_read).count();
            tracing::debug!(user = %user.name, mailbox = %name, exists, unseen, "mailbox selected");
            (
                Response::build()
                    .to_req(req)
                    .data(format!("{} EXISTS", exists))
                    .data("0 RECENT")
                    .data(format!("OK [UNSEEN {}] Unseen messages", unseen))
                    .data("OK [UIDVALIDITY 1] UIDs valid")
                    .data(format!("OK [UIDNEXT {}] Predicted next UID", exists + 1))
                    .message(format!("[READ-WRITE] {} selected", name))
                    .ok(),
                Transition::Select(SelectedMailbox { name }),
            )
        }
        Err(e) => {
            tracing::warn!(user = %user.name, mailbox = %name, error = %e, "SELECT query failed");
            (
                Response::build().to_req(req).message("SELECT failed").no(),
                Transition::None,
            )
        }
    }
}

/// Shared with the SELECTED state.
pub(crate) fn list(req: &ImapCommand) -> (Response, Transition) {
    let mut builder = Response::build().to_req(req).message("LIST completed");
    for mailbox in MAILBOXES {
        builder = builder.data(format!("LIST (\\HasNoChildren) \"/\" \"{}\"", mailbox));
    }
    (builder.ok(), Transition::None)
}
