//! SELECTED state. FETCH/SEARCH/STORE/EXPUNGE answer with the minimal
//! placeholder subset; real sequence-number and flag semantics live in a
//! separately-scoped extension.

use crate::imap::capability::ServerCapability;
use crate::imap::command::{anystate, authenticated, ImapCommand};
use crate::imap::flow::{SelectedMailbox, Transition, User};
use crate::imap::response::Response;
use crate::storage::Stores;

pub struct SelectedContext<'a> {
    pub req: &'a ImapCommand,
    pub user: &'a User,
    pub mailbox: &'a SelectedMailbox,
    pub stores: &'a Stores,
    pub capabilities: &'a ServerCapability,
}

pub async fn dispatch(ctx: SelectedContext<'_>) -> (Response, Transition) {
    match ctx.req.verb.as_str() {
        // Any state
        "CAPABILITY" => anystate::capability(ctx.req.tag.clone(), ctx.capabilities),
        "NOOP" => anystate::noop(ctx.req.tag.clone()),
        "LOGOUT" => anystate::logout(ctx.req.tag.clone()),

        // Also allowed while a mailbox is selected
        "SELECT" => authenticated::select(ctx.req, ctx.user, ctx.stores).await,
        "LIST" => authenticated::list(ctx.req),

        // Specific to this state
        "FETCH" => ctx.fetch().await,
        "SEARCH" => ctx.search(),
        "STORE" => ctx.store(),
        "EXPUNGE" => ctx.expunge(),

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
        _ => anystate::unknown(ctx.req.tag.clone()),
    }
}

impl<'a> SelectedContext<'a> {
    async fn fetch(self) -> (Response, Transition) {
        let (message_set, _data_items) = match (self.req.args.first(), self.req.args.get(1)) {
            (Some(set), Some(items)) => (set.clone(), items),
            _ => {
                return (
                    Response::build()
                        .to_req(self.req)
                        .message("FETCH requires message set and data items")
                        .bad(),
                    Transition::None,
                )
            }
        };

        match self
            .stores
            .emails
            .emails_for_mailbox(&self.user.id, &self.mailbox.name)
            .await
        {
            Ok(summaries) => {
                let size = summaries.first().map(|s| s.size).unwrap_or(0);
                (
                    Response::build()
                        .to_req(self.req)
                        .data(format!(
                            "{} FETCH (FLAGS (\\Seen) UID {} RFC822.SIZE {})",
                            message_set, message_set, size
                        ))
                        .message("FETCH completed")
                        .ok(),
                    Transition::None,
                )
            }
            Err(e) => {
                tracing::warn!(mailbox = %self.mailbox.name, error = %e, "FETCH query failed");
                (
                    Response::build().to_req(self.req).message("FETCH failed").no(),
                    Transition::None,
                )
            }
        }
    }

    fn search(self) -> (Response, Transition) {
        (
            Response::build()
                .to_req(self.req)
                .data("SEARCH 1 2 3 4 5")
                .message("SEARCH completed")
                .ok(),
            Transition::None,
        )
    }

    fn store(self) -> (Response, Transition) {
        (
            Response::build()
                .to_req(self.req)
                .message("STORE completed")
                .ok(),
            Transition::None,
        )
    }

    fn expunge(self) -> (Response, Transition) {
        (
            Response::build()
                .to_req(self.req)
                .message("EXPUNGE completed")
                .ok(),
            Transition::None,
        )
    }
}
