//! NOT_AUTHENTICATED state: greeting-time commands, STARTTLS
//! acknowledgement and the two authentication paths.

use crate::imap::capability::ServerCapability;
use crate::imap::command::{anystate, ImapCommand};
use crate::imap::flow::{Transition, User};
use crate::imap::response::Response;
use crate::storage::UserId;

pub struct AnonymousContext<'a> {
    pub req: &'a ImapCommand,
    pub development: bool,
    pub capabilities: &'a ServerCapability,
}

pub async fn dispatch(ctx: AnonymousContext<'_>) -> (Response, Transition) {
    match ctx.req.verb.as_str() {
        // Any state
        "CAPABILITY" => anystate::capability(ctx.req.tag.clone(), ctx.capabilities),
        "NOOP" => anystate::noop(ctx.req.tag.clone()),
        "LOGOUT" => anystate::logout(ctx.req.tag.clone()),

        // Specific to this state
        "STARTTLS" => ctx.starttls(),
        "AUTHENTICATE" => ctx.authenticate(),
        "LOGIN" => ctx.login(),

        "SELECT" | "LIST" => (
            Response::build()
                .to_req(ctx.req)
                .message("Not authenticated")
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

impl<'a> AnonymousContext<'a> {
    /// The handshake itself happens in front of this process; the command
    /// is only acknowledged here.
    fn starttls(self) -> (Response, Transition) {
        (
            Response::build()
                .to_req(self.req)
                .message("Begin TLS negotiation now")
                .ok(),
            Transition::None,
        )
    }

    fn authenticate(self) -> (Response, Transition) {
        let supported = self
            .req
            .args
            .first()
            .map(|mech| {
                let mech = mech.to_ascii_uppercase();
                mech == "PLAIN" || mech == "LOGIN"
            })
            .unwrap_or(false);
        if !supported {
            return (
                Response::build()
                    .to_req(self.req)
                    .message("Unsupported authentication method")
                    .bad(),
                Transition::None,
            );
        }

        // Development policy: any mechanism exchange succeeds and binds the
        // placeholder identity.
        if self.development {
            let user = User {
                name: "dev_user".to_string(),
                id: UserId("dev_user".to_string()),
            };
            tracing::info!(user = %user.name, "authenticated (development mode)");
            (
                Response::build()
                    .to_req(self.req)
                    .message("Authentication successful")
                    .ok(),
                Transition::Authenticate(user),
            )
        } else {
            (
                Response::build()
                    .to_req(self.req)
                    .message("Authentication failed")
                    .no(),
                Transition::None,
            )
        }
    }

    fn login(self) -> (Response, Transition) {
        let (username, _password) = match (self.req.args.first(), self.req.args.get(1)) {
            (Some(u), Some(p)) => (u.clone(), p),
            _ => {
                return (
                    Response::build()
                        .to_req(self.req)
                        .message("LOGIN requires username and password")
                        .bad(),
                    Transition::None,
                )
            }
        };

        if self.development {
            tracing::info!(user = %username, "logged in (development mode)");
            let user = User {
                id: UserId(username.clone()),
                name: username,
            };
            (
                Response::build()
                    .to_req(self.req)
                    .message("LOGIN completed")
                    .ok(),
                Transition::Authenticate(user),
            )
        } else {
            (
                Response::build()
                    .to_req(self.req)
                    .message("Login failed")
                    .no(),
                Transition::None,
            )
        }
    }
}
