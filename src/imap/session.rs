use crate::imap::capability::ServerCapability;
use crate::imap::command::{anonymous, authenticated, selected, ImapCommand};
use crate::imap::flow;
use crate::imap::response::Response;
use crate::storage::Stores;

/// Per-connection session state plus the handles its commands need.
pub struct Instance {
    stores: Stores,
    development: bool,
    capabilities: ServerCapability,
    state: flow::State,
}

impl Instance {
    pub fn new(stores: Stores, development: bool) -> Self {
        Self {
            stores,
            development,
            capabilities: ServerCapability::default(),
            state: flow::State::NotAuthenticated,
        }
    }

    /// Command behavior is modulated by the state; each state has its own
    /// dispatch path so no handler has to re-check it.
    pub async fn command(&mut self, cmd: ImapCommand) -> Response {
        let (resp, transition) = match &self.state {
            flow::State::NotAuthenticated => {
                anonymous::dispatch(anonymous::AnonymousContext {
                    req: &cmd,
                    development: self.development,
                    capabilities: &self.capabilities,
                })
                .await
            }
            flow::State::Authenticated(user) => {
                authenticated::dispatch(authenticated::AuthenticatedContext {
                    req: &cmd,
                    user,
                    stores: &self.stores,
                    capabilities: &self.capabilities,
                })
                .await
            }
            flow::State::Selected(user, mailbox) => {
                selected::dispatch(selected::SelectedContext {
                    req: &cmd,
                    user,
                    mailbox,
                    stores: &self.stores,
                    capabilities: &self.capabilities,
                })
                .await
            }
            flow::State::Logout => (
                Response::build()
                    .to_req(&cmd)
                    .message("No commands are allowed in the LOGOUT state.")
                    .bad(),
                flow::Transition::None,
            ),
        };

        if self.state.apply(transition).is_err() {
            tracing::error!(tag = %cmd.tag, verb = %cmd.verb, "command triggered an illegal state transition");
            return Response::build()
                .to_req(&cmd)
                .message("Internal error, processing command triggered an illegal state transition")
                .bad();
        }

        resp
    }

    pub fn is_logout(&self) -> bool {
        matches!(self.state, flow::State::Logout)
    }
}
