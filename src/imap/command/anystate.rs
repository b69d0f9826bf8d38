//! Handlers valid in any state.

use crate::imap::capability::ServerCapability;
use crate::imap::flow::Transition;
use crate::imap::response::Response;

pub fn capability(tag: String, capabilities: &ServerCapability) -> (Response, Transition) {
    (
        Response::build()
            .tag(tag)
            .message("CAPABILITY completed")
            .data(format!("CAPABILITY {}", capabilities.advertisement()))
            .ok(),
        Transition::None,
    )
}

pub fn noop(tag: String) -> (Response, Transition) {
    (
        Response::build().tag(tag).message("NOOP completed").ok(),
        Transition::None,
    )
}

pub fn logout(tag: String) -> (Response, Transition) {
    (
        Response::build().tag(tag).message("LOGOUT completed").ok(),
        Transition::Logout,
    )
}

pub fn unknown(tag: String) -> (Response, Transition) {
    (
        Response::build().tag(tag).message("Unknown command").bad(),
        Transition::None,
    )
}
