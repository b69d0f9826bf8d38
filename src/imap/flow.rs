use crate::storage::UserId;

#[derive(Clone, Debug)]
pub struct User {
    pub name: String,
    pub id: UserId,
}

#[derive(Debug)]
pub struct SelectedMailbox {
    pub name: String,
}

/// See RFC3501 section 3.
/// https://datatracker.ietf.org/doc/html/rfc3501#page-13
pub enum State {
    NotAuthenticated,
    Authenticated(User),
    Selected(User, SelectedMailbox),
    Logout,
}

pub enum Transition {
    None,
    Authenticate(User),
    Select(SelectedMailbox),
    Logout,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ForbiddenTransition,
}

impl State {
    pub fn apply(&mut self, tr: Transition) -> Result<(), Error> {
        let current = std::mem::replace(self, State::Logout);
        let next = match (current, tr) {
            (state, Transition::None) => state,
            (State::NotAuthenticated, Transition::Authenticate(user)) => {
                State::Authenticated(user)
            }
            (State::Authenticated(user), Transition::Select(mailbox))
            | (State::Selected(user, _), Transition::Select(mailbox)) => {
                State::Selected(user, mailbox)
            }
            (_, Transition::Logout) => State::Logout,
            (state, _) => {
                *self = state;
                return Err(Error::ForbiddenTransition);
            }
        };
        *self = next;
        Ok(())
    }
}
