use std::{collections::HashMap, fmt::Debug, hash::Hash};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// States of the legacy RFC-0160 connection protocol. Named after the
/// original `ConnectionMachine` states rather than the more generic
/// `invite_received`/`response_received` vocabulary used elsewhere in this
/// crate's documentation, since the transition table below is a direct port
/// of that state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Null,
    InviteSent,
    Invited,
    RequestSent,
    Requested,
    ResponseSent,
    Responded,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    SendInvite,
    ReceiveInvite,
    SendRequest,
    ReceiveRequest,
    SendResponse,
    ReceiveResponse,
    SendPing,
    ReceivePing,
    SendComplete,
    ReceiveComplete,
    PingResponse,
}

impl ConnectionState {
    /// Applies `event`, returning the resulting state or `IllegalTransition`
    /// if the pair is not one of the legacy protocol's defined edges.
    pub fn apply(self, event: ConnectionEvent) -> Result<ConnectionState, CoreError> {
        use ConnectionEvent::*;
        use ConnectionState::*;

        let next = match (self, event) {
            (Null, SendInvite) => InviteSent,
            (Null, ReceiveInvite) => Invited,
            (InviteSent, ReceiveRequest) => Requested,
            (Requested, SendResponse) => ResponseSent,
            (Invited, SendRequest) => RequestSent,
            (RequestSent, ReceiveResponse) => Responded,
            (Responded, SendPing) => Complete,
            (Responded, SendComplete) => Complete,
            (ResponseSent, ReceivePing) => Complete,
            (ResponseSent, ReceiveComplete) => Complete,
            (Complete, SendPing) => Complete,
            (Complete, ReceivePing) => Complete,
            (Complete, PingResponse) => Complete,
            _ => {
                return Err(CoreError::IllegalTransition {
                    state: format!("{self:?}"),
                    event: format!("{event:?}"),
                })
            }
        };
        Ok(next)
    }
}

/// A generic `role -> state -> event -> state` transition table, for
/// protocols (like OOB/DID-exchange) whose two sides have genuinely
/// different legal events rather than sharing one symmetric graph.
///
/// Mirrors the original `ProtocolStateMachine`/`ImpossibleStateTransition`
/// pattern: an undefined `(role, state, event)` lookup is the sole failure
/// mode, there is no partial matching.
#[derive(Debug, Default)]
pub struct ProtocolStateMachine<R, S, E> {
    transitions: HashMap<(R, S, E), S>,
}

impl<R, S, E> ProtocolStateMachine<R, S, E>
where
    R: Eq + Hash + Clone + Debug,
    S: Eq + Hash + Clone + Debug,
    E: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            transitions: HashMap::new(),
        }
    }

    pub fn define(mut self, role: R, from: S, event: E, to: S) -> Self {
        self.transitions.insert((role, from, event), to);
        self
    }

    pub fn apply(&self, role: &R, state: &S, event: &E) -> Result<S, CoreError> {
        self.transitions
            .get(&(role.clone(), state.clone(), event.clone()))
            .cloned()
            .ok_or_else(|| CoreError::IllegalTransition {
                state: format!("{state:?} (role {role:?})"),
                event: format!("{event:?}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_inviter_path_reaches_complete() {
        use ConnectionEvent::*;
        use ConnectionState::*;

        let s = Null.apply(SendInvite).unwrap();
        assert_eq!(s, InviteSent);
        let s = s.apply(ReceiveRequest).unwrap();
        assert_eq!(s, Requested);
        let s = s.apply(SendResponse).unwrap();
        assert_eq!(s, ResponseSent);
        let s = s.apply(ReceivePing).unwrap();
        assert_eq!(s, Complete);
    }

    #[test]
    fn legacy_invitee_path_reaches_complete() {
        use ConnectionEvent::*;
        use ConnectionState::*;

        let s = Null.apply(ReceiveInvite).unwrap();
        assert_eq!(s, Invited);
        let s = s.apply(SendRequest).unwrap();
        assert_eq!(s, RequestSent);
        let s = s.apply(ReceiveResponse).unwrap();
        assert_eq!(s, Responded);
        let s = s.apply(SendPing).unwrap();
        assert_eq!(s, Complete);
    }

    #[test]
    fn complete_to_complete_is_a_permitted_self_loop() {
        use ConnectionEvent::*;
        use ConnectionState::*;

        assert_eq!(Complete.apply(SendPing).unwrap(), Complete);
        assert_eq!(Complete.apply(ReceivePing).unwrap(), Complete);
    }

    #[test]
    fn undefined_transition_is_illegal() {
        use ConnectionEvent::*;
        use ConnectionState::*;

        let err = Null.apply(SendResponse).unwrap_err();
        assert!(matches!(err, CoreError::IllegalTransition { .. }));
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Role {
        Inviter,
        Invitee,
    }
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum St {
        Start,
        ReqSent,
        Done,
    }
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Ev {
        Send,
        Receive,
    }

    #[test]
    fn generic_machine_rejects_undefined_role_event() {
        let machine = ProtocolStateMachine::new()
            .define(Role::Invitee, St::Start, Ev::Send, St::ReqSent)
            .define(Role::Inviter, St::ReqSent, Ev::Receive, St::Done);

        assert_eq!(
            machine.apply(&Role::Invitee, &St::Start, &Ev::Send).unwrap(),
            St::ReqSent
        );
        assert!(machine.apply(&Role::Inviter, &St::Start, &Ev::Send).is_err());
    }
}
