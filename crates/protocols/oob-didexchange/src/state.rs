use mediator_core::state_machine::{ConnectionEvent, ConnectionState, ProtocolStateMachine};

/// DID-exchange is asymmetric enough (an explicit `complete` message closes
/// it out, rather than a trust-ping) that its two sides need distinct
/// transition tables, unlike the legacy protocol's single symmetric graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Inviter,
    Invitee,
}

pub fn machine() -> ProtocolStateMachine<Role, ConnectionState, ConnectionEvent> {
    use ConnectionEvent::*;
    use ConnectionState::*;
    use Role::*;

    ProtocolStateMachine::new()
        .define(Invitee, Null, ReceiveInvite, Invited)
        .define(Invitee, Invited, SendRequest, RequestSent)
        .define(Invitee, RequestSent, ReceiveResponse, Responded)
        .define(Invitee, Responded, SendComplete, Complete)
        .define(Inviter, InviteSent, ReceiveRequest, Requested)
        .define(Inviter, Requested, SendResponse, ResponseSent)
        .define(Inviter, ResponseSent, ReceiveComplete, Complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionEvent::*;
    use ConnectionState::*;

    #[test]
    fn invitee_reaches_complete_on_its_own_send_complete() {
        let m = machine();
        let s = m.apply(&Role::Invitee, &Null, &ReceiveInvite).unwrap();
        let s = m.apply(&Role::Invitee, &s, &SendRequest).unwrap();
        let s = m.apply(&Role::Invitee, &s, &ReceiveResponse).unwrap();
        let s = m.apply(&Role::Invitee, &s, &SendComplete).unwrap();
        assert_eq!(s, Complete);
    }

    #[test]
    fn inviter_reaches_complete_on_receiving_complete() {
        let m = machine();
        let s = m.apply(&Role::Inviter, &InviteSent, &ReceiveRequest).unwrap();
        let s = m.apply(&Role::Inviter, &s, &SendResponse).unwrap();
        let s = m.apply(&Role::Inviter, &s, &ReceiveComplete).unwrap();
        assert_eq!(s, Complete);
    }

    #[test]
    fn roles_do_not_share_transitions() {
        let m = machine();
        assert!(m.apply(&Role::Inviter, &Null, &ReceiveInvite).is_err());
    }
}
