use thiserror::Error;

/// Errors surfaced by connection handling, state transitions and dispatch.
///
/// Each variant carries a stable kebab-case `code()` used to populate
/// outbound problem reports.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed envelope: {0}")]
    InvalidEnvelope(String),

    #[error("no connection matches the recipient keys of this envelope")]
    ConnectionNotFound,

    #[error("illegal state transition: {event} is not valid from {state}")]
    IllegalTransition { state: String, event: String },

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("a mediation request is already pending")]
    RequestAlreadyPending,

    #[error("received a mediation grant without a pending request")]
    UnexpectedMediationGrant,

    #[error("external mediation has not been established yet")]
    ExternalMediationNotEstablished,

    #[error("no agent connection has been established yet")]
    AgentConnectionNotEstablished,

    #[error("no mediator connection has been established yet")]
    MediatorConnectionNotEstablished,

    #[error("forward received from a connection other than the mediator")]
    ForwardFromUnauthorizedConnection,

    #[error("unsupported DID method: {0}")]
    DidMethodNotSupported(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl CoreError {
    /// Kebab-case code used as `description.code` in a problem report.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidEnvelope(_) => "invalid-envelope",
            CoreError::ConnectionNotFound => "connection-not-found",
            CoreError::IllegalTransition { .. } => "illegal-transition",
            CoreError::SignatureInvalid => "signature-invalid",
            CoreError::RequestAlreadyPending => "request-already-pending",
            CoreError::UnexpectedMediationGrant => "unexpected-mediation-grant",
            CoreError::ExternalMediationNotEstablished => "external-mediation-not-established",
            CoreError::AgentConnectionNotEstablished => "agent-connection-not-established",
            CoreError::MediatorConnectionNotEstablished => "mediator-connection-not-established",
            CoreError::ForwardFromUnauthorizedConnection => "forward-from-unauthorized-connection",
            CoreError::DidMethodNotSupported(_) => "did-method-not-supported",
            CoreError::Store(_) => "store-error",
            CoreError::Transport(_) => "transport-error",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
