//! Shared building blocks for the proxy mediator: the packed-envelope codec,
//! the pairwise connection record and its AuthCrypt pack/unpack, the
//! connection state machines, the process-wide connection registry, and the
//! message dispatcher every protocol crate registers its handlers with.

pub mod connection;
pub mod crypto;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod mediation;
pub mod message;
pub mod problem_report;
pub mod registry;
pub mod state;
pub mod state_machine;

pub use connection::{Connection, ConnectionRecord, Target};
pub use dispatcher::{HandlerContext, MessageHandler, MessageRouter};
pub use error::{CoreError, CoreResult};
pub use mediation::MediationState;
pub use message::Message;
pub use registry::{ProcessState, Registry};
pub use state::{AppState, ProxyConfig};
pub use state_machine::{ConnectionEvent, ConnectionState, ProtocolStateMachine};
