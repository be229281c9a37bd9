//! RFC-0160 Connections: invitation, request, response and trust-ping, the
//! legacy handshake the proxy speaks alongside OOB/DID-exchange.

pub mod diddoc;
pub mod extract;
pub mod handlers;
pub mod invitation;
pub mod sig;

use mediator_core::MessageRouter;

pub fn routes() -> MessageRouter {
    MessageRouter::new()
        .register(
            "https://didcomm.org/connections/1.0/request",
            handlers::RequestHandler,
        )
        .register(
            "https://didcomm.org/connections/1.0/response",
            handlers::ResponseHandler,
        )
        .register("https://didcomm.org/trust_ping/1.0/ping", handlers::PingHandler)
        .register(
            "https://didcomm.org/trust_ping/1.0/ping_response",
            handlers::PingResponseHandler,
        )
}

pub use invitation::{create_invitation, receive_invitation};
