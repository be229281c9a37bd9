//! RFC-0211 Coordinate Mediation: requesting mediation from the upstream
//! cloud mediator, and granting it to the local agent this proxy serves.

pub mod client;
pub mod handlers;

use mediator_core::MessageRouter;

pub fn routes() -> MessageRouter {
    MessageRouter::new()
        .register("https://didcomm.org/coordinate-mediation/1.0/mediate-request", handlers::MediateRequestHandler)
        .register("https://didcomm.org/coordinate-mediation/1.0/mediate-grant", handlers::MediateGrantHandler)
        .register("https://didcomm.org/coordinate-mediation/1.0/keylist-update", handlers::KeylistUpdateHandler)
        .register(
            "https://didcomm.org/coordinate-mediation/1.0/keylist-update-response",
            handlers::KeylistUpdateResponseHandler,
        )
}

pub use client::{request_mediation_from_external, send_keylist_update};
