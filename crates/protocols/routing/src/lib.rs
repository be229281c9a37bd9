//! RFC-0094 Cross Domain Messaging: the `forward` message that carries an
//! already-packed envelope from the upstream mediator to the local agent.

pub mod handlers;

use mediator_core::MessageRouter;

pub fn routes() -> MessageRouter {
    MessageRouter::new().register("https://didcomm.org/routing/1.0/forward", handlers::ForwardHandler)
}
