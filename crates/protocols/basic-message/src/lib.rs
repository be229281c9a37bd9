//! Ambient `basicmessage/1.0` support, carried over unconditionally alongside
//! the distinguished protocols rather than budgeted as one of them.

pub mod handlers;

use mediator_core::MessageRouter;

pub fn routes() -> MessageRouter {
    MessageRouter::new().register("https://didcomm.org/basicmessage/1.0/message", handlers::MessageHandlerImpl)
}
