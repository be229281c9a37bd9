//! RFC-0434 Out-of-Band invitation plus RFC-0023 DID-exchange: `did:key`
//! addressed invitations, signed `did_doc~attach` documents, and this
//! proxy's own `did:peer:2` identifiers. Also the one place third-party
//! peers' non-normalized documents get rewritten into did-core shape.

pub mod diddoc;
pub mod extract;
pub mod handlers;
pub mod invitation;
pub mod jws;
pub mod normalize;
pub mod peer;
pub mod state;

use mediator_core::MessageRouter;

pub fn routes() -> MessageRouter {
    MessageRouter::new()
        .register("https://didcomm.org/didexchange/1.0/request", handlers::RequestHandler)
        .register("https://didcomm.org/didexchange/1.0/response", handlers::ResponseHandler)
        .register("https://didcomm.org/didexchange/1.0/complete", handlers::CompleteHandler)
}

pub use invitation::{create_invitation, receive_invitation};
