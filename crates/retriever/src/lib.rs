//! Active message retriever: a websocket session to the upstream mediator
//! with a periodic trust-ping keepalive, so forwards queued while this
//! proxy was unreachable get flushed back over the same socket.

pub mod endpoint;
pub mod retriever;

pub use retriever::{start, RetrieverHandle};
