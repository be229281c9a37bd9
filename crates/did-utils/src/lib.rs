/*! # did-utils

Utilities for the subset of Decentralized Identifier handling this mediator
needs: Ed25519/X25519 key material, `did:key` multibase encoding, minimal JWK
representation, and the DID Core document shapes used to build and normalize
`did:peer` documents.

*/
pub mod crypto;
pub mod didcore;
pub mod jwk;
pub mod ldmodel;
