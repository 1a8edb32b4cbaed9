//! Request authentication for the two inbound trust boundaries
//!
//! The game webhook is protected by a shared secret, the Discord Interactions
//! endpoint by an Ed25519 signature. The two checks share no key material.

pub mod signature;
pub mod webhook;

pub use signature::{
    parse_public_key, verify_interaction_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
pub use webhook::{verify_webhook_auth, SHARED_SECRET_HEADER};
