//! Discord Interactions request signatures
//!
//! Discord signs every interaction request with the application's Ed25519 key.
//! The signed message is the `X-Signature-Timestamp` header value followed by
//! the request body exactly as received. Verification must happen on those raw
//! bytes, before the body is parsed.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::error::{NotifierError, Result};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Parse the application public key from its hex form (as shown in the developer portal)
pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey> {
    let bytes = hex::decode(hex_key.trim()).map_err(|e| NotifierError::ConfigValidation {
        message: format!("DISCORD_PUBLIC_KEY is not valid hex: {}", e),
    })?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| NotifierError::ConfigValidation {
            message: "DISCORD_PUBLIC_KEY must be 32 bytes".to_string(),
        })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| NotifierError::ConfigValidation {
        message: format!("DISCORD_PUBLIC_KEY is not a valid Ed25519 key: {}", e),
    })
}

/// Verify an interaction request signature over `timestamp || raw_body`.
///
/// Returns `false` for missing headers, signatures that are not 64 bytes of
/// hex, and signatures that do not verify.
pub fn verify_interaction_signature(
    raw_body: &[u8],
    signature_header: Option<&str>,
    timestamp_header: Option<&str>,
    public_key: &VerifyingKey,
) -> bool {
    let (signature_hex, timestamp) = match (signature_header, timestamp_header) {
        (Some(s), Some(t)) if !s.is_empty() && !t.is_empty() => (s, t),
        _ => return false,
    };

    let signature_bytes: [u8; 64] = match hex::decode(signature_hex.trim()) {
        Ok(bytes) => match bytes.try_into() {
            Ok(array) => array,
            Err(_) => return false,
        },
        Err(_) => return false,
    };
    let signature = Signature::from_bytes(&signature_bytes);

    let mut message = Vec::with_capacity(timestamp.len() + raw_body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(raw_body);

    public_key.verify(&message, &signature).is_ok()
}
