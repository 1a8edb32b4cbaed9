use subtle::ConstantTimeEq;

/// Header carrying the game engine's shared secret
pub const SHARED_SECRET_HEADER: &str = "x-shared-secret";

/// Check the game webhook's shared secret.
///
/// Fails closed: a missing header or an empty configured secret never
/// authenticates. The comparison runs over both values padded to the same
/// length, so its cost does not depend on how long the matching prefix is.
pub fn verify_webhook_auth(header_value: Option<&str>, configured_secret: &str) -> bool {
    let provided = match header_value {
        Some(value) => value,
        None => return false,
    };
    if configured_secret.is_empty() {
        return false;
    }

    let max_len = std::cmp::max(provided.len(), configured_secret.len());

    // Different pad bytes so a length mismatch can never compare equal
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..provided.len()].copy_from_slice(provided.as_bytes());
    b_padded[..configured_secret.len()].copy_from_slice(configured_secret.as_bytes());

    let lengths_equal = provided.len().ct_eq(&configured_secret.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secret() {
        assert!(verify_webhook_auth(Some("s3cret"), "s3cret"));
    }

    #[test]
    fn test_fails_closed() {
        assert!(!verify_webhook_auth(None, "s3cret"));
        assert!(!verify_webhook_auth(Some(""), "s3cret"));
        assert!(!verify_webhook_auth(Some(""), ""));
        assert!(!verify_webhook_auth(Some("anything"), ""));
    }

    #[test]
    fn test_mismatch_and_prefixes() {
        assert!(!verify_webhook_auth(Some("s3creT"), "s3cret"));
        assert!(!verify_webhook_auth(Some("s3c"), "s3cret"));
        assert!(!verify_webhook_auth(Some("s3cret-and-more"), "s3cret"));
        // Trailing pad bytes must not make a shorter value match
        assert!(!verify_webhook_auth(Some("s3cret\u{0}"), "s3cret"));
    }
}
