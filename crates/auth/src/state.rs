//! Random `state` and nonce generation.

use rand::RngCore as _;

fn random_hex<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(N * 2), |mut s, b| {
        use std::fmt::Write as _;
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Generate an OAuth2 `state` parameter (32 lowercase hex chars).
#[must_use]
pub fn random_state() -> String {
    random_hex::<16>()
}

/// Generate an OAuth1 `oauth_nonce` (32 lowercase hex chars).
#[must_use]
pub fn nonce() -> String {
    random_hex::<16>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_state_is_hex() {
        let s = random_state();
        assert_eq!(s.len(), 32, "state should be 32 hex chars");
        assert!(
            s.chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_uppercase())
        );
    }

    #[test]
    fn test_random_state_different_each_call() {
        assert_ne!(random_state(), random_state());
    }

    #[test]
    fn test_nonce_is_unreserved() {
        let n = nonce();
        assert_eq!(n.len(), 32);
        assert!(n.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(n, nonce());
    }
}
