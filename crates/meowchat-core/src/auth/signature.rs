//! Request signatures
//!
//! A signature is `hex(sha256("{timestamp}:{message}:{secret}"))`. The secret
//! is shipped with the client build, so this is a tamper/replay check rather
//! than authentication.

use sha2::{Digest, Sha256};

use crate::constants;

/// Signs and verifies request payloads
#[derive(Debug, Clone, Default)]
pub struct Signer {
    secret: String,
}

impl Signer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Whether a non-empty secret is configured
    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Sign `message` at `timestamp` (milliseconds since the epoch)
    pub fn sign(&self, timestamp: i64, message: &str) -> String {
        sign(timestamp, message, &self.secret)
    }

    /// Check a signature and that its timestamp is within the accepted window of `now`
    pub fn verify(&self, timestamp: i64, message: &str, signature: &str, now: i64) -> bool {
        if now.abs_diff(timestamp) > constants::auth::SIGNATURE_WINDOW_MS.unsigned_abs() {
            tracing::debug!(
                "Signature timestamp {} outside window (now {})",
                timestamp,
                now
            );
            return false;
        }
        self.sign(timestamp, message) == signature
    }
}

/// Deterministic signature over a timestamp and the last outgoing message
pub fn sign(timestamp: i64, message: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}", timestamp, message, secret).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_721_708_913_000;

    #[test]
    fn test_sign_is_deterministic() {
        let signer = Signer::new("s3cret");
        assert_eq!(signer.sign(NOW, "hi"), signer.sign(NOW, "hi"));
        assert_eq!(signer.sign(NOW, "hi").len(), 64);
    }

    #[test]
    fn test_sign_changes_with_inputs() {
        let signer = Signer::new("s3cret");
        let base = signer.sign(NOW, "hi");
        assert_ne!(base, signer.sign(NOW + 1, "hi"));
        assert_ne!(base, signer.sign(NOW, "hi!"));
        assert_ne!(base, Signer::new("other").sign(NOW, "hi"));
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(
            sign(1_700_000_000_000, "hi", "meow"),
            "629be8dc624188e5ccf7c75caee97132d6536eb04ccf382477690a1a6e73f785"
        );
    }

    #[test]
    fn test_verify_accepts_fresh_signature() {
        let signer = Signer::new("s3cret");
        let sig = signer.sign(NOW, "2+2?");
        assert!(signer.verify(NOW, "2+2?", &sig, NOW + 1_000));
    }

    #[test]
    fn test_verify_rejects_tampered_message() {
        let signer = Signer::new("s3cret");
        let sig = signer.sign(NOW, "2+2?");
        assert!(!signer.verify(NOW, "2+3?", &sig, NOW));
    }

    #[test]
    fn test_verify_rejects_stale_signature() {
        let signer = Signer::new("s3cret");
        let sig = signer.sign(NOW, "hi");
        let late = NOW + constants::auth::SIGNATURE_WINDOW_MS + 1;
        assert!(!signer.verify(NOW, "hi", &sig, late));
    }

    #[test]
    fn test_verify_rejects_extreme_timestamps() {
        let signer = Signer::new("s3cret");
        for ts in [i64::MIN, i64::MAX] {
            let sig = signer.sign(ts, "hi");
            assert!(!signer.verify(ts, "hi", &sig, NOW));
        }
        assert!(!signer.verify(NOW, "hi", "x", i64::MIN));
    }
}
