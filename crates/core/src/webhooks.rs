//! Payment webhook HMAC signing and verification.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the API layer and any tooling that replays processor events.
//!
//! The processor signs `"{timestamp}.{payload}"` with HMAC-SHA256 and sends
//! the hex signature plus the timestamp in headers. Verification recomputes
//! the MAC and compares in constant time; no event is processed on failure.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Header carrying the hex HMAC signature.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// Header carrying the unix timestamp the signature covers.
pub const TIMESTAMP_HEADER: &str = "x-payment-timestamp";

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Compute the hex HMAC-SHA256 signature over `"{timestamp}.{payload}"`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a header-carried hex signature against the signed payload.
///
/// Comparison happens inside the MAC (constant time). Malformed hex fails
/// verification rather than erroring.
pub fn verify_signature(secret: &str, timestamp: i64, payload: &str, signature: &str) -> bool {
    let Some(expected) = hex::decode(signature) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    mac.verify_slice(&expected).is_ok()
}

// ---------------------------------------------------------------------------
// hex encoding helpers (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string, returning `None` on odd length or bad digits.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_0123456789";

    #[test]
    fn signature_round_trip() {
        let payload = r#"{"type":"credit_purchase","amount":5000}"#;
        let sig = compute_signature(SECRET, 1_700_000_000, payload);
        assert!(verify_signature(SECRET, 1_700_000_000, payload, &sig));
    }

    #[test]
    fn tampered_payload_fails() {
        let sig = compute_signature(SECRET, 1_700_000_000, r#"{"amount":5000}"#);
        assert!(!verify_signature(
            SECRET,
            1_700_000_000,
            r#"{"amount":9000}"#,
            &sig
        ));
    }

    #[test]
    fn tampered_timestamp_fails() {
        let payload = r#"{"amount":5000}"#;
        let sig = compute_signature(SECRET, 1_700_000_000, payload);
        assert!(!verify_signature(SECRET, 1_700_000_060, payload, &sig));
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = r#"{"amount":5000}"#;
        let sig = compute_signature(SECRET, 1_700_000_000, payload);
        assert!(!verify_signature("whsec_other", 1_700_000_000, payload, &sig));
    }

    #[test]
    fn malformed_hex_fails_instead_of_erroring() {
        assert!(!verify_signature(SECRET, 1_700_000_000, "{}", "zz-not-hex"));
        assert!(!verify_signature(SECRET, 1_700_000_000, "{}", "abc"));
    }

    #[test]
    fn hex_decode_round_trip() {
        let bytes = [0u8, 1, 0xab, 0xff];
        assert_eq!(hex::decode(&hex::encode(bytes)).unwrap(), bytes);
    }
}
