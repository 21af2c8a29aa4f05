//! HMAC-SHA256 request signature verification.
//!
//! The receiving-side dual of `fc-router::mediator::sign_webhook`: that
//! function computes `hex(HMAC-SHA256(secret, timestamp + body))` to sign
//! FlowCatalyst's own outbound webhooks. Here we verify a different header
//! and a different payload (the platform signs the raw body alone, not
//! `timestamp + body`), but the HMAC construction — `Hmac<Sha256>::new_from_slice`,
//! `.update(...)`, `.finalize()`, hex-encode — is the same primitive reused
//! for the opposite direction.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// The header carrying the platform's signature, e.g. `x-hub-signature-256`.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Why a signature check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureErrorCode {
    InvalidSignature,
    MissingSignature,
    MissingRawBody,
}

impl SignatureErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            SignatureErrorCode::MissingSignature => "MISSING_SIGNATURE",
            SignatureErrorCode::MissingRawBody => "MISSING_RAW_BODY",
        }
    }
}

/// Outcome of a signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub code: Option<SignatureErrorCode>,
}

impl VerifyOutcome {
    fn ok() -> Self {
        Self { valid: true, code: None }
    }

    fn fail(code: SignatureErrorCode) -> Self {
        Self { valid: false, code: Some(code) }
    }
}

/// Verifies HMAC-SHA256 request signatures over a shared secret.
///
/// When constructed without a secret the verifier is disabled: `verify`
/// always returns `{valid: true}` and the caller is expected to log a
/// one-line "signature validation skipped" note (this crate never logs —
/// it never sees the body, the secret, or the signature value in a log
/// line, by construction).
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Option<Vec<u8>>,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.map(String::into_bytes),
        }
    }

    pub fn disabled() -> Self {
        Self { secret: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify `raw_body` against the `sha256=<hex>` value of the signature
    /// header. `raw_body` is `None` when the adapter failed to capture the
    /// raw bytes — the caller treats that as a configuration error (500),
    /// distinct from a verification failure (401), but still routes through
    /// this method so the error code vocabulary stays in one place.
    pub fn verify(&self, raw_body: Option<&[u8]>, signature_header: Option<&str>) -> VerifyOutcome {
        let Some(secret) = &self.secret else {
            return VerifyOutcome::ok();
        };

        let Some(raw_body) = raw_body else {
            return VerifyOutcome::fail(SignatureErrorCode::MissingRawBody);
        };

        if raw_body.is_empty() {
            return VerifyOutcome::fail(SignatureErrorCode::MissingRawBody);
        }

        let Some(header_value) = signature_header else {
            return VerifyOutcome::fail(SignatureErrorCode::MissingSignature);
        };

        let Some(hex_signature) = header_value.strip_prefix("sha256=") else {
            return VerifyOutcome::fail(SignatureErrorCode::InvalidSignature);
        };

        let Ok(expected_bytes) = hex::decode(hex_signature) else {
            return VerifyOutcome::fail(SignatureErrorCode::InvalidSignature);
        };

        let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts a key of any size");
        mac.update(raw_body);
        let computed = mac.finalize().into_bytes();

        if computed.ct_eq(&expected_bytes).into() {
            VerifyOutcome::ok()
        } else {
            VerifyOutcome::fail(SignatureErrorCode::InvalidSignature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn disabled_verifier_always_passes() {
        let verifier = SignatureVerifier::disabled();
        assert!(verifier.verify(None, None).valid);
    }

    #[test]
    fn valid_signature_passes() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));
        let body = b"{\"hello\":\"world\"}";
        let header = sign("topsecret", body);
        let outcome = verifier.verify(Some(body), Some(&header));
        assert!(outcome.valid);
        assert_eq!(outcome.code, None);
    }

    #[test]
    fn wrong_secret_fails() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));
        let body = b"{\"hello\":\"world\"}";
        let header = sign("wrong-secret", body);
        let outcome = verifier.verify(Some(body), Some(&header));
        assert!(!outcome.valid);
        assert_eq!(outcome.code, Some(SignatureErrorCode::InvalidSignature));
    }

    #[test]
    fn missing_header_fails() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));
        let outcome = verifier.verify(Some(b"body"), None);
        assert_eq!(outcome.code, Some(SignatureErrorCode::MissingSignature));
    }

    #[test]
    fn missing_raw_body_fails() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));
        let outcome = verifier.verify(None, Some("sha256=deadbeef"));
        assert_eq!(outcome.code, Some(SignatureErrorCode::MissingRawBody));
    }

    #[test]
    fn empty_raw_body_fails() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));
        let outcome = verifier.verify(Some(b""), Some("sha256=deadbeef"));
        assert_eq!(outcome.code, Some(SignatureErrorCode::MissingRawBody));
    }

    #[test]
    fn malformed_header_fails() {
        let verifier = SignatureVerifier::new(Some("topsecret".to_string()));
        let outcome = verifier.verify(Some(b"body"), Some("not-a-signature"));
        assert_eq!(outcome.code, Some(SignatureErrorCode::InvalidSignature));
    }

    #[test]
    fn signature_check_is_independent_of_caller_header_casing_of_the_value() {
        // Determinism: same (secret, body) always yields the same verdict.
        let verifier = SignatureVerifier::new(Some("s3cret".to_string()));
        let body = b"payload-bytes";
        let header = sign("s3cret", body);
        for _ in 0..5 {
            assert!(verifier.verify(Some(body), Some(&header)).valid);
        }
    }
}
