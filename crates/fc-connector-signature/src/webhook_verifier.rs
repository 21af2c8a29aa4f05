//! GET webhook verification handshake (`hub.mode` / `hub.verify_token` /
//! `hub.challenge`), the setup-time counterpart to body signing above.
//!
//! There is no teacher precedent for this exact handshake — `fc-router`
//! never registers outbound webhooks with a third party — so this is built
//! from the platform behavior described directly, kept in the same
//! module-per-concern shape as `hmac_verifier`.

/// Why a handshake attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeErrorCode {
    /// `hub.mode` was present but not `"subscribe"`.
    UnsupportedMode,
    /// `hub.verify_token` did not match the configured token.
    TokenMismatch,
    /// One or more required query parameters were absent.
    MissingParameter,
}

impl HandshakeErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandshakeErrorCode::UnsupportedMode => "UNSUPPORTED_MODE",
            HandshakeErrorCode::TokenMismatch => "TOKEN_MISMATCH",
            HandshakeErrorCode::MissingParameter => "MISSING_PARAMETER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The caller should echo this value back as the response body.
    Confirmed { challenge: String },
    Rejected { code: HandshakeErrorCode },
}

/// Verifies a connector's webhook-registration handshake against a
/// configured verify token.
#[derive(Clone)]
pub struct WebhookVerifier {
    verify_token: String,
}

impl WebhookVerifier {
    pub fn new(verify_token: impl Into<String>) -> Self {
        Self {
            verify_token: verify_token.into(),
        }
    }

    /// `mode`, `token`, and `challenge` are the raw `hub.mode`,
    /// `hub.verify_token`, and `hub.challenge` query parameters. Token
    /// comparison is plain string equality: the verify token is a setup-time
    /// shared secret chosen by the connector operator, not a cryptographic
    /// signature, so there is no replay or timing concern that would call
    /// for `subtle` here.
    pub fn verify(
        &self,
        mode: Option<&str>,
        token: Option<&str>,
        challenge: Option<&str>,
    ) -> HandshakeOutcome {
        let (Some(mode), Some(token), Some(challenge)) = (mode, token, challenge) else {
            return HandshakeOutcome::Rejected {
                code: HandshakeErrorCode::MissingParameter,
            };
        };

        if mode != "subscribe" {
            return HandshakeOutcome::Rejected {
                code: HandshakeErrorCode::UnsupportedMode,
            };
        }

        if token != self.verify_token {
            return HandshakeOutcome::Rejected {
                code: HandshakeErrorCode::TokenMismatch,
            };
        }

        HandshakeOutcome::Confirmed {
            challenge: challenge.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_token_and_subscribe_mode_echoes_challenge() {
        let verifier = WebhookVerifier::new("s3cr3t-token");
        let outcome = verifier.verify(Some("subscribe"), Some("s3cr3t-token"), Some("12345"));
        assert_eq!(
            outcome,
            HandshakeOutcome::Confirmed {
                challenge: "12345".to_string()
            }
        );
    }

    #[test]
    fn mismatched_token_is_rejected() {
        let verifier = WebhookVerifier::new("s3cr3t-token");
        let outcome = verifier.verify(Some("subscribe"), Some("wrong"), Some("12345"));
        assert_eq!(
            outcome,
            HandshakeOutcome::Rejected {
                code: HandshakeErrorCode::TokenMismatch
            }
        );
    }

    #[test]
    fn unsupported_mode_is_rejected() {
        let verifier = WebhookVerifier::new("s3cr3t-token");
        let outcome = verifier.verify(Some("unsubscribe"), Some("s3cr3t-token"), Some("12345"));
        assert_eq!(
            outcome,
            HandshakeOutcome::Rejected {
                code: HandshakeErrorCode::UnsupportedMode
            }
        );
    }

    #[test]
    fn missing_parameters_are_rejected() {
        let verifier = WebhookVerifier::new("s3cr3t-token");
        let outcome = verifier.verify(Some("subscribe"), None, Some("12345"));
        assert_eq!(
            outcome,
            HandshakeOutcome::Rejected {
                code: HandshakeErrorCode::MissingParameter
            }
        );
    }
}
