//! Bearer-token authentication for the notes API.
//!
//! Two credential schemes are supported: locally issued HS256 tokens and
//! opaque identity-provider access tokens validated against the provider's
//! "current user" endpoint. The [`gate::AuthenticationGate`] runs both in
//! order on every non-bypassed request and attaches a [`Principal`] to the
//! request on the first success. It never rejects a request itself; missing
//! principals are enforced by the handlers.

pub mod gate;
pub mod local;
pub mod principal;
pub mod remote;

pub use gate::{AuthenticationGate, CredentialScheme};
pub use local::{LocalTokenVerifier, TokenIssuer};
pub use principal::Principal;
pub use remote::{IdentityCache, RemoteTokenValidator};

use sha2::{Digest, Sha256};
use std::fmt;

/// Authentication errors.
///
/// `NoCredential` is not a failure: it means "this scheme does not apply,
/// try the next one". Everything else means a credential was presented and
/// rejected. All variants are swallowed at the gate boundary.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Header missing or not shaped for this scheme; try the next scheme.
    NoCredential,
    /// Signature mismatch, malformed structure, or provider rejection.
    InvalidCredential(String),
    /// Locally issued token past its expiry.
    Expired,
    /// Identity provider unreachable or timed out.
    UpstreamUnavailable(String),
    /// Unexpected internal failure inside a verifier.
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredential => write!(f, "No credential presented"),
            Self::InvalidCredential(msg) => write!(f, "Invalid credential: {}", msg),
            Self::Expired => write!(f, "Token has expired"),
            Self::UpstreamUnavailable(msg) => write!(f, "Identity provider unavailable: {}", msg),
            Self::Internal(msg) => write!(f, "Internal authentication error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Extract the token from a `Bearer <token>` authorization header value.
///
/// Returns `None` for a missing header, a different scheme, or an empty
/// token, which all mean "no credential" to both verifiers.
pub(crate) fn bearer_token(header: Option<&str>) -> Option<&str> {
    let token = header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Short SHA-256 fingerprint of a token for diagnostics.
///
/// Raw token values are sensitive and must never be logged; this is the
/// only loggable form.
pub(crate) fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(Some("Bearer  padded ")), Some("padded"));
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Bearer    ")), None);
        assert_eq!(bearer_token(Some("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(Some("bearer abc")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_token_fingerprint_stable_and_short() {
        let fp1 = token_fingerprint("secret-token");
        let fp2 = token_fingerprint("secret-token");
        let fp3 = token_fingerprint("other-token");

        assert_eq!(fp1, fp2);
        assert_ne!(fp1, fp3);
        assert_eq!(fp1.len(), 12);
        assert!(fp1.chars().all(|c| c.is_ascii_hexdigit()));
        // The fingerprint must not leak the raw token.
        assert!(!fp1.contains("secret"));
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(AuthError::NoCredential.to_string(), "No credential presented");
        assert_eq!(AuthError::Expired.to_string(), "Token has expired");
        assert_eq!(
            AuthError::InvalidCredential("bad signature".to_string()).to_string(),
            "Invalid credential: bad signature"
        );
        assert_eq!(
            AuthError::UpstreamUnavailable("timeout".to_string()).to_string(),
            "Identity provider unavailable: timeout"
        );
    }
}
