//! Locally issued HS256 bearer tokens: issuing and verifying.
//!
//! Tokens are compact JWS strings signed with a single shared symmetric
//! secret known only to the issuer and the authentication gate. Verification
//! is pure computation; it never performs network I/O.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::{AuthError, bearer_token};
use crate::auth::principal::Principal;
use crate::types::Subject;

/// How long an issued token stays valid (24 hours).
pub const TOKEN_VALIDITY_SECONDS: u64 = 24 * 60 * 60;

/// Claims carried by a locally issued token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: u64,
    exp: u64,
}

/// Signs tokens for authenticated subjects after a provider login.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for `subject` valid for [`TOKEN_VALIDITY_SECONDS`].
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        let now = unix_now()?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + TOKEN_VALIDITY_SECONDS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token encoding failed: {}", e)))
    }
}

/// Verifies locally issued tokens against the shared secret.
pub struct LocalTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl LocalTokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a `Bearer <token>` header value and extract the subject.
    ///
    /// Tokens that are not shaped like a compact JWS return
    /// [`AuthError::NoCredential`] so provider-issued opaque tokens skip
    /// the signature check entirely and fall through to the remote scheme.
    pub fn verify(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        let token = bearer_token(header).ok_or(AuthError::NoCredential)?;

        if !is_compact_jws(token) {
            return Err(AuthError::NoCredential);
        }

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    _ => AuthError::InvalidCredential(format!("token rejected: {}", e)),
                }
            })?;

        let subject = token_data.claims.sub.trim();
        if subject.is_empty() {
            return Err(AuthError::InvalidCredential("blank subject".to_string()));
        }

        Ok(Principal::new(Subject::new(subject)))
    }
}

/// A plausible compact JWS has exactly two `.` separators (three segments).
fn is_compact_jws(token: &str) -> bool {
    let mut dots = 0;
    for byte in token.bytes() {
        if byte == b'.' {
            dots += 1;
            if dots > 2 {
                return false;
            }
        }
    }
    dots == 2
}

fn unix_now() -> Result<u64, AuthError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AuthError::Internal(format!("system clock before epoch: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-please-rotate";

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[test]
    fn test_issue_then_verify_round_trip() {
        let issuer = TokenIssuer::new(SECRET);
        let verifier = LocalTokenVerifier::new(SECRET);

        let token = issuer.issue("42").unwrap();
        let principal = verifier.verify(Some(&bearer(&token))).unwrap();

        assert_eq!(principal.subject().as_str(), "42");
        assert_eq!(principal.numeric_id(), Some(42));
    }

    #[test]
    fn test_non_numeric_subject_round_trip() {
        let issuer = TokenIssuer::new(SECRET);
        let verifier = LocalTokenVerifier::new(SECRET);

        let token = issuer.issue("not-a-number").unwrap();
        let principal = verifier.verify(Some(&bearer(&token))).unwrap();

        assert_eq!(principal.subject().as_str(), "not-a-number");
        assert_eq!(principal.numeric_id(), None);
    }

    #[test]
    fn test_missing_header_is_no_credential() {
        let verifier = LocalTokenVerifier::new(SECRET);
        assert!(matches!(verifier.verify(None), Err(AuthError::NoCredential)));
    }

    #[test]
    fn test_non_bearer_header_is_no_credential() {
        let verifier = LocalTokenVerifier::new(SECRET);
        let result = verifier.verify(Some("Basic dXNlcjpwYXNz"));
        assert!(matches!(result, Err(AuthError::NoCredential)));
    }

    #[test]
    fn test_opaque_token_is_no_credential() {
        // Provider access tokens have no dots; they must not reach the
        // signature check.
        let verifier = LocalTokenVerifier::new(SECRET);
        let result = verifier.verify(Some("Bearer opaqueProviderToken123"));
        assert!(matches!(result, Err(AuthError::NoCredential)));
    }

    #[test]
    fn test_wrong_segment_counts_are_no_credential() {
        let verifier = LocalTokenVerifier::new(SECRET);

        let two_segments = verifier.verify(Some("Bearer abc.def"));
        assert!(matches!(two_segments, Err(AuthError::NoCredential)));

        let four_segments = verifier.verify(Some("Bearer a.b.c.d"));
        assert!(matches!(four_segments, Err(AuthError::NoCredential)));
    }

    #[test]
    fn test_forged_three_segment_token_is_invalid() {
        let verifier = LocalTokenVerifier::new(SECRET);
        let result = verifier.verify(Some("Bearer abc.def.ghi"));
        assert!(matches!(result, Err(AuthError::InvalidCredential(_))));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_invalid() {
        let issuer = TokenIssuer::new("some-other-secret");
        let verifier = LocalTokenVerifier::new(SECRET);

        let token = issuer.issue("42").unwrap();
        let result = verifier.verify(Some(&bearer(&token)));
        assert!(matches!(result, Err(AuthError::InvalidCredential(_))));
    }

    #[test]
    fn test_expired_token_is_expired() {
        let verifier = LocalTokenVerifier::new(SECRET);

        let past = unix_now().unwrap() - 120;
        let claims = Claims {
            sub: "42".to_string(),
            iat: past - TOKEN_VALIDITY_SECONDS,
            exp: past,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = verifier.verify(Some(&bearer(&token)));
        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[test]
    fn test_blank_subject_is_invalid() {
        let verifier = LocalTokenVerifier::new(SECRET);

        let now = unix_now().unwrap();
        let claims = Claims {
            sub: "   ".to_string(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = verifier.verify(Some(&bearer(&token)));
        assert!(matches!(result, Err(AuthError::InvalidCredential(_))));
    }

    #[test]
    fn test_is_compact_jws() {
        assert!(is_compact_jws("a.b.c"));
        assert!(!is_compact_jws("abc"));
        assert!(!is_compact_jws("a.b"));
        assert!(!is_compact_jws("a.b.c.d"));
    }
}
