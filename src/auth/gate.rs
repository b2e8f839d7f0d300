//! The authentication gate: ordered credential schemes, first success wins.
//!
//! The gate is an enrichment step, not a rejecting one. It runs before every
//! handler, attaches at most one [`Principal`] to the request, and always
//! forwards the request downstream whether or not authentication succeeded.
//! Rejection of unauthenticated requests is the handlers' job, per resource.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{Method, header};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::auth::local::LocalTokenVerifier;
use crate::auth::principal::Principal;
use crate::auth::remote::RemoteTokenValidator;
use crate::auth::{AuthError, bearer_token, token_fingerprint};

/// Path prefixes that skip authentication entirely: the authentication
/// endpoints themselves, the WebSocket upgrade path, and operational pages.
const BYPASSED_PATH_PREFIXES: [&str; 5] = ["/auth/", "/ws/", "/health", "/error", "/favicon.ico"];

/// A credential scheme the gate can try, in order.
pub enum CredentialScheme {
    /// Locally issued HS256 token, verified without I/O.
    Local(LocalTokenVerifier),
    /// Opaque provider token, validated remotely with a TTL cache.
    Remote(RemoteTokenValidator),
}

impl CredentialScheme {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Remote(_) => "remote",
        }
    }

    async fn verify(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        match self {
            Self::Local(verifier) => verifier.verify(header),
            Self::Remote(validator) => validator.validate(header).await,
        }
    }
}

/// Runs the credential schemes in order against each inbound request.
pub struct AuthenticationGate {
    schemes: Vec<CredentialScheme>,
}

impl AuthenticationGate {
    /// Build the standard gate: local verification first, remote second.
    pub fn new(local: LocalTokenVerifier, remote: RemoteTokenValidator) -> Self {
        Self {
            schemes: vec![
                CredentialScheme::Local(local),
                CredentialScheme::Remote(remote),
            ],
        }
    }

    /// Whether a request skips authentication: all pre-flight requests plus
    /// the fixed path-prefix exclusion set.
    pub fn is_bypassed(method: &Method, path: &str) -> bool {
        if method == Method::OPTIONS {
            return true;
        }
        BYPASSED_PATH_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }

    /// Try each scheme in order; the first success wins.
    ///
    /// Every scheme error is swallowed here and logged at low severity with
    /// a token fingerprint only. A broken verifier must never crash request
    /// processing, so `None` is the worst possible outcome.
    pub async fn resolve(&self, header: Option<&str>) -> Option<Principal> {
        for scheme in &self.schemes {
            match scheme.verify(header).await {
                Ok(principal) => {
                    debug!(
                        scheme = scheme.name(),
                        subject = %principal.subject(),
                        "credential accepted"
                    );
                    return Some(principal);
                }
                Err(AuthError::NoCredential) => {}
                Err(e) => {
                    let fingerprint = bearer_token(header)
                        .map(token_fingerprint)
                        .unwrap_or_default();
                    debug!(
                        scheme = scheme.name(),
                        %fingerprint,
                        "credential rejected: {}",
                        e
                    );
                }
            }
        }
        None
    }
}

/// Axum middleware wrapping [`AuthenticationGate`].
///
/// If an earlier stage already attached a principal, the gate does nothing.
/// The request is always forwarded, authenticated or not.
pub async fn authenticate(
    State(gate): State<Arc<AuthenticationGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    if AuthenticationGate::is_bypassed(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    if request.extensions().get::<Principal>().is_none() {
        let header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if let Some(principal) = gate.resolve(header.as_deref()).await {
            request.extensions_mut().insert(principal);
        }
    }

    next.run(request).await
}
