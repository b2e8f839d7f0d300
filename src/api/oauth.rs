//! OAuth authorization-code exchange.
//!
//! A thin pass-through: exchange the code at the provider's token endpoint,
//! fetch the provider profile, mint a local token for the profile's id, and
//! hand everything back to the caller. Each outbound call is a bounded
//! single attempt; provider failures surface as gateway-style responses,
//! never as a panic.

use std::fmt;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::api::AppState;
use crate::auth::remote::coerce_identity;
use crate::config::ProviderConfig;
use crate::types::{RedirectUri, Subject};

const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Errors from the code-exchange flow.
#[derive(Debug)]
pub enum OAuthError {
    /// The provider answered with a non-success status.
    Provider { status: u16, detail: String },
    /// A required field was missing from a provider response.
    MissingField(&'static str),
    /// The provider could not be reached or timed out.
    Transport(String),
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider { status, detail } => {
                write!(f, "Provider returned {}: {}", status, detail)
            }
            Self::MissingField(field) => {
                write!(f, "Provider response missing '{}'", field)
            }
            Self::Transport(msg) => write!(f, "Provider request failed: {}", msg),
        }
    }
}

impl std::error::Error for OAuthError {}

/// Result of a successful exchange.
pub struct ExchangeOutcome {
    pub access_token: String,
    pub subject: Subject,
    pub user: Value,
}

/// Client for the provider's token and profile endpoints.
pub struct OAuthClient {
    http: reqwest::Client,
    api_base: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: RedirectUri,
}

impl OAuthClient {
    pub fn new(provider: &ProviderConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            http,
            api_base: provider.api_base.clone(),
            client_id: provider.client_id.clone(),
            client_secret: provider.client_secret.clone(),
            redirect_uri: provider.redirect_uri.clone(),
        })
    }

    /// Exchange an authorization code for the provider access token and
    /// profile. The caller may override the configured redirect URI with
    /// the one it actually used.
    pub async fn exchange(
        &self,
        code: &str,
        redirect_override: Option<&str>,
    ) -> Result<ExchangeOutcome, OAuthError> {
        let base = self.api_base.as_str().trim_end_matches('/');
        let redirect_uri = redirect_override
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| self.redirect_uri.as_str());

        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let token_response = self
            .http
            .post(format!("{}/oauth2/token", base))
            .form(&form)
            .send()
            .await
            .map_err(|e| OAuthError::Transport(e.to_string()))?;

        let status = token_response.status();
        if !status.is_success() {
            let detail = token_response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "token exchange rejected");
            return Err(OAuthError::Provider {
                status: status.as_u16(),
                detail,
            });
        }

        let token_body: Value = token_response
            .json()
            .await
            .map_err(|e| OAuthError::Transport(format!("unreadable token response: {}", e)))?;

        let access_token = token_body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or(OAuthError::MissingField("access_token"))?
            .to_string();

        let user_response = self
            .http
            .get(format!("{}/users/@me", base))
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Transport(e.to_string()))?;

        let status = user_response.status();
        if !status.is_success() {
            let detail = user_response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "profile fetch rejected");
            return Err(OAuthError::Provider {
                status: status.as_u16(),
                detail,
            });
        }

        let user: Value = user_response
            .json()
            .await
            .map_err(|e| OAuthError::Transport(format!("unreadable profile response: {}", e)))?;

        let subject = coerce_identity(&user).ok_or(OAuthError::MissingField("id"))?;

        Ok(ExchangeOutcome {
            access_token,
            subject,
            user,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub code: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

/// `POST /auth/exchange` — bypasses the gate (it is how callers obtain a
/// credential in the first place).
pub async fn exchange_code(
    State(state): State<AppState>,
    Json(payload): Json<ExchangeRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let outcome = state
        .oauth
        .exchange(&payload.code, payload.redirect_uri.as_deref())
        .await
        .map_err(error_response)?;

    let token = state.issuer.issue(outcome.subject.as_str()).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Token issuance failed: {}", e)})),
        )
    })?;

    Ok(Json(json!({
        "token": token,
        "provider_token": outcome.access_token,
        "user": outcome.user,
    })))
}

/// Map exchange failures to a status + JSON body. Provider rejections keep
/// their status where it is a valid client error; everything else is 502.
fn error_response(err: OAuthError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        OAuthError::Provider { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        OAuthError::MissingField(_) | OAuthError::Transport(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({"error": err.to_string()})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_error_display() {
        let err = OAuthError::Provider {
            status: 400,
            detail: "invalid_grant".to_string(),
        };
        assert_eq!(err.to_string(), "Provider returned 400: invalid_grant");

        let err = OAuthError::MissingField("access_token");
        assert_eq!(err.to_string(), "Provider response missing 'access_token'");
    }

    #[test]
    fn test_error_response_statuses() {
        let (status, _) = error_response(OAuthError::Provider {
            status: 401,
            detail: String::new(),
        });
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = error_response(OAuthError::Transport("timeout".to_string()));
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        // An out-of-range provider status degrades to 502.
        let (status, _) = error_response(OAuthError::Provider {
            status: 99,
            detail: String::new(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
