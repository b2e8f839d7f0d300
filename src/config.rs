//! Service configuration.
//!
//! Secrets arrive via environment-backed CLI flags and are validated before
//! serving. Neither config struct derives `Debug`: the token secret and the
//! provider client secret must never end up in a diagnostic dump.

use anyhow::{Result, bail};
use url::Url;

use crate::types::RedirectUri;

/// Default identity provider API base.
pub const DEFAULT_PROVIDER_API_BASE: &str = "https://discord.com/api";

/// Identity provider settings for remote validation and code exchange.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_base: Url,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: RedirectUri,
}

/// Top-level service configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Address to bind, e.g. "0.0.0.0:8080".
    pub bind: String,
    /// Shared symmetric secret for local token signing and verification.
    pub token_secret: String,
    /// Allowed CORS origins; empty means permissive.
    pub allowed_origins: Vec<String>,
    pub provider: ProviderConfig,
}

impl AppConfig {
    /// Reject configurations that cannot serve safely.
    pub fn validate(&self) -> Result<()> {
        if self.token_secret.trim().is_empty() {
            bail!("token secret must not be empty");
        }
        Ok(())
    }
}
