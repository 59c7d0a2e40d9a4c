//! Point-in-time auth status: active mode, endpoint, and masked secrets.
//!
//! Collection never fails. Unreadable documents degrade to placeholders so
//! the status command stays usable while an operator repairs the files.

use serde_json::Value;
use swivel_store::{provider_base_url, provider_order, CredentialProfile, CredentialStore};

use crate::rotation::RotationConfig;

const MISSING_SECRET_DISPLAY: &str = "(none)";

/// Which profile family leads the auth order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Token,
    Api,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Token => "OAT",
            AuthMode::Api => "API",
        }
    }
}

/// Masks a secret for display. Twelve characters or fewer collapse to
/// `***`; longer secrets show the first eight and last six characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{head}…{tail}")
}

/// Snapshot rendered by the status command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStatus {
    pub mode: AuthMode,
    /// Base URL from the config, when it holds one.
    pub base_url: Option<String>,
    pub api_key_display: String,
    pub token_display: String,
}

impl AuthStatus {
    /// Four-line report. `official_host` fills in when the config carries
    /// no base URL.
    pub fn render(&self, official_host: &str) -> String {
        [
            format!("Mode: {}", self.mode.as_str()),
            format!(
                "Base URL: {}",
                self.base_url.as_deref().unwrap_or(official_host)
            ),
            format!("API Key: {}", self.api_key_display),
            format!("OAT Token: {}", self.token_display),
        ]
        .join("\n")
    }
}

/// Builds the status snapshot from an already-loaded config document. The
/// mode is token only when the token profile leads the order; an empty or
/// missing order reads as API mode.
pub fn collect_status(
    rotation: &RotationConfig,
    host_config: &Value,
    credentials: &CredentialStore,
) -> AuthStatus {
    let order = provider_order(host_config, &rotation.provider).unwrap_or_default();
    let mode = if order.first().map(String::as_str) == Some(rotation.token_profile.as_str()) {
        AuthMode::Token
    } else {
        AuthMode::Api
    };
    let base_url = provider_base_url(host_config, &rotation.provider);

    let mut api_key_display = MISSING_SECRET_DISPLAY.to_string();
    let mut token_display = MISSING_SECRET_DISPLAY.to_string();
    match credentials.load() {
        Ok(Some(document)) => {
            if let Some(key) = document
                .profiles
                .get(&rotation.api_profile)
                .and_then(CredentialProfile::key_secret)
            {
                api_key_display = mask_secret(key);
            }
            if let Some(token) = document
                .profiles
                .get(&rotation.token_profile)
                .and_then(CredentialProfile::token_secret)
            {
                token_display = mask_secret(token);
            }
        }
        Ok(None) => {}
        Err(error) => {
            tracing::warn!(
                credential_store = %credentials.path().display(),
                error = %error,
                "credential store unreadable; reporting secret placeholders"
            );
        }
    }

    AuthStatus {
        mode,
        base_url,
        api_key_display,
        token_display,
    }
}
