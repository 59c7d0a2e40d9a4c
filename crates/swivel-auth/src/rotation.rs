//! Profile-rotation engine: keeps `auth.order.<provider>` pointing at a
//! working auth profile and the endpoint/credential documents in step with
//! manual switches.
//!
//! Every operation re-reads its documents from disk and writes back
//! immediately. Writes are sequential with no rollback; a failure part-way
//! through leaves the earlier documents updated, and a host restart picks
//! up whatever landed.

use std::path::PathBuf;

use serde_json::Value;
use swivel_store::{
    provider_base_url, provider_order, ConfigPatch, ConfigStore, CredentialDocument,
    CredentialProfile, CredentialStore, EndpointState, EndpointStateStore,
};

use crate::billing::{is_billing_failure, AgentRunOutcome};
use crate::status::{collect_status, mask_secret, AuthStatus};

const ANTHROPIC_PROVIDER: &str = "anthropic";
const ANTHROPIC_TOKEN_PROFILE: &str = "anthropic:oat";
const ANTHROPIC_API_PROFILE: &str = "anthropic:default";
const ANTHROPIC_OFFICIAL_BASE_URL: &str = "https://api.anthropic.com";

/// Wiring for one provider's rotation engine, supplied by the host at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    /// Provider id used in config paths and `lastGood` keys.
    pub provider: String,
    /// Profile id carrying the token-mode secret.
    pub token_profile: String,
    /// Profile id carrying the API-key-mode secret.
    pub api_profile: String,
    /// Base URL written to the config when switching to token mode.
    pub official_base_url: String,
    /// Base URL used for API-key mode when no endpoint state is readable.
    pub fallback_base_url: String,
    /// Credential-profile document location.
    pub credential_store: PathBuf,
    /// Endpoint-state document location.
    pub endpoint_state: PathBuf,
}

impl RotationConfig {
    /// Stock wiring for the Anthropic provider.
    pub fn anthropic(
        credential_store: impl Into<PathBuf>,
        endpoint_state: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider: ANTHROPIC_PROVIDER.to_string(),
            token_profile: ANTHROPIC_TOKEN_PROFILE.to_string(),
            api_profile: ANTHROPIC_API_PROFILE.to_string(),
            official_base_url: ANTHROPIC_OFFICIAL_BASE_URL.to_string(),
            fallback_base_url: ANTHROPIC_OFFICIAL_BASE_URL.to_string(),
            credential_store: credential_store.into(),
            endpoint_state: endpoint_state.into(),
        }
    }

    /// Host shown in replies when the config carries no base URL.
    pub fn official_display_host(&self) -> &str {
        self.official_base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
    }
}

/// Failures the manual switch paths surface to the command layer.
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    /// The target profile has no stored secret. The switch writes nothing
    /// in this case; `remedy` is the user-facing text with the fix.
    #[error("auth profile '{profile}' is not configured")]
    ProfileNotConfigured { profile: String, remedy: String },
    /// A document could not be read or written.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Result of an automatic rotation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The order was rotated one step left; `next` now leads it.
    Rotated { failed: String, next: String },
    /// Fewer than two profiles in the order; nothing was written.
    NoFallback { active: Option<String> },
}

/// How an API-mode switch picks its endpoint and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiSwitchRequest {
    /// Use the given endpoint and store the given key.
    Explicit { url: String, key: String },
    /// Reuse the stored key and the last persisted endpoint.
    LastUsed,
}

/// Receipt from a completed API-mode switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSwitch {
    /// Base URL now in effect.
    pub base_url: String,
    /// Masked form of the key that was stored, when the switch carried one.
    pub masked_key: Option<String>,
}

/// Rotation engine for a single provider. The host supplies its config
/// store; the credential and endpoint documents are file-backed at the
/// paths in [`RotationConfig`].
pub struct RotationEngine<C: ConfigStore> {
    config: RotationConfig,
    host_config: C,
    credentials: CredentialStore,
    endpoint_state: EndpointStateStore,
}

impl<C: ConfigStore> RotationEngine<C> {
    pub fn new(config: RotationConfig, host_config: C) -> Self {
        let credentials = CredentialStore::new(&config.credential_store);
        let endpoint_state = EndpointStateStore::new(&config.endpoint_state);
        Self {
            config,
            host_config,
            credentials,
            endpoint_state,
        }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Hook for the host's run-completion event. Detects billing failures
    /// and rotates, swallowing store errors after logging them; the hook
    /// never propagates an error into the event bus.
    pub fn handle_agent_run_outcome(&self, outcome: &AgentRunOutcome) -> Option<RotationOutcome> {
        if !is_billing_failure(outcome) {
            return None;
        }
        match self.rotate_on_billing_failure() {
            Ok(outcome) => Some(outcome),
            Err(error) => {
                tracing::warn!(
                    provider = %self.config.provider,
                    error = %error,
                    "billing-failure rotation did not complete"
                );
                None
            }
        }
    }

    /// Rotates `auth.order.<provider>` one step left after a billing
    /// failure. Only the config document changes; `lastGood` and the
    /// endpoint state keep their previous values until a manual switch.
    pub fn rotate_on_billing_failure(&self) -> Result<RotationOutcome, RotationError> {
        let mut config = self.host_config.load()?;
        let order = provider_order(&config, &self.config.provider).unwrap_or_default();
        if order.len() < 2 {
            tracing::warn!(
                provider = %self.config.provider,
                active = order.first().map(String::as_str).unwrap_or("unknown"),
                "billing failure but no fallback profile available"
            );
            return Ok(RotationOutcome::NoFallback {
                active: order.into_iter().next(),
            });
        }

        let failed = order[0].clone();
        let mut rotated = order;
        rotated.rotate_left(1);
        let next = rotated[0].clone();
        ConfigPatch {
            order: Some(rotated),
            ..ConfigPatch::default()
        }
        .apply_to(&mut config, &self.config.provider)?;
        self.host_config.save(&config)?;

        tracing::warn!(
            failed = %failed,
            next = %next,
            "billing failure, auto-switched auth profile; restart needed to apply"
        );
        Ok(RotationOutcome::Rotated { failed, next })
    }

    /// Switches to token mode. Validation runs before any write: without a
    /// stored token the switch fails and no document changes. The previous
    /// base URL, when the config holds one, is parked in the endpoint state
    /// so a later API switch can return to it.
    pub fn switch_to_token(&self) -> Result<(), RotationError> {
        let mut credentials = self.load_credentials_lenient();
        let has_token = credentials
            .profiles
            .get(&self.config.token_profile)
            .and_then(CredentialProfile::token_secret)
            .is_some();
        if !has_token {
            return Err(self.token_profile_not_configured());
        }

        let mut config = self.host_config.load()?;
        if let Some(current_url) = provider_base_url(&config, &self.config.provider) {
            let mut state = self.load_endpoint_state_lenient();
            state.last_base_url = Some(current_url);
            self.endpoint_state.save(&state)?;
        }

        ConfigPatch {
            order: Some(vec![
                self.config.token_profile.clone(),
                self.config.api_profile.clone(),
            ]),
            base_url: Some(self.config.official_base_url.clone()),
            ensure_models: true,
        }
        .apply_to(&mut config, &self.config.provider)?;
        self.host_config.save(&config)?;

        credentials
            .last_good
            .insert(self.config.provider.clone(), self.config.token_profile.clone());
        self.credentials.save(&credentials)?;

        tracing::info!(
            profile = %self.config.token_profile,
            base_url = %self.config.official_base_url,
            "switched to token mode"
        );
        Ok(())
    }

    /// Switches to API-key mode. The last-used form requires a stored key
    /// and fails closed without one; the explicit form stores the supplied
    /// key under the API profile, creating the profile when absent.
    pub fn switch_to_api(&self, request: ApiSwitchRequest) -> Result<ApiSwitch, RotationError> {
        let (url, new_key) = match request {
            ApiSwitchRequest::Explicit { url, key } => {
                (url, Some(key).filter(|value| !value.is_empty()))
            }
            ApiSwitchRequest::LastUsed => {
                let credentials = self.load_credentials_lenient();
                let has_key = credentials
                    .profiles
                    .get(&self.config.api_profile)
                    .and_then(CredentialProfile::key_secret)
                    .is_some();
                if !has_key {
                    return Err(self.api_profile_not_configured());
                }
                (self.last_used_base_url(), None)
            }
        };

        let mut config = self.host_config.load()?;
        ConfigPatch {
            order: Some(vec![
                self.config.api_profile.clone(),
                self.config.token_profile.clone(),
            ]),
            base_url: Some(url.clone()),
            ensure_models: true,
        }
        .apply_to(&mut config, &self.config.provider)?;
        self.host_config.save(&config)?;

        let mut state = self.load_endpoint_state_lenient();
        state.last_base_url = Some(url.clone());
        self.endpoint_state.save(&state)?;

        let mut credentials = self.credentials.load_or_default()?;
        credentials
            .last_good
            .insert(self.config.provider.clone(), self.config.api_profile.clone());
        if let Some(key) = &new_key {
            credentials
                .profiles
                .entry(self.config.api_profile.clone())
                .or_insert_with(|| CredentialProfile::new_api_key(self.config.provider.clone()))
                .key = Some(key.clone());
        }
        self.credentials.save(&credentials)?;

        tracing::info!(
            profile = %self.config.api_profile,
            base_url = %url,
            stored_new_key = new_key.is_some(),
            "switched to api-key mode"
        );
        Ok(ApiSwitch {
            masked_key: new_key.as_deref().map(mask_secret),
            base_url: url,
        })
    }

    /// Status snapshot; never fails. An unreadable config reads as an
    /// empty one.
    pub fn status(&self) -> AuthStatus {
        let config = match self.host_config.load() {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(error = %error, "config unreadable; reporting default status");
                Value::Null
            }
        };
        collect_status(&self.config, &config, &self.credentials)
    }

    /// Credential document for validation reads. Missing and unreadable
    /// stores both come back empty, so callers see "not configured" rather
    /// than an error.
    fn load_credentials_lenient(&self) -> CredentialDocument {
        match self.credentials.load() {
            Ok(document) => document.unwrap_or_default(),
            Err(error) => {
                tracing::warn!(
                    credential_store = %self.credentials.path().display(),
                    error = %error,
                    "credential store unreadable; treating profiles as not configured"
                );
                CredentialDocument::default()
            }
        }
    }

    /// Endpoint state for read-modify-write; missing and unreadable files
    /// both start from the default document.
    fn load_endpoint_state_lenient(&self) -> EndpointState {
        match self.endpoint_state.load() {
            Ok(state) => state.unwrap_or_default(),
            Err(error) => {
                tracing::warn!(
                    endpoint_state = %self.endpoint_state.path().display(),
                    error = %error,
                    "endpoint state unreadable; starting from defaults"
                );
                EndpointState::default()
            }
        }
    }

    fn last_used_base_url(&self) -> String {
        self.load_endpoint_state_lenient()
            .last_base_url
            .unwrap_or_else(|| self.config.fallback_base_url.clone())
    }

    fn token_profile_not_configured(&self) -> RotationError {
        RotationError::ProfileNotConfigured {
            profile: self.config.token_profile.clone(),
            remedy: format!(
                "OAT profile ({}) not found.\nRun the authorize flow to add an OAT credential first.",
                self.config.token_profile
            ),
        }
    }

    fn api_profile_not_configured(&self) -> RotationError {
        RotationError::ProfileNotConfigured {
            profile: self.config.api_profile.clone(),
            remedy: format!(
                "API profile ({}) has no key.\nUse: /auth api <url> <key>",
                self.config.api_profile
            ),
        }
    }
}
