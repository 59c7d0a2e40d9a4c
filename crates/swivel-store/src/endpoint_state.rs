//! Endpoint-state document: remembers the base URL the API-key mode last
//! pointed at so an implicit switch can return to it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use swivel_core::{read_text_optional, write_text_atomic};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointState {
    #[serde(
        rename = "lastBaseUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_base_url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// File-backed accessor for the endpoint-state document.
#[derive(Debug, Clone)]
pub struct EndpointStateStore {
    path: PathBuf,
}

impl EndpointStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the state. `Ok(None)` when the file does not exist yet;
    /// unreadable or malformed files error with the path attached.
    pub fn load(&self) -> Result<Option<EndpointState>> {
        let Some(raw) = read_text_optional(&self.path)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_str::<EndpointState>(&raw)
            .with_context(|| format!("failed to parse endpoint state {}", self.path.display()))?;
        tracing::debug!(
            endpoint_state = %self.path.display(),
            last_base_url = parsed.last_base_url.as_deref().unwrap_or("<unset>"),
            "loaded endpoint state"
        );
        Ok(Some(parsed))
    }

    pub fn save(&self, state: &EndpointState) -> Result<()> {
        tracing::debug!(
            endpoint_state = %self.path.display(),
            last_base_url = state.last_base_url.as_deref().unwrap_or("<unset>"),
            "saving endpoint state"
        );
        let mut encoded =
            serde_json::to_string_pretty(state).context("failed to encode endpoint state")?;
        encoded.push('\n');
        write_text_atomic(&self.path, &encoded)
    }
}
