//! Credential-profile document: named auth profiles plus the last-good
//! profile per provider.
//!
//! The document is a plain-JSON contract shared with the host. Fields this
//! crate does not model are carried through load/save untouched, so other
//! tooling can keep its own data next to ours.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use swivel_core::{read_text_optional, write_text_atomic};

const PROFILE_TYPE_API_KEY: &str = "api_key";

/// One named auth profile. The secret lives in `token` (token mode) or
/// `key` (API-key mode); a profile without its secret is "not configured",
/// which is never an error at this layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialProfile {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub profile_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CredentialProfile {
    /// Fresh API-key profile shell for `provider`. The caller fills in the
    /// key when one was supplied.
    pub fn new_api_key(provider: impl Into<String>) -> Self {
        Self {
            profile_type: PROFILE_TYPE_API_KEY.to_string(),
            provider: provider.into(),
            ..Self::default()
        }
    }

    /// Token-mode secret, trimmed; `None` when absent or blank.
    pub fn token_secret(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// API-key-mode secret, trimmed; `None` when absent or blank.
    pub fn key_secret(&self) -> Option<&str> {
        self.key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// The whole credential-profile document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialDocument {
    #[serde(default)]
    pub profiles: BTreeMap<String, CredentialProfile>,
    #[serde(
        rename = "lastGood",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub last_good: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// File-backed accessor for the credential-profile document. Reads go to
/// disk every time; callers write back immediately after mutating.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document. `Ok(None)` when the file does not exist yet;
    /// unreadable or malformed files error with the path attached.
    pub fn load(&self) -> Result<Option<CredentialDocument>> {
        let Some(raw) = read_text_optional(&self.path)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_str::<CredentialDocument>(&raw).with_context(|| {
            format!("failed to parse credential store {}", self.path.display())
        })?;
        tracing::debug!(
            credential_store = %self.path.display(),
            profile_entries = parsed.profiles.len(),
            "loaded credential store"
        );
        Ok(Some(parsed))
    }

    /// Loads the document, treating a missing file as an empty one.
    pub fn load_or_default(&self) -> Result<CredentialDocument> {
        Ok(self.load()?.unwrap_or_default())
    }

    pub fn save(&self, document: &CredentialDocument) -> Result<()> {
        tracing::debug!(
            credential_store = %self.path.display(),
            profile_entries = document.profiles.len(),
            last_good_entries = document.last_good.len(),
            "saving credential store"
        );
        let mut encoded =
            serde_json::to_string_pretty(document).context("failed to encode credential store")?;
        encoded.push('\n');
        write_text_atomic(&self.path, &encoded)
    }
}
