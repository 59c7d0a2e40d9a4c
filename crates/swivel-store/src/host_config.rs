//! Host-configuration view: reads and patches the auth-profile order and
//! the per-provider endpoint settings inside the host's config document.
//!
//! The document belongs to the host and is treated as opaque JSON. Patches
//! touch only the addressed fields, creating missing objects along the way,
//! and the same document value is written back wholesale so everything else
//! in it survives.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::{json, Map, Value};
use swivel_core::{read_text_optional, write_text_atomic};

/// Host-configuration access the rotation engine consumes. Hosts with their
/// own config pipeline implement this; [`FileConfigStore`] covers the plain
/// JSON-file layout.
pub trait ConfigStore {
    /// Loads the current config document. A missing document loads as an
    /// empty object so first-run patches can build it up.
    fn load(&self) -> Result<Value>;

    /// Persists a patched document.
    fn save(&self, config: &Value) -> Result<()>;
}

/// Batched config mutation for one provider. Fields left unset are not
/// touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    /// Replacement for `auth.order.<provider>`.
    pub order: Option<Vec<String>>,
    /// Replacement for `models.providers.<provider>.baseUrl`.
    pub base_url: Option<String>,
    /// Seed `models.providers.<provider>.models` with `[]` when missing or
    /// null, leaving any existing list alone.
    pub ensure_models: bool,
}

impl ConfigPatch {
    /// Applies the patch in place. Intermediate objects are created when
    /// absent or null; a path segment holding any other non-object value is
    /// an error, since overwriting it could destroy host data.
    pub fn apply_to(&self, config: &mut Value, provider: &str) -> Result<()> {
        if config.is_null() {
            *config = Value::Object(Map::new());
        }
        let Some(root) = config.as_object_mut() else {
            bail!("config document root is not a JSON object");
        };

        if let Some(order) = &self.order {
            let auth = ensure_entry(root, "auth", "auth")?;
            let orders = ensure_entry(auth, "order", "auth.order")?;
            orders.insert(provider.to_string(), json!(order));
        }

        if self.base_url.is_some() || self.ensure_models {
            let models = ensure_entry(root, "models", "models")?;
            let providers = ensure_entry(models, "providers", "models.providers")?;
            let label = format!("models.providers.{provider}");
            let entry = ensure_entry(providers, provider, &label)?;
            if let Some(base_url) = &self.base_url {
                entry.insert("baseUrl".to_string(), json!(base_url));
            }
            if self.ensure_models {
                let slot = entry.entry("models".to_string()).or_insert(Value::Null);
                if slot.is_null() {
                    *slot = json!([]);
                }
            }
        }

        Ok(())
    }
}

fn ensure_entry<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
    label: &str,
) -> Result<&'a mut Map<String, Value>> {
    let slot = map.entry(key.to_string()).or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(child) => Ok(child),
        _ => bail!("config field '{label}' is not an object"),
    }
}

/// Auth-profile order for `provider`, when the config holds one.
pub fn provider_order(config: &Value, provider: &str) -> Option<Vec<String>> {
    let entries = config.get("auth")?.get("order")?.get(provider)?.as_array()?;
    Some(
        entries
            .iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect(),
    )
}

/// Configured base URL for `provider`, when present.
pub fn provider_base_url(config: &Value, provider: &str) -> Option<String> {
    config
        .get("models")?
        .get("providers")?
        .get(provider)?
        .get("baseUrl")?
        .as_str()
        .map(str::to_string)
}

/// JSON-file implementation of [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<Value> {
        let Some(raw) = read_text_optional(&self.path)? else {
            tracing::debug!(
                config = %self.path.display(),
                "config file missing, starting from an empty document"
            );
            return Ok(Value::Object(Map::new()));
        };
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", self.path.display()))
    }

    fn save(&self, config: &Value) -> Result<()> {
        tracing::debug!(config = %self.path.display(), "saving config");
        let mut encoded = serde_json::to_string_pretty(config).context("failed to encode config")?;
        encoded.push('\n');
        write_text_atomic(&self.path, &encoded)
    }
}
