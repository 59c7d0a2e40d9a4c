//! Persisted documents behind the rotation engine: the credential-profile
//! store, the endpoint-state file, and the host-config view with its typed
//! patch.

pub mod credential_store;
pub mod endpoint_state;
pub mod host_config;

pub use credential_store::{CredentialDocument, CredentialProfile, CredentialStore};
pub use endpoint_state::{EndpointState, EndpointStateStore};
pub use host_config::{provider_base_url, provider_order, ConfigPatch, ConfigStore, FileConfigStore};
