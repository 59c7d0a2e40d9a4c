use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use swivel_auth::{
    execute_auth_command, review_outgoing_message, AgentRunOutcome, MessageVerdict,
    RotationConfig, RotationEngine, RotationOutcome,
};
use swivel_store::FileConfigStore;

struct Harness {
    _tempdir: tempfile::TempDir,
    engine: RotationEngine<FileConfigStore>,
    config_path: PathBuf,
    credential_path: PathBuf,
    endpoint_path: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let config_path = tempdir.path().join("config.json");
        let credential_path = tempdir.path().join("auth-profiles.json");
        let endpoint_path = tempdir.path().join("auth-switch-state.json");
        let engine = RotationEngine::new(
            RotationConfig::anthropic(&credential_path, &endpoint_path),
            FileConfigStore::new(&config_path),
        );
        Self {
            _tempdir: tempdir,
            engine,
            config_path,
            credential_path,
            endpoint_path,
        }
    }

    fn seed(&self, path: &Path, value: Value) {
        fs::write(path, value.to_string()).expect("seed document");
    }

    fn read(&self, path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).expect("read document")).expect("parse")
    }

    fn auth(&self, args: &str) -> String {
        execute_auth_command(&self.engine, args)
    }
}

#[test]
fn integration_full_mode_round_trip() {
    let harness = Harness::new();

    // Fresh install: nothing configured anywhere.
    assert_eq!(
        harness.auth(""),
        "Mode: API\nBase URL: api.anthropic.com\nAPI Key: (none)\nOAT Token: (none)"
    );
    assert_eq!(
        harness.auth("oat"),
        "OAT profile (anthropic:oat) not found.\nRun the authorize flow to add an OAT credential first."
    );

    // Explicit API switch bootstraps every document.
    let reply = harness.auth("api https://relay.example.org sk-ant-REDACTED");
    assert_eq!(
        reply,
        "Switched to API mode.\nBase URL: https://relay.example.org\nAPI Key: sk-ant-a…klmnop\n\nSend /restart to apply."
    );
    assert_eq!(
        harness.auth("status"),
        "Mode: API\nBase URL: https://relay.example.org\nAPI Key: sk-ant-a…klmnop\nOAT Token: (none)"
    );

    // Token switch parks the relay URL and points at the official endpoint.
    let mut credentials = harness.read(&harness.credential_path);
    credentials["profiles"]["anthropic:oat"] =
        json!({ "type": "token", "provider": "anthropic", "token": "oat-secret-0123456789" });
    harness.seed(&harness.credential_path, credentials);
    assert_eq!(
        harness.auth("oat"),
        "Switched to OAT mode (api.anthropic.com).\nSend /restart to apply."
    );
    let config = harness.read(&harness.config_path);
    assert_eq!(
        config["auth"]["order"]["anthropic"],
        json!(["anthropic:oat", "anthropic:default"])
    );
    assert_eq!(
        config["models"]["providers"]["anthropic"]["baseUrl"],
        "https://api.anthropic.com"
    );
    assert_eq!(
        harness.read(&harness.endpoint_path)["lastBaseUrl"],
        "https://relay.example.org"
    );

    // Implicit API switch returns to the parked endpoint with the stored key.
    assert_eq!(
        harness.auth("api"),
        "Switched to API mode.\nBase URL: https://relay.example.org\n\nSend /restart to apply."
    );
    let credentials = harness.read(&harness.credential_path);
    assert_eq!(credentials["lastGood"]["anthropic"], "anthropic:default");
    assert_eq!(
        credentials["profiles"]["anthropic:default"]["key"],
        "sk-ant-REDACTED"
    );
}

#[test]
fn functional_billing_failure_rotates_order_but_nothing_else() {
    let harness = Harness::new();
    harness.seed(
        &harness.config_path,
        json!({
            "auth": { "order": { "anthropic": ["anthropic:oat", "anthropic:default"] } },
            "models": { "providers": { "anthropic": { "baseUrl": "https://api.anthropic.com" } } }
        }),
    );
    harness.seed(
        &harness.credential_path,
        json!({ "profiles": {}, "lastGood": { "anthropic": "anthropic:oat" } }),
    );

    // The host bus delivers run outcomes as JSON.
    let outcome: AgentRunOutcome = serde_json::from_value(json!({
        "success": false,
        "error": "Anthropic API error: your credit balance is too low"
    }))
    .expect("decode outcome");
    let rotation = harness
        .engine
        .handle_agent_run_outcome(&outcome)
        .expect("rotation ran");
    assert_eq!(
        rotation,
        RotationOutcome::Rotated {
            failed: "anthropic:oat".to_string(),
            next: "anthropic:default".to_string(),
        }
    );

    // Only the order moved. The base URL and lastGood wait for a manual
    // switch, so the rotated profile may briefly pair with the old endpoint.
    let config = harness.read(&harness.config_path);
    assert_eq!(
        config["auth"]["order"]["anthropic"],
        json!(["anthropic:default", "anthropic:oat"])
    );
    assert_eq!(
        config["models"]["providers"]["anthropic"]["baseUrl"],
        "https://api.anthropic.com"
    );
    assert_eq!(
        harness.read(&harness.credential_path)["lastGood"]["anthropic"],
        "anthropic:oat"
    );
    assert!(!harness.endpoint_path.exists());

    // Status now reports the API profile leading the order.
    assert!(harness.auth("status").starts_with("Mode: API\n"));

    // The user-facing error text for the same failure is suppressed.
    assert_eq!(
        review_outgoing_message(
            "Billing error: the account has run out of credits. Please top up."
        ),
        MessageVerdict::Suppress
    );
    assert_eq!(
        review_outgoing_message("The request failed with a transient network error."),
        MessageVerdict::Deliver
    );
}

#[test]
fn regression_foreign_config_data_survives_both_switches() {
    let harness = Harness::new();
    harness.seed(
        &harness.config_path,
        json!({
            "agents": { "main": { "workspace": "~/agents/main" } },
            "auth": {
                "order": {
                    "anthropic": ["anthropic:default", "anthropic:oat"],
                    "openai": ["openai:default"]
                }
            },
            "models": {
                "defaultTemperature": 0.2,
                "providers": {
                    "anthropic": { "baseUrl": "https://relay.example.org", "models": ["claude-opus"] },
                    "openai": { "baseUrl": "https://api.openai.com" }
                }
            }
        }),
    );
    harness.seed(
        &harness.credential_path,
        json!({
            "profiles": {
                "anthropic:oat": { "type": "token", "token": "oat-secret-0123456789", "addedBy": "setup-wizard" },
                "openai:default": { "type": "api_key", "key": "sk-openai" }
            },
            "auditLog": ["created"]
        }),
    );

    harness.auth("oat");
    harness.auth("api https://relay.example.org sk-ant-fresh-key-123");

    let config = harness.read(&harness.config_path);
    assert_eq!(config["agents"]["main"]["workspace"], "~/agents/main");
    assert_eq!(config["auth"]["order"]["openai"], json!(["openai:default"]));
    assert_eq!(config["models"]["defaultTemperature"], 0.2);
    assert_eq!(
        config["models"]["providers"]["openai"]["baseUrl"],
        "https://api.openai.com"
    );
    assert_eq!(
        config["models"]["providers"]["anthropic"]["models"],
        json!(["claude-opus"])
    );

    let credentials = harness.read(&harness.credential_path);
    assert_eq!(credentials["auditLog"], json!(["created"]));
    assert_eq!(
        credentials["profiles"]["anthropic:oat"]["addedBy"],
        "setup-wizard"
    );
    assert_eq!(credentials["profiles"]["openai:default"]["key"], "sk-openai");
}

#[test]
fn functional_status_stays_usable_with_corrupt_documents() {
    let harness = Harness::new();
    fs::write(&harness.config_path, "{ definitely not json").expect("seed corrupt config");
    fs::write(&harness.credential_path, "[1,").expect("seed corrupt credentials");

    assert_eq!(
        harness.auth("status"),
        "Mode: API\nBase URL: api.anthropic.com\nAPI Key: (none)\nOAT Token: (none)"
    );
}
