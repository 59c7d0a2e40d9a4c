//! The `auth` command surface: argument parsing and plain-text execution.
//!
//! Every reply is plain text for a chat surface; failures render as text
//! rather than propagating into the host.

use swivel_store::ConfigStore;

use crate::rotation::{ApiSwitchRequest, RotationEngine, RotationError};

/// Help text listing every accepted form.
pub const AUTH_HELP: &str = "/auth — Show current auth status\n\
/auth oat — Switch to OAT (official)\n\
/auth api — Switch to API (last used URL & key)\n\
/auth api <url> <key> — Switch to API (custom)";

const RESTART_HINT: &str = "Send /restart to apply.";

/// Parsed form of the `auth` command arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    Status,
    SwitchToken,
    SwitchApi(ApiSwitchRequest),
    Help,
}

/// Parses `auth` arguments. Parsing never fails; anything unrecognized
/// falls through to the help action.
pub fn parse_auth_action(args: &str) -> AuthAction {
    let tokens: Vec<&str> = args.split_whitespace().collect();
    let action = tokens
        .first()
        .map(|token| token.to_ascii_lowercase())
        .unwrap_or_default();
    match action.as_str() {
        "" | "status" => AuthAction::Status,
        "oat" => AuthAction::SwitchToken,
        "api" => {
            // A lone URL argument is ignored; the stored endpoint and key
            // are only bypassed when both url and key are present.
            if tokens.len() >= 3 {
                AuthAction::SwitchApi(ApiSwitchRequest::Explicit {
                    url: tokens[1].to_string(),
                    key: tokens[2].to_string(),
                })
            } else {
                AuthAction::SwitchApi(ApiSwitchRequest::LastUsed)
            }
        }
        _ => AuthAction::Help,
    }
}

/// Runs one `auth` invocation end to end and renders the reply.
pub fn execute_auth_command<C: ConfigStore>(engine: &RotationEngine<C>, args: &str) -> String {
    match parse_auth_action(args) {
        AuthAction::Status => engine
            .status()
            .render(engine.config().official_display_host()),
        AuthAction::SwitchToken => match engine.switch_to_token() {
            Ok(()) => format!(
                "Switched to OAT mode ({}).\n{RESTART_HINT}",
                engine.config().official_display_host()
            ),
            Err(error) => render_switch_error(error),
        },
        AuthAction::SwitchApi(request) => match engine.switch_to_api(request) {
            Ok(receipt) => {
                let mut reply = format!("Switched to API mode.\nBase URL: {}", receipt.base_url);
                if let Some(masked_key) = &receipt.masked_key {
                    reply.push_str(&format!("\nAPI Key: {masked_key}"));
                }
                reply.push_str(&format!("\n\n{RESTART_HINT}"));
                reply
            }
            Err(error) => render_switch_error(error),
        },
        AuthAction::Help => AUTH_HELP.to_string(),
    }
}

fn render_switch_error(error: RotationError) -> String {
    match error {
        RotationError::ProfileNotConfigured { remedy, .. } => remedy,
        RotationError::Store(error) => format!("[auth error] {error:#}"),
    }
}
