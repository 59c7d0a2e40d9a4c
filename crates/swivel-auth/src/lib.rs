//! Auth-profile rotation for a single provider: billing-failure detection,
//! automatic profile fallback, manual OAT/API switching, and the `auth`
//! command surface a chat-agent host wires in.

pub mod billing;
pub mod commands;
pub mod rotation;
pub mod status;

pub use billing::{is_billing_failure, review_outgoing_message, AgentRunOutcome, MessageVerdict};
pub use commands::{execute_auth_command, parse_auth_action, AuthAction, AUTH_HELP};
pub use rotation::{
    ApiSwitch, ApiSwitchRequest, RotationConfig, RotationEngine, RotationError, RotationOutcome,
};
pub use status::{collect_status, mask_secret, AuthMode, AuthStatus};
