//! Built-in device templates.
//!
//! Each template turns a `device_type` string from the values file into a
//! [`DeviceHandler`] preconfigured with the prompts, error messages and mode
//! transitions of that dialect.

use crate::device::{DeviceHandler, ENABLE_PASSWORD, InputAnswer, InputRule, Transition};
use crate::error::ConnectError;

/// Device types with a built-in template.
pub const BUILTIN_DEVICE_TYPES: &[&str] = &["cisco_ios", "cisco_xe", "cisco_nxos", "arista_eos"];

/// Mode names shared by all templates.
pub const LOGIN_MODE: &str = "login";
pub const ENABLE_MODE: &str = "enable";
pub const CONFIG_MODE: &str = "config";

/// Returns names of all built-in device types.
pub fn available_device_types() -> &'static [&'static str] {
    BUILTIN_DEVICE_TYPES
}

/// Creates the handler for a device type (case-insensitive).
pub fn by_device_type(device_type: &str) -> Result<DeviceHandler, ConnectError> {
    match device_type.trim().to_ascii_lowercase().as_str() {
        "cisco_ios" | "cisco_xe" => cisco_ios(),
        "cisco_nxos" => cisco_nxos(),
        "arista_eos" => arista_eos(),
        _ => Err(ConnectError::TemplateNotFound(device_type.to_string())),
    }
}

/// Command that turns off output paging, sent once the session is in
/// enable mode.
pub fn paging_command(device_type: &str) -> Option<&'static str> {
    match device_type.trim().to_ascii_lowercase().as_str() {
        "cisco_ios" | "cisco_xe" | "cisco_nxos" | "arista_eos" => Some("terminal length 0"),
        _ => None,
    }
}

fn enable_password_rule() -> InputRule {
    InputRule::new(
        "EnablePassword",
        InputAnswer::Param(ENABLE_PASSWORD.to_string()),
        [r"^\x00*\r?(Enable )?[Pp]assword:\s*$"],
    )
}

fn standard_transitions() -> Vec<Transition> {
    vec![
        Transition::new(LOGIN_MODE, "enable", ENABLE_MODE),
        Transition::new(ENABLE_MODE, "configure terminal", CONFIG_MODE),
        Transition::new(CONFIG_MODE, "end", ENABLE_MODE),
        Transition::new(ENABLE_MODE, "disable", LOGIN_MODE),
    ]
}

/// Cisco IOS and IOS-XE.
pub fn cisco_ios() -> Result<DeviceHandler, ConnectError> {
    DeviceHandler::new(
        vec![
            (CONFIG_MODE, vec![r"^[^\s#>]+\([^)]*\)#\s*$"]),
            (ENABLE_MODE, vec![r"^[^\s#>]+#\s*$"]),
            (LOGIN_MODE, vec![r"^[^\s#>]+>\s*$"]),
        ],
        vec![enable_password_rule()],
        vec![r"^\s*--More--\s*$"],
        vec![
            r"^% Invalid input detected at '\^' marker\.",
            r"^% Incomplete command\.",
            r"^% Ambiguous command:",
            r"^% Unknown command",
            r"^% Bad secrets",
            r"^% Access denied",
            r"^Command authorization failed",
            r"^Command rejected:",
        ],
        standard_transitions(),
        vec![],
    )
}

/// Cisco NX-OS. Logins land directly in the privileged prompt.
pub fn cisco_nxos() -> Result<DeviceHandler, ConnectError> {
    DeviceHandler::new(
        vec![
            (CONFIG_MODE, vec![r"^[^\s#>]+\([^)]*\)#\s*$"]),
            (ENABLE_MODE, vec![r"^[^\s#>]+#\s*$"]),
            (LOGIN_MODE, vec![r"^[^\s#>]+>\s*$"]),
        ],
        vec![enable_password_rule()],
        vec![r"^\s*--More--\s*$"],
        vec![
            r"^% Invalid command at '\^' marker\.",
            r"^% Incomplete command",
            r"^% Invalid parameter detected at '\^' marker\.",
            r"^% Permission denied",
            r"^ERROR: .+",
        ],
        standard_transitions(),
        vec![],
    )
}

/// Arista EOS.
pub fn arista_eos() -> Result<DeviceHandler, ConnectError> {
    DeviceHandler::new(
        vec![
            (CONFIG_MODE, vec![r"^[^\s#>]+\([^)]*\)#\s*$"]),
            (ENABLE_MODE, vec![r"^[^\s#>]+#\s*$"]),
            (LOGIN_MODE, vec![r"^[^\s#>]+>\s*$"]),
        ],
        vec![enable_password_rule()],
        vec![r"^\s*--More--\s*$"],
        vec![
            r"^% Invalid input",
            r"^% Incomplete command",
            r"^% Ambiguous command",
            r"^% Unavailable command",
            r"^% Authorization denied",
        ],
        standard_transitions(),
        vec![],
    )
}
