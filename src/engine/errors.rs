/// Errors from the formatting engine.
use thiserror::Error;

use super::reference::FormattingMode;

/// Reasons the engine refuses an option set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The option is not in the engine's registry.
    #[error("Unknown option '{name}'")]
    UnknownOption {
        /// The rejected option name.
        name: String,
    },

    /// The option exists but has no meaning in the requested mode.
    #[error("Option '{name}' does not apply to {mode} formatting")]
    NotApplicable {
        name: String,
        mode: FormattingMode,
    },

    /// The value's type does not match the registry.
    #[error("Option '{name}' expects a {expected} value, got {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The value has the right type but is outside what the engine accepts.
    #[error("Invalid value '{value}' for option '{name}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}
