//! Error types for the clush shell core.
//!
//! Uses `thiserror` for public API error types with structured error variants
//! covering registration, navigation, dispatch, configuration and command execution.
//!
//! Only [`RegistrationError`] is fatal: it is raised while level registries are
//! built at startup. Everything else is recovered at the dispatch boundary and
//! shown to the operator.

use std::path::PathBuf;

use crate::skill::SkillLevel;

/// Top-level error type for the clush core library.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("{0}")]
    Navigation(#[from] NavigationError),

    #[error("{name} not found in {level}")]
    NotFound { name: String, level: String },

    #[error("{command}: requires skill level {required} (current: {current})")]
    CapabilityRefused {
        command: String,
        required: SkillLevel,
        current: SkillLevel,
    },

    #[error("usage: {usage}")]
    Usage { command: String, usage: String },

    #[error("{command}: {source}")]
    Command {
        command: String,
        #[source]
        source: CommandError,
    },

    #[error("No help found for '{subject}'")]
    HelpNotFound { subject: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building level registries. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("{level}: '{name}' is already registered")]
    DuplicateName { level: String, name: String },

    #[error("{level}: invalid command function {identifier}: {reason}")]
    InvalidSignature {
        level: String,
        identifier: String,
        reason: String,
    },

    #[error("{level}: invalid name '{name}'")]
    InvalidName { level: String, name: String },

    #[error("level '{level}' contains itself")]
    Cycle { level: String },
}

/// Errors from level stack transitions.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("Already at the top level")]
    AtRoot,

    #[error("Leaving {level} was cancelled")]
    Vetoed { level: String },

    #[error("Requirements for level {level} are not met")]
    RequirementsNotMet { level: String },

    #[error("{name} not found in {level}")]
    NotFound { name: String, level: String },
}

/// Errors reported by command handlers.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{message}")]
    Failed { message: String },

    #[error("invalid argument '{value}': {reason}")]
    InvalidArgument { value: String, reason: String },

    #[error("operation did not complete: {message}")]
    Incomplete { message: String },
}

impl CommandError {
    /// Shorthand for a plain failure message.
    pub fn failed(message: impl Into<String>) -> Self {
        CommandError::Failed {
            message: message.into(),
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Raised when a skill level name or number is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown skill level: {0}")]
pub struct SkillLevelError(pub String);

/// A type alias for results using the top-level `ShellError`.
pub type Result<T> = std::result::Result<T, ShellError>;
