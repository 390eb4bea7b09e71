//! Configuration error types

use thiserror::Error;

/// Errors raised while turning a configuration document into typed records
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Document (or a section of it) has the wrong JSON shape
    #[error("Invalid configuration: {0}")]
    InvalidDocument(String),

    #[error("Unknown top-level key '{0}'")]
    UnknownTopLevelKey(String),

    /// Lowercase key that is not a recognized field of the entity
    #[error("Unknown field '{field}' in {entity} '{name}'")]
    UnknownField {
        entity: &'static str,
        name: String,
        field: String,
    },

    /// Recognized field holding a value of the wrong type
    #[error("Invalid value for '{field}' in {entity} '{name}': expected {expected}")]
    InvalidField {
        entity: &'static str,
        name: String,
        field: String,
        expected: &'static str,
    },

    /// Uppercase host key that is not an ssh_config keyword
    #[error("Unknown ssh parameter '{param}' in host '{host}'")]
    UnknownSshParameter { host: String, param: String },

    #[error("Invalid tag in host '{host}': tags must be strings")]
    InvalidTag { host: String },

    #[error("Invalid hook '{slot}' in host '{host}': expected a command string")]
    InvalidHook { host: String, slot: String },

    #[error("Task '{0}' needs either 'script' or 'file'")]
    MissingBody(String),

    #[error("Task '{0}' sets both 'script' and 'file'")]
    ConflictingBody(String),

    #[error("Script file {path} of task '{task}' does not exist")]
    MissingScriptFile { task: String, path: String },

    #[error("Driver '{0}' has no 'engine'")]
    MissingEngine(String),

    #[error("Driver name '{0}' is reserved for a built-in driver")]
    ReservedDriverName(String),

    /// Array-form entity without a `name` field
    #[error("Missing 'name' in {0} entry")]
    MissingName(&'static str),

    /// Same name used by entities that selections cannot tell apart
    #[error("Ambiguous name '{name}': {reason}")]
    AmbiguousName { name: String, reason: String },
}
