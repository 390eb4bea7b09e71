//! Driver rendering error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while turning a task into a runnable script
#[derive(Error, Debug)]
pub enum RenderError {
    /// Task refers to a driver that is neither built in nor registered
    #[error("Unknown driver '{driver}' used by task '{task}'")]
    UnknownDriver { task: String, driver: String },

    /// File-based task whose script cannot be read
    #[error("Failed to read script file {} for task '{task}': {reason}", .path.display())]
    ScriptFile {
        task: String,
        path: PathBuf,
        reason: String,
    },

    /// Driver template failed to parse or evaluate
    #[error("Invalid template in driver '{driver}': {message}")]
    Template { driver: String, message: String },

    /// Output prefix template failed to parse or evaluate
    #[error("Invalid output prefix for task '{task}': {message}")]
    Prefix { task: String, message: String },
}
