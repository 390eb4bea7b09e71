//! CLI command implementations
//!
//! Listings, the external ssh/scp/rsync/shell commands, task runs and
//! shell integration output.

mod exec;
mod info;
mod list;
mod remote;
mod task;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use essh_core::host::write_ssh_config;
use tempfile::NamedTempFile;

pub use exec::{ExecOptions, cmd_exec};
pub use info::{ALIASES, ConfigScope, cmd_completion, cmd_config_path};
pub use list::{ListOptions, OutputFormat, cmd_hosts, cmd_tags, cmd_tasks};
pub use remote::{cmd_rsync, cmd_scp, cmd_shell, cmd_ssh};
pub use task::cmd_task;

/// The rendered ssh_config on disk
///
/// A temporary file is removed when this value is dropped.
pub enum SshConfigFile {
    Persistent(PathBuf),
    Temporary(NamedTempFile),
}

impl SshConfigFile {
    /// Write `content` to `path`, or to a new temporary file
    pub fn write(content: &str, path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                write_ssh_config(path, content)?;
                Ok(SshConfigFile::Persistent(path.to_path_buf()))
            }
            None => {
                let file = tempfile::Builder::new()
                    .prefix("essh.ssh_config.")
                    .tempfile()
                    .context("Failed to create temporary ssh config")?;
                write_ssh_config(file.path(), content)?;
                tracing::debug!("Using temporary ssh config {}", file.path().display());
                Ok(SshConfigFile::Temporary(file))
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SshConfigFile::Persistent(path) => path,
            SshConfigFile::Temporary(file) => file.path(),
        }
    }
}

/// Map a child exit status onto our own exit code
pub fn exit_code(code: Option<i32>) -> ExitCode {
    ExitCode::from(exit_byte(code))
}

/// Signals and out-of-range codes become 1
fn exit_byte(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok()).unwrap_or(1)
}
