//! essh --zsh-completion / --bash-completion / --aliases / --config* -
//! Print shell integration snippets and configuration file paths

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::Command;
use clap_complete::Shell;
use essh_core::config::{SYSTEM_CONFIG_PATH, get_project_config_path, get_user_config_path};

/// Aliases for `eval "$(essh --aliases)"`
pub const ALIASES: &str = "\
# eval \"$(essh --aliases)\" in your shell rc to enable these
alias escp='essh --scp'
alias ersync='essh --rsync'
";

/// Which configuration file `--config`, `--user-config` or `--system-config` names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    /// The explicit `--config-file`, or the project file
    Current,
    User,
    System,
}

/// Path of the configuration file for `scope`
pub fn config_path(scope: ConfigScope, explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    match scope {
        ConfigScope::Current => Ok(explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| get_project_config_path(cwd))),
        ConfigScope::User => {
            get_user_config_path().ok_or_else(|| anyhow!("Could not determine config directory"))
        }
        ConfigScope::System => Ok(PathBuf::from(SYSTEM_CONFIG_PATH)),
    }
}

pub fn cmd_config_path(scope: ConfigScope, explicit: Option<&Path>, cwd: &Path) -> Result<()> {
    println!("{}", config_path(scope, explicit, cwd)?.display());
    Ok(())
}

fn write_completion<W: Write>(shell: Shell, cmd: &mut Command, out: &mut W) {
    clap_complete::generate(shell, cmd, "essh", out);
}

/// Print the completion script for `shell`
pub fn cmd_completion(shell: Shell, mut cmd: Command) {
    write_completion(shell, &mut cmd, &mut std::io::stdout());
}
