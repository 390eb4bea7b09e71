//! Path resolution for essh configuration and data
//!
//! - System: `/etc/essh/config.jsonc`
//! - User: `~/.config/essh/config.jsonc`, data in `~/.local/share/essh/`
//! - Project: `./esshconfig.jsonc`, data in `./.essh/`

use std::path::{Path, PathBuf};

/// System-wide configuration file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/essh/config.jsonc";

/// Per-project configuration file name, looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "esshconfig.jsonc";

/// Per-project data directory name
pub const PROJECT_DATA_DIR: &str = ".essh";

/// Get the user configuration directory
///
/// - Linux/macOS: `~/.config/essh/` (XDG-style, not ~/Library)
/// - Windows: `%APPDATA%\essh\`
pub fn get_config_dir() -> Option<PathBuf> {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".config").join("essh"))
    }
    #[cfg(target_os = "windows")]
    {
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("essh"))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}

/// Get the user data directory backing global registries
///
/// - Linux/macOS: `~/.local/share/essh/`
/// - Windows: `%LOCALAPPDATA%\essh\`
pub fn get_data_dir() -> Option<PathBuf> {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".local").join("share").join("essh"))
    }
    #[cfg(target_os = "windows")]
    {
        directories::BaseDirs::new().map(|dirs| dirs.data_local_dir().join("essh"))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}

/// Returns: `{config_dir}/config.jsonc`
pub fn get_user_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join("config.jsonc"))
}

/// Returns: `{dir}/esshconfig.jsonc`
pub fn get_project_config_path(dir: &Path) -> PathBuf {
    dir.join(PROJECT_CONFIG_FILE)
}

/// Returns: `{dir}/.essh`
pub fn get_project_data_dir(dir: &Path) -> PathBuf {
    dir.join(PROJECT_DATA_DIR)
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    match (path.strip_prefix("~"), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}
