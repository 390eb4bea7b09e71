//! Configuration loading for essh
//!
//! Reads JSONC configuration files (system, user, project, or a single
//! explicit file), validates them into typed records and builds the
//! [`Workspace`]. Sources sharing a data directory feed the same registry,
//! so the user file overrides the system file entry by entry.

pub mod error;
pub mod paths;
pub mod schema;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jsonc_parser::parse_to_serde_value;

use crate::registry::{Registry, RegistryKind};
use crate::workspace::Workspace;

pub use error::ConfigError;
pub use paths::{
    SYSTEM_CONFIG_PATH, expand_home, get_config_dir, get_data_dir, get_project_config_path,
    get_project_data_dir, get_user_config_path,
};
pub use schema::{Document, NamespaceDocument, driver_from_table, host_from_table, task_from_table};

/// One configuration file and the registry it feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub kind: RegistryKind,
    pub data_dir: PathBuf,
}

impl ConfigSource {
    pub fn new(path: impl Into<PathBuf>, kind: RegistryKind, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind,
            data_dir: data_dir.into(),
        }
    }
}

/// System, user and project sources, in load order
///
/// Global sources are skipped when no home directory can be determined.
pub fn default_sources(cwd: &Path) -> Vec<ConfigSource> {
    let mut sources = Vec::new();

    match get_data_dir() {
        Some(data_dir) => {
            sources.push(ConfigSource::new(
                SYSTEM_CONFIG_PATH,
                RegistryKind::Global,
                &data_dir,
            ));
            if let Some(user) = get_user_config_path() {
                sources.push(ConfigSource::new(user, RegistryKind::Global, &data_dir));
            }
        }
        None => tracing::warn!("Could not determine data directory, skipping global config"),
    }

    sources.push(ConfigSource::new(
        get_project_config_path(cwd),
        RegistryKind::Local,
        get_project_data_dir(cwd),
    ));
    sources
}

/// A single explicit file replacing every default source
pub fn explicit_source(path: impl Into<PathBuf>, cwd: &Path) -> ConfigSource {
    ConfigSource::new(path, RegistryKind::Local, get_project_data_dir(cwd))
}

/// Parse and validate JSONC text
///
/// An empty document is valid and declares nothing.
pub fn parse_document(contents: &str, base_dir: &Path) -> Result<Document> {
    let parsed = parse_to_serde_value(contents, &Default::default())
        .map_err(|e| anyhow::anyhow!("Invalid JSONC: {}", e))?;

    match parsed {
        Some(value) => Ok(Document::from_value(&value, base_dir)?),
        None => Ok(Document::default()),
    }
}

/// Read and validate one configuration file
pub fn load_document(path: &Path) -> Result<Document> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open config file: {}", path.display()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_document(&contents, base_dir)
        .with_context(|| format!("Invalid configuration in {}", path.display()))
}

/// Load `source` into `workspace`
///
/// Returns false when the file does not exist.
pub fn load_into(workspace: &mut Workspace, source: &ConfigSource) -> Result<bool> {
    if !source.path.is_file() {
        tracing::debug!("Config file not found, skipping: {}", source.path.display());
        return Ok(false);
    }

    tracing::debug!("Loading config file: {}", source.path.display());
    let mut doc = load_document(&source.path)?;

    if let Some(path) = doc.ssh_config.take() {
        workspace.set_ssh_config_path(expand_home(&path));
    }

    let fresh = Registry::new(&source.data_dir, source.kind).with_source(&source.path);
    match workspace.registry_mut(fresh.key()) {
        Some(registry) => doc.register_into(registry),
        None => {
            let mut registry = fresh;
            doc.register_into(&mut registry);
            workspace.push(registry);
        }
    }

    Ok(true)
}

/// Load every source in order and validate the result
pub fn load_workspace(sources: &[ConfigSource]) -> Result<Workspace> {
    let mut workspace = Workspace::new();
    for source in sources {
        load_into(&mut workspace, source)?;
    }

    workspace
        .validate()
        .context("Configuration has ambiguous names")?;
    Ok(workspace)
}
