//! Workspace: every loaded registry, threaded explicitly through queries,
//! renderers and the CLI

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;
use crate::driver::{Driver, RenderError};
use crate::host::{Host, collect_tags, render_ssh_config};
use crate::query::HostQuery;
use crate::registry::{DEFAULT_NAMESPACE, Entries, Namespace, Registry};
use crate::task::Task;

/// Loaded configuration, in load order
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    registries: Vec<Registry>,
    ssh_config_path: Option<PathBuf>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registry; later registries take precedence in name lookups
    pub fn push(&mut self, registry: Registry) {
        tracing::debug!(
            "Adding {} registry {}",
            registry.kind().as_str(),
            registry.key()
        );
        self.registries.push(registry);
    }

    /// Builder pattern: add a registry
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.push(registry);
        self
    }

    pub fn registries(&self) -> &[Registry] {
        &self.registries
    }

    pub fn registry_mut(&mut self, key: &str) -> Option<&mut Registry> {
        self.registries.iter_mut().find(|r| r.key() == key)
    }

    /// Configured output path of the rendered ssh_config
    pub fn ssh_config_path(&self) -> Option<&Path> {
        self.ssh_config_path.as_deref()
    }

    pub fn set_ssh_config_path(&mut self, path: impl Into<PathBuf>) {
        self.ssh_config_path = Some(path.into());
    }

    /// Every scope of every registry, most recently loaded first
    fn scopes_newest_first(&self) -> impl Iterator<Item = &Entries> {
        self.registries.iter().rev().flat_map(|r| r.scopes().rev())
    }

    /// Every visible host
    ///
    /// A host shadows same-named hosts loaded before it, so each name
    /// appears once with the values [`Workspace::host`] returns.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        let mut seen = HashSet::new();
        self.scopes_newest_first()
            .flat_map(|entries| entries.hosts())
            .filter(move |h| seen.insert(h.name.as_str()))
    }

    /// Every visible task, shadowed by public name
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        let mut seen = HashSet::new();
        self.scopes_newest_first()
            .flat_map(|entries| entries.tasks())
            .filter(move |t| seen.insert(t.public_name()))
    }

    pub fn drivers(&self) -> impl Iterator<Item = &Driver> {
        let mut seen = HashSet::new();
        self.scopes_newest_first()
            .flat_map(|entries| entries.drivers())
            .filter(move |d| seen.insert(d.name.as_str()))
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.registries.iter().flat_map(|r| r.namespaces())
    }

    /// Host by exact name, most recently loaded registry first
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.registries.iter().rev().find_map(|r| r.find::<Host>(name))
    }

    /// Enabled task by name
    ///
    /// An unqualified name is qualified with `namespace` unless that is the
    /// default namespace.
    pub fn task(&self, name: &str, namespace: Option<&str>) -> Option<&Task> {
        let qualified = match namespace {
            Some(ns) if ns != DEFAULT_NAMESPACE && !name.contains(':') => {
                Cow::Owned(format!("{ns}:{name}"))
            }
            _ => Cow::Borrowed(name),
        };

        self.registries.iter().rev().find_map(|r| {
            r.scopes()
                .flat_map(|entries| entries.tasks())
                .find(|t| !t.disabled && t.public_name() == qualified.as_ref())
        })
    }

    /// Driver a task renders with
    ///
    /// Looks in the task's own registry, then the other registries most
    /// recent first, then the built-ins.
    pub fn driver_for(&self, task: &Task) -> Result<Cow<'_, Driver>, RenderError> {
        let owning = task
            .owner()
            .and_then(|o| self.registries.iter().find(|r| r.key() == o.registry));

        let found = owning
            .into_iter()
            .chain(self.registries.iter().rev())
            .find_map(|r| r.find::<Driver>(&task.driver));

        if let Some(driver) = found {
            return Ok(Cow::Borrowed(driver));
        }

        Driver::builtin(&task.driver)
            .map(Cow::Owned)
            .ok_or_else(|| RenderError::UnknownDriver {
                task: task.public_name(),
                driver: task.driver.clone(),
            })
    }

    /// Distinct host tags, sorted
    pub fn tags(&self) -> Vec<String> {
        collect_tags(self.hosts())
    }

    /// ssh_config text for every host, ordered by name
    pub fn ssh_config(&self) -> String {
        render_ssh_config(HostQuery::new(self).get_hosts_order_by_name())
    }

    /// Reject names that selections cannot tell apart
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tags: HashSet<String> = self.tags().into_iter().collect();
        let host_names: HashSet<&str> = self.hosts().map(|h| h.name.as_str()).collect();

        if let Some(name) = host_names.iter().find(|name| tags.contains(**name)) {
            return Err(ConfigError::AmbiguousName {
                name: name.to_string(),
                reason: "a host and a tag share this name".to_string(),
            });
        }

        if let Some(task) = self
            .tasks()
            .find(|t| host_names.contains(t.public_name().as_str()))
        {
            return Err(ConfigError::AmbiguousName {
                name: task.public_name(),
                reason: "a task and a host share this name".to_string(),
            });
        }

        Ok(())
    }
}
