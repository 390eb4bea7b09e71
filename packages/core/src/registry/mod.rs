//! Registries and namespaces
//!
//! A registry holds the hosts, tasks and drivers loaded from one
//! configuration scope (system-wide, per-user, per-project). Inside a
//! registry, namespaces group entities further and qualify task names as
//! `namespace:task`.
//!
//! Within one registry a name lives in exactly one scope: placing an entity
//! into a scope drops any same-named entity of the same kind from every
//! other scope of that registry, and updates the entity's owner in the same
//! step.

mod namespace;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::driver::Driver;
use crate::host::Host;
use crate::task::Task;

pub use namespace::{DEFAULT_NAMESPACE, Namespace};

/// Scope that currently owns an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Owner {
    /// Key of the owning registry
    pub registry: String,
    /// Owning namespace, `None` for the registry's top level
    pub namespace: Option<String>,
}

/// Whether a registry was loaded from a machine/user-wide or a project config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Global,
    Local,
}

impl RegistryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKind::Global => "global",
            RegistryKind::Local => "local",
        }
    }
}

/// Hosts, tasks and drivers of one scope
#[derive(Debug, Clone, Default)]
pub struct Entries {
    pub(crate) hosts: HashMap<String, Host>,
    pub(crate) tasks: HashMap<String, Task>,
    pub(crate) drivers: HashMap<String, Driver>,
}

impl Entries {
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn drivers(&self) -> impl Iterator<Item = &Driver> {
        self.drivers.values()
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn driver(&self, name: &str) -> Option<&Driver> {
        self.drivers.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.tasks.is_empty() && self.drivers.is_empty()
    }
}

/// Something a registry can own
pub trait Entity: Sized {
    fn entity_name(&self) -> &str;
    fn set_owner(&mut self, owner: Owner);
    fn map(entries: &Entries) -> &HashMap<String, Self>;
    fn map_mut(entries: &mut Entries) -> &mut HashMap<String, Self>;
}

impl Entity for Host {
    fn entity_name(&self) -> &str {
        &self.name
    }
    fn set_owner(&mut self, owner: Owner) {
        self.owner = Some(owner);
    }
    fn map(entries: &Entries) -> &HashMap<String, Self> {
        &entries.hosts
    }
    fn map_mut(entries: &mut Entries) -> &mut HashMap<String, Self> {
        &mut entries.hosts
    }
}

impl Entity for Task {
    fn entity_name(&self) -> &str {
        &self.name
    }
    fn set_owner(&mut self, owner: Owner) {
        self.owner = Some(owner);
    }
    fn map(entries: &Entries) -> &HashMap<String, Self> {
        &entries.tasks
    }
    fn map_mut(entries: &mut Entries) -> &mut HashMap<String, Self> {
        &mut entries.tasks
    }
}

impl Entity for Driver {
    fn entity_name(&self) -> &str {
        &self.name
    }
    fn set_owner(&mut self, owner: Owner) {
        self.owner = Some(owner);
    }
    fn map(entries: &Entries) -> &HashMap<String, Self> {
        &entries.drivers
    }
    fn map_mut(entries: &mut Entries) -> &mut HashMap<String, Self> {
        &mut entries.drivers
    }
}

/// An isolated configuration scope
#[derive(Debug, Clone)]
pub struct Registry {
    key: String,
    data_dir: PathBuf,
    kind: RegistryKind,
    source: Option<PathBuf>,
    entries: Entries,
    namespaces: BTreeMap<String, Namespace>,
}

impl Registry {
    /// Create an empty registry backed by `data_dir`
    ///
    /// The key is the SHA-256 hex digest of the data dir path.
    pub fn new(data_dir: impl Into<PathBuf>, kind: RegistryKind) -> Self {
        let data_dir = data_dir.into();
        let key = format!(
            "{:x}",
            Sha256::digest(data_dir.to_string_lossy().as_bytes())
        );

        Self {
            key,
            data_dir,
            kind,
            source: None,
            entries: Entries::default(),
            namespaces: BTreeMap::new(),
        }
    }

    /// Builder pattern: record the config file this registry was loaded from
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.data_dir.join("modules")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.data_dir.join("tmp")
    }

    /// Create the derived storage directories
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.cache_dir(), self.modules_dir(), self.tmp_dir()] {
            if !dir.exists() {
                fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
                tracing::debug!("Created registry directory: {}", dir.display());
            }
        }
        Ok(())
    }

    /// Top-level entries
    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// Get or create a namespace
    pub fn namespace_mut(&mut self, name: &str) -> &mut Namespace {
        self.namespaces
            .entry(name.to_string())
            .or_insert_with(|| Namespace::new(name))
    }

    /// Top-level entries followed by every namespace's entries
    pub fn scopes(&self) -> impl DoubleEndedIterator<Item = &Entries> {
        std::iter::once(&self.entries).chain(self.namespaces.values().map(|ns| &ns.entries))
    }

    /// Register at top level, returning the entity it replaced
    pub fn register<T: Entity>(&mut self, entity: T) -> Option<T> {
        self.place(entity, None)
    }

    /// Register into a namespace, returning the entity it replaced
    ///
    /// A same-named entity at top level is removed. Other namespaces keep
    /// theirs, so `a:deploy` and `b:deploy` can coexist.
    pub fn register_in<T: Entity>(&mut self, namespace: &str, entity: T) -> Option<T> {
        self.place(entity, Some(namespace))
    }

    pub fn register_host(&mut self, host: Host) -> Option<Host> {
        self.register(host)
    }

    pub fn register_task(&mut self, task: Task) -> Option<Task> {
        self.register(task)
    }

    pub fn register_driver(&mut self, driver: Driver) -> Option<Driver> {
        self.register(driver)
    }

    pub fn register_host_in(&mut self, namespace: &str, host: Host) -> Option<Host> {
        self.register_in(namespace, host)
    }

    pub fn register_task_in(&mut self, namespace: &str, task: Task) -> Option<Task> {
        self.register_in(namespace, task)
    }

    pub fn register_driver_in(&mut self, namespace: &str, driver: Driver) -> Option<Driver> {
        self.register_in(namespace, driver)
    }

    /// Move an entity between scopes of this registry
    ///
    /// `from` and `to` are namespace names, or `None` for top level. Returns
    /// the new owner, or `None` when `from` holds no entity of that name.
    pub fn move_entity<T: Entity>(
        &mut self,
        name: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Option<Owner> {
        let entity = self.take::<T>(name, from)?;
        self.place(entity, to);
        Some(self.owner_for(to))
    }

    pub fn move_host(&mut self, name: &str, from: Option<&str>, to: Option<&str>) -> Option<Owner> {
        self.move_entity::<Host>(name, from, to)
    }

    pub fn move_task(&mut self, name: &str, from: Option<&str>, to: Option<&str>) -> Option<Owner> {
        self.move_entity::<Task>(name, from, to)
    }

    /// Find an entity in this registry
    ///
    /// Namespaces shadow top level; among namespaces the last by name wins.
    pub fn find<T: Entity>(&self, name: &str) -> Option<&T> {
        self.scopes().rev().find_map(|entries| T::map(entries).get(name))
    }

    fn owner_for(&self, namespace: Option<&str>) -> Owner {
        Owner {
            registry: self.key.clone(),
            namespace: namespace.map(str::to_string),
        }
    }

    fn take<T: Entity>(&mut self, name: &str, scope: Option<&str>) -> Option<T> {
        let entries = match scope {
            Some(ns) => &mut self.namespaces.get_mut(ns)?.entries,
            None => &mut self.entries,
        };
        T::map_mut(entries).remove(name)
    }

    fn place<T: Entity>(&mut self, mut entity: T, namespace: Option<&str>) -> Option<T> {
        let name = entity.entity_name().to_string();
        // Same name may not resolve both at top level and inside a namespace
        if namespace.is_some() {
            if let Some(top) = self.take::<T>(&name, None) {
                tracing::debug!("Removed top-level {} now owned by a namespace", top.entity_name());
            }
        }

        entity.set_owner(self.owner_for(namespace));
        let entries = match namespace {
            Some(ns) => &mut self.namespace_mut(ns).entries,
            None => &mut self.entries,
        };
        let previous = T::map_mut(entries).insert(name.clone(), entity);

        tracing::debug!(
            "Registered {} in registry {} ({})",
            name,
            self.kind.as_str(),
            namespace.unwrap_or("top level")
        );
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new("/tmp/essh-test-data", RegistryKind::Local)
    }

    fn scopes_holding(reg: &Registry, name: &str) -> usize {
        reg.scopes()
            .filter(|entries| entries.host(name).is_some())
            .count()
    }

    #[test]
    fn test_key_is_sha256_of_data_dir() {
        let a = Registry::new("/a", RegistryKind::Global);
        let b = Registry::new("/a", RegistryKind::Local);
        let c = Registry::new("/b", RegistryKind::Global);
        assert_eq!(a.key().len(), 64);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_derived_dirs() {
        let reg = registry();
        assert_eq!(reg.cache_dir(), PathBuf::from("/tmp/essh-test-data/cache"));
        assert_eq!(reg.modules_dir(), PathBuf::from("/tmp/essh-test-data/modules"));
        assert_eq!(reg.tmp_dir(), PathBuf::from("/tmp/essh-test-data/tmp"));
    }

    #[test]
    fn test_ensure_dirs_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let reg = Registry::new(dir.path().join("data"), RegistryKind::Local);
        reg.ensure_dirs().unwrap();
        assert!(reg.cache_dir().is_dir());
        assert!(reg.modules_dir().is_dir());
        assert!(reg.tmp_dir().is_dir());
    }

    #[test]
    fn test_reregistration_last_write_wins() {
        let mut reg = registry();
        assert!(reg.register_host(Host::new("X").with_description("first")).is_none());
        let previous = reg.register_host(Host::new("X").with_description("second"));

        assert_eq!(previous.unwrap().description, "first");
        assert_eq!(reg.entries().hosts().count(), 1);
        assert_eq!(reg.entries().host("X").unwrap().description, "second");
    }

    #[test]
    fn test_register_sets_owner() {
        let mut reg = registry();
        reg.register_host(Host::new("a"));
        reg.register_host_in("proj", Host::new("b"));

        let a = reg.entries().host("a").unwrap();
        assert_eq!(a.owner().unwrap().registry, reg.key());
        assert!(a.owner().unwrap().namespace.is_none());

        let b = reg.namespace("proj").unwrap().entries().host("b").unwrap();
        assert_eq!(b.owner().unwrap().namespace.as_deref(), Some("proj"));
    }

    #[test]
    fn test_register_in_namespace_removes_top_level() {
        let mut reg = registry();
        reg.register_host(Host::new("web01"));
        reg.register_host_in("proj", Host::new("web01"));

        assert!(reg.entries().host("web01").is_none());
        assert_eq!(scopes_holding(&reg, "web01"), 1);
    }

    #[test]
    fn test_namespaces_keep_same_named_entities() {
        let mut reg = registry();
        reg.register_task_in("proj1", Task::new("deploy").with_description("one"));
        reg.register_task_in("proj2", Task::new("deploy").with_description("two"));

        let one = reg.namespace("proj1").unwrap().entries().task("deploy").unwrap();
        let two = reg.namespace("proj2").unwrap().entries().task("deploy").unwrap();
        assert_eq!(one.description, "one");
        assert_eq!(two.description, "two");
        assert_eq!(one.public_name(), "proj1:deploy");
        assert_eq!(two.public_name(), "proj2:deploy");
    }

    #[test]
    fn test_top_level_registration_keeps_namespaces() {
        let mut reg = registry();
        reg.register_host_in("a", Host::new("h"));
        reg.register_host(Host::new("h"));

        assert_eq!(scopes_holding(&reg, "h"), 2);
        assert!(reg.namespace("a").unwrap().entries().host("h").is_some());
        assert_eq!(
            reg.find::<Host>("h").unwrap().owner().unwrap().namespace.as_deref(),
            Some("a")
        );
    }

    #[test]
    fn test_reregistration_in_namespace_replaces_only_there() {
        let mut reg = registry();
        reg.register_host_in("a", Host::new("h").with_description("first"));
        let previous = reg.register_host_in("a", Host::new("h").with_description("second"));

        assert_eq!(previous.unwrap().description, "first");
        assert_eq!(scopes_holding(&reg, "h"), 1);
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let mut reg = registry();
        reg.register_host(Host::new("deploy"));
        reg.register_task_in("proj", Task::new("deploy"));

        assert!(reg.entries().host("deploy").is_some());
        assert!(reg.find::<Task>("deploy").is_some());
    }

    #[test]
    fn test_move_host() {
        let mut reg = registry();
        reg.register_host(Host::new("db01").with_tag("db"));

        let owner = reg.move_host("db01", None, Some("proj")).unwrap();
        assert_eq!(owner.namespace.as_deref(), Some("proj"));
        assert!(reg.entries().host("db01").is_none());

        let moved = reg.namespace("proj").unwrap().entries().host("db01").unwrap();
        assert_eq!(moved.owner(), Some(&owner));
        assert_eq!(moved.tags, vec!["db"]);

        let owner = reg.move_host("db01", Some("proj"), None).unwrap();
        assert!(owner.namespace.is_none());
        assert!(reg.entries().host("db01").is_some());
        assert_eq!(scopes_holding(&reg, "db01"), 1);
    }

    #[test]
    fn test_move_missing_returns_none() {
        let mut reg = registry();
        assert!(reg.move_task("nope", None, Some("proj")).is_none());
        reg.register_task(Task::new("t"));
        assert!(reg.move_task("t", Some("other"), None).is_none());
        assert!(reg.entries().task("t").is_some());
    }
}
