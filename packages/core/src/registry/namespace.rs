//! Namespaces group entities inside a registry

use super::Entries;
use crate::task::Task;

/// Namespace name that means "no namespace" in task lookups
pub const DEFAULT_NAMESPACE: &str = "default";

/// A named group of hosts, tasks and drivers
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    pub name: String,
    pub description: String,
    pub hidden: bool,
    pub(crate) entries: Entries,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn description_or_default(&self) -> String {
        if self.description.is_empty() {
            format!("{} namespace", self.name)
        } else {
            self.description.clone()
        }
    }

    /// Tasks in this namespace ordered by name
    pub fn sorted_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.entries.tasks().collect();
        tasks.sort_by(|a, b| a.name.cmp(&b.name));
        tasks
    }
}
