//! Task selection
//!
//! A task matches a term equal to its public name (`namespace:task`) or to
//! the name of its namespace.

use super::{Selectable, order_by_name, resolve};
use crate::task::Task;
use crate::workspace::Workspace;

impl Selectable for Task {
    fn matches(&self, term: &str) -> bool {
        self.public_name() == term || self.namespace() == Some(term)
    }

    fn sort_key(&self) -> String {
        self.public_name()
    }
}

/// Resolves tasks across every registry and namespace of a workspace
#[derive(Debug, Clone)]
pub struct TaskQuery<'w> {
    workspace: &'w Workspace,
    selections: Vec<String>,
    filters: Vec<String>,
}

impl<'w> TaskQuery<'w> {
    pub fn new(workspace: &'w Workspace) -> Self {
        Self {
            workspace,
            selections: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Builder pattern: add a task or namespace name to select
    pub fn append_selection(mut self, term: impl Into<String>) -> Self {
        self.selections.push(term.into());
        self
    }

    pub fn append_selections<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections.extend(terms.into_iter().map(Into::into));
        self
    }

    /// Builder pattern: add a task or namespace name every result must match
    pub fn append_filter(mut self, term: impl Into<String>) -> Self {
        self.filters.push(term.into());
        self
    }

    pub fn append_filters<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.extend(terms.into_iter().map(Into::into));
        self
    }

    /// Matching tasks in no particular order
    pub fn get_tasks(&self) -> Vec<&'w Task> {
        resolve(self.workspace.tasks(), &self.selections, &self.filters)
    }

    /// Matching tasks sorted by public name
    pub fn get_tasks_order_by_name(&self) -> Vec<&'w Task> {
        let mut tasks = self.get_tasks();
        order_by_name(&mut tasks);
        tasks
    }
}
