//! Host selection

use super::{Selectable, order_by_name, resolve};
use crate::host::Host;
use crate::workspace::Workspace;

impl Selectable for Host {
    fn matches(&self, term: &str) -> bool {
        self.name == term || self.has_tag(term)
    }

    fn sort_key(&self) -> String {
        self.name.clone()
    }
}

/// Resolves hosts across every registry and namespace of a workspace
#[derive(Debug, Clone)]
pub struct HostQuery<'w> {
    workspace: &'w Workspace,
    selections: Vec<String>,
    filters: Vec<String>,
}

impl<'w> HostQuery<'w> {
    pub fn new(workspace: &'w Workspace) -> Self {
        Self {
            workspace,
            selections: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Builder pattern: add a host name or tag to select
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

    /// Builder pattern: add a host name or tag every result must match
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

    /// Matching hosts in no particular order
    pub fn get_hosts(&self) -> Vec<&'w Host> {
        resolve(self.workspace.hosts(), &self.selections, &self.filters)
    }

    /// Matching hosts sorted by name
    pub fn get_hosts_order_by_name(&self) -> Vec<&'w Host> {
        let mut hosts = self.get_hosts();
        order_by_name(&mut hosts);
        hosts
    }

    /// First matching host by name
    pub fn first(&self) -> Option<&'w Host> {
        self.get_hosts_order_by_name().into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Registry, RegistryKind};

    fn workspace() -> Workspace {
        let mut reg = Registry::new("/tmp/essh-query", RegistryKind::Local);
        reg.register_host(Host::new("B").with_tag("web"));
        reg.register_host(Host::new("C").with_tag("db"));
        reg.register_host_in("proj", Host::new("A").with_tag("web"));
        Workspace::new().with_registry(reg)
    }

    fn names(hosts: &[&Host]) -> Vec<String> {
        hosts.iter().map(|h| h.name.clone()).collect()
    }

    #[test]
    fn test_no_selection_returns_everything() {
        let ws = workspace();
        assert_eq!(HostQuery::new(&ws).get_hosts().len(), 3);
    }

    #[test]
    fn test_selection_is_union_of_names_and_tags() {
        let ws = workspace();
        let hosts = HostQuery::new(&ws)
            .append_selections(["A", "web"])
            .get_hosts_order_by_name();
        assert_eq!(names(&hosts), vec!["A", "B"]);
    }

    #[test]
    fn test_filters_intersect() {
        let ws = workspace();
        let hosts = HostQuery::new(&ws)
            .append_filter("web")
            .append_filter("db")
            .get_hosts();
        assert!(hosts.is_empty());
    }

    #[test]
    fn test_selection_then_filter() {
        let ws = workspace();
        let hosts = HostQuery::new(&ws)
            .append_selection("web")
            .append_filter("A")
            .get_hosts();
        assert_eq!(names(&hosts), vec!["A"]);
    }

    #[test]
    fn test_order_by_name() {
        let ws = workspace();
        let hosts = HostQuery::new(&ws).get_hosts_order_by_name();
        assert_eq!(names(&hosts), vec!["A", "B", "C"]);
        assert_eq!(HostQuery::new(&ws).first().unwrap().name, "A");
    }

    #[test]
    fn test_unknown_terms_match_nothing() {
        let ws = workspace();
        assert!(HostQuery::new(&ws).append_selection("nope").get_hosts().is_empty());
        assert!(HostQuery::new(&ws).append_filter("nope").get_hosts().is_empty());
        assert!(HostQuery::new(&ws).append_selection("nope").first().is_none());
    }

    #[test]
    fn test_spans_registries() {
        let mut ws = workspace();
        let mut other = Registry::new("/tmp/essh-query-2", RegistryKind::Global);
        other.register_host(Host::new("D").with_tag("web"));
        ws.push(other);

        let hosts = HostQuery::new(&ws).append_selection("web").get_hosts_order_by_name();
        assert_eq!(names(&hosts), vec!["A", "B", "D"]);
    }
}
