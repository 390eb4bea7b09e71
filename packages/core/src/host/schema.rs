//! Host data model
//!
//! A host is a named remote target: the ssh parameters rendered into the
//! generated ssh_config, display metadata, and the connection hooks.

use std::collections::BTreeMap;

use super::hooks::{Hook, Hooks};
use crate::registry::Owner;

/// A remote target
#[derive(Debug, Clone, Default)]
pub struct Host {
    /// Host alias, unique within the scope that owns it
    pub name: String,

    /// Free-form description shown in listings
    pub description: String,

    /// ssh_config parameters (`HostName`, `Port`, ...), kept sorted by key
    pub params: BTreeMap<String, String>,

    /// Extra values exported to task scripts as `ESSH_HOST_PROPS_*`
    pub props: BTreeMap<String, String>,

    /// Tags in declaration order
    pub tags: Vec<String>,

    /// Excluded from listings, still resolvable
    pub hidden: bool,

    pub hooks: Hooks,

    pub(crate) owner: Option<Owner>,
}

impl Host {
    /// Create a host with just a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: set an ssh parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Builder pattern: add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Builder pattern: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder pattern: set a prop
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Builder pattern: mark hidden
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Builder pattern: set the before_connect hook
    pub fn with_before_connect(mut self, hook: impl Into<Hook>) -> Self {
        self.hooks.before_connect = Some(hook.into());
        self
    }

    /// Builder pattern: set the after_connect script
    pub fn with_after_connect(mut self, script: impl Into<String>) -> Self {
        self.hooks.after_connect = Some(script.into());
        self
    }

    /// Builder pattern: set the after_disconnect hook
    pub fn with_after_disconnect(mut self, hook: impl Into<Hook>) -> Self {
        self.hooks.after_disconnect = Some(hook.into());
        self
    }

    /// Description, or "<name> host" when none was given
    pub fn description_or_default(&self) -> String {
        if self.description.is_empty() {
            format!("{} host", self.name)
        } else {
            self.description.clone()
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Scope currently owning this host, once registered
    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_builder() {
        let host = Host::new("web01")
            .with_param("Port", "2222")
            .with_param("HostName", "192.168.0.11")
            .with_tag("web")
            .with_tag("production")
            .with_description("first web server");

        assert_eq!(host.name, "web01");
        assert_eq!(host.tags, vec!["web", "production"]);
        assert!(host.has_tag("web"));
        assert!(!host.has_tag("db"));
        assert!(host.owner().is_none());

        // params iterate in key order regardless of insertion order
        let keys: Vec<&str> = host.params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["HostName", "Port"]);
    }

    #[test]
    fn test_description_or_default() {
        assert_eq!(Host::new("db01").description_or_default(), "db01 host");
        assert_eq!(
            Host::new("db01").with_description("primary").description_or_default(),
            "primary"
        );
    }

    #[test]
    fn test_hook_builders() {
        let host = Host::new("bastion")
            .with_before_connect("echo before")
            .with_after_connect("cd /var/www")
            .with_after_disconnect("echo after");

        assert_eq!(
            host.hooks.before_connect.as_ref().and_then(Hook::as_command),
            Some("echo before")
        );
        assert_eq!(host.hooks.after_connect.as_deref(), Some("cd /var/www"));
        assert!(host.hooks.after_disconnect.is_some());
    }
}
