//! Task data model

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::driver::{DEFAULT_DRIVER, RenderError};
use crate::registry::Owner;

/// Default output prefix for tasks run on remote hosts
pub const DEFAULT_PREFIX_REMOTE: &str = "[remote] {{ host.name }}: ";

/// Default output prefix for tasks run locally
pub const DEFAULT_PREFIX_LOCAL: &str = "[local] {{ host.name }}: ";

/// One piece of a task's inline script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptFragment {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ScriptFragment {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: None,
        }
    }
}

/// Where a task's script comes from
///
/// Inline fragments and a script file are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskBody {
    Script(Vec<ScriptFragment>),
    File(PathBuf),
}

impl Default for TaskBody {
    fn default() -> Self {
        TaskBody::Script(Vec::new())
    }
}

/// Where the rendered script runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// On this machine, once per target host (or once with no host)
    #[default]
    Local,
    /// On each target host over ssh
    Remote,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Local => "local",
            Backend::Remote => "remote",
        }
    }
}

/// A named unit of work
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub description: String,

    /// Driver name, resolved when the task is rendered
    pub driver: String,

    pub body: TaskBody,
    pub backend: Backend,

    /// Host names or tags selecting the targets
    pub targets: Vec<String>,

    /// Host names or tags narrowing the selected targets
    pub filters: Vec<String>,

    /// Run across targets concurrently
    pub parallel: bool,

    /// Run the script through sudo
    pub privileged: bool,

    /// Allocate a pseudo-terminal on the remote side
    pub tty: bool,

    /// Output line prefix template
    pub prefix: Option<String>,

    pub hidden: bool,
    pub disabled: bool,

    /// Extra values exported as `ESSH_TASK_PROPS_*`
    pub props: BTreeMap<String, String>,

    pub(crate) owner: Option<Owner>,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            driver: DEFAULT_DRIVER.to_string(),
            body: TaskBody::default(),
            backend: Backend::default(),
            targets: Vec::new(),
            filters: Vec::new(),
            parallel: false,
            privileged: false,
            tty: false,
            prefix: None,
            hidden: false,
            disabled: false,
            props: BTreeMap::new(),
            owner: None,
        }
    }
}

impl Task {
    /// Create a task with an empty inline script and the default driver
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: append an inline script fragment
    ///
    /// Replaces a file body if one was set.
    pub fn with_script(mut self, code: impl Into<String>) -> Self {
        match &mut self.body {
            TaskBody::Script(fragments) => fragments.push(ScriptFragment::new(code)),
            TaskBody::File(_) => self.body = TaskBody::Script(vec![ScriptFragment::new(code)]),
        }
        self
    }

    /// Builder pattern: use a script file as body
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.body = TaskBody::File(path.into());
        self
    }

    /// Builder pattern: set driver name
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder pattern: run remotely on the given targets
    pub fn on(mut self, targets: &[&str]) -> Self {
        self.backend = Backend::Remote;
        self.targets = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Name of the owning namespace, if any
    pub fn namespace(&self) -> Option<&str> {
        self.owner.as_ref().and_then(|o| o.namespace.as_deref())
    }

    /// Name qualified with its namespace (`namespace:task`)
    pub fn public_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}:{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    pub fn description_or_default(&self) -> String {
        if self.description.is_empty() {
            format!("{} task", self.public_name())
        } else {
            self.description.clone()
        }
    }

    pub fn is_remote(&self) -> bool {
        self.backend == Backend::Remote
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    /// Fragments to hand to a driver
    ///
    /// A file body is read and handed over as a single fragment.
    pub fn resolve_scripts(&self) -> Result<Vec<ScriptFragment>, RenderError> {
        match &self.body {
            TaskBody::Script(fragments) => Ok(fragments.clone()),
            TaskBody::File(path) => {
                tracing::debug!("Reading script file for task {}: {}", self.name, path.display());
                let code = fs::read_to_string(path).map_err(|e| RenderError::ScriptFile {
                    task: self.public_name(),
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Ok(vec![ScriptFragment::new(code)])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_defaults() {
        let task = Task::new("deploy");
        assert_eq!(task.driver, DEFAULT_DRIVER);
        assert_eq!(task.backend, Backend::Local);
        assert_eq!(task.body, TaskBody::Script(Vec::new()));
        assert!(!task.parallel && !task.privileged && !task.tty);
        assert_eq!(task.public_name(), "deploy");
    }

    #[test]
    fn test_with_script_then_file_keeps_one_body() {
        let task = Task::new("t").with_script("echo a").with_file("/tmp/x.sh");
        assert_eq!(task.body, TaskBody::File(PathBuf::from("/tmp/x.sh")));

        let task = task.with_script("echo b");
        assert_eq!(
            task.body,
            TaskBody::Script(vec![ScriptFragment::new("echo b")])
        );
    }

    #[test]
    fn test_public_name_with_namespace() {
        let mut task = Task::new("build");
        task.owner = Some(Owner {
            registry: "abc".to_string(),
            namespace: Some("proj".to_string()),
        });
        assert_eq!(task.namespace(), Some("proj"));
        assert_eq!(task.public_name(), "proj:build");
        assert_eq!(task.description_or_default(), "proj:build task");
    }

    #[test]
    fn test_resolve_scripts_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.sh");
        fs::write(&path, "echo from-file\n").unwrap();

        let task = Task::new("t").with_file(&path);
        let scripts = task.resolve_scripts().unwrap();
        assert_eq!(scripts, vec![ScriptFragment::new("echo from-file\n")]);
    }

    #[test]
    fn test_resolve_scripts_missing_file_is_error() {
        let task = Task::new("t").with_file("/nonexistent/essh/run.sh");
        let err = task.resolve_scripts().unwrap_err();
        assert!(matches!(err, RenderError::ScriptFile { .. }));
    }
}
