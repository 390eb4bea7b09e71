//! Script drivers
//!
//! A driver is a minijinja template that turns a task's script fragments
//! into one runnable shell script. Two drivers are built in:
//! - `default`: fragments concatenated one per line
//! - `bash`: fragments chained with fail-fast status gating

mod error;
mod templates;

use std::collections::BTreeMap;
use std::path::Path;

use minijinja::context;
use serde::Serialize;

use crate::host::Host;
use crate::registry::Owner;
use crate::task::{Backend, ScriptFragment, Task};

pub use error::RenderError;
pub use templates::{BASH_ENGINE, DEFAULT_ENGINE, render_prefix};

/// Name of the concatenating built-in driver
pub const DEFAULT_DRIVER: &str = "default";

/// Name of the fail-fast built-in driver
pub const BASH_DRIVER: &str = "bash";

/// Inputs to a render beyond the task itself
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderContext<'a> {
    /// Target host, when the task runs once per host
    pub host: Option<&'a Host>,
    /// Generated ssh_config path, exported as `ESSH_SSH_CONFIG`
    pub ssh_config: Option<&'a Path>,
    /// Extra argument given on the command line, exported as `ESSH_PAYLOAD`
    pub payload: Option<&'a str>,
    pub debug: bool,
}

/// A named script-templating strategy
#[derive(Debug, Clone, Default)]
pub struct Driver {
    pub name: String,
    pub description: String,
    /// Template source
    pub engine: String,
    /// Values available to the template as `driver.props`
    pub props: BTreeMap<String, serde_json::Value>,
    pub(crate) owner: Option<Owner>,
}

#[derive(Serialize)]
struct TaskView<'a> {
    name: &'a str,
    public_name: String,
    namespace: Option<&'a str>,
    description: &'a str,
    driver: &'a str,
    backend: Backend,
    parallel: bool,
    privileged: bool,
    tty: bool,
    props: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct HostView<'a> {
    name: &'a str,
    description: &'a str,
    params: &'a BTreeMap<String, String>,
    props: &'a BTreeMap<String, String>,
    tags: &'a [String],
}

#[derive(Serialize)]
struct DriverView<'a> {
    name: &'a str,
    props: &'a BTreeMap<String, serde_json::Value>,
}

impl Driver {
    pub fn new(name: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engine: engine.into(),
            ..Default::default()
        }
    }

    /// Built-in driver by name
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            DEFAULT_DRIVER => Some(Self::new(DEFAULT_DRIVER, DEFAULT_ENGINE)),
            BASH_DRIVER => Some(Self::new(BASH_DRIVER, BASH_ENGINE)),
            _ => None,
        }
    }

    /// Whether `name` belongs to a built-in driver
    pub fn is_reserved(name: &str) -> bool {
        name == DEFAULT_DRIVER || name == BASH_DRIVER
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    /// Render `task` into a runnable script
    ///
    /// Reads the script file for file-based tasks.
    pub fn generate_runnable_content(
        &self,
        task: &Task,
        ctx: &RenderContext<'_>,
    ) -> Result<String, RenderError> {
        let scripts = task.resolve_scripts()?;
        self.render(task, &scripts, ctx)
    }

    /// Render already-resolved fragments
    pub fn render(
        &self,
        task: &Task,
        scripts: &[ScriptFragment],
        ctx: &RenderContext<'_>,
    ) -> Result<String, RenderError> {
        tracing::debug!(
            "Rendering task {} with driver {} ({} fragments)",
            task.public_name(),
            self.name,
            scripts.len()
        );

        let template_name = format!("driver:{}", self.name);
        let mut env = templates::environment();
        env.add_template(&template_name, &self.engine)
            .map_err(|e| self.template_error(e))?;
        let template = env
            .get_template(&template_name)
            .map_err(|e| self.template_error(e))?;

        let task_view = TaskView {
            name: &task.name,
            public_name: task.public_name(),
            namespace: task.namespace(),
            description: &task.description,
            driver: &task.driver,
            backend: task.backend,
            parallel: task.parallel,
            privileged: task.privileged,
            tty: task.tty,
            props: &task.props,
        };
        let host_view = ctx.host.map(|h| HostView {
            name: &h.name,
            description: &h.description,
            params: &h.params,
            props: &h.props,
            tags: &h.tags,
        });
        let driver_view = DriverView {
            name: &self.name,
            props: &self.props,
        };

        template
            .render(context! {
                task => task_view,
                host => host_view,
                driver => driver_view,
                scripts => scripts,
                ssh_config => ctx.ssh_config.map(|p| p.display().to_string()),
                payload => ctx.payload,
                debug => ctx.debug,
                os => std::env::consts::OS,
                arch => std::env::consts::ARCH,
            })
            .map_err(|e| self.template_error(e))
    }

    fn template_error(&self, e: minijinja::Error) -> RenderError {
        RenderError::Template {
            driver: self.name.clone(),
            message: e.to_string(),
        }
    }
}
