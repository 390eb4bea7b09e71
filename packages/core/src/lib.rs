//! essh-core - configuration resolution and script generation for essh
//!
//! Hosts, tasks and drivers are loaded from JSONC configuration into
//! registries held by a [`Workspace`]. Queries select hosts and tasks,
//! the ssh_config renderer serializes hosts for `ssh -F`, drivers turn
//! tasks into shell scripts, and the hook executor brackets a session.

pub mod command;
pub mod config;
pub mod driver;
pub mod hook;
pub mod host;
pub mod query;
pub mod registry;
pub mod task;
pub mod version;
pub mod workspace;

pub use command::{CommandError, CommandSpec};
pub use config::{ConfigError, ConfigSource, load_workspace};
pub use driver::{Driver, RenderContext, RenderError};
pub use hook::{HookError, HookExecutor, HookPhase, Session};
pub use host::{Hook, Hooks, Host};
pub use query::{HostQuery, TaskQuery};
pub use registry::{Namespace, Owner, Registry, RegistryKind};
pub use task::{
    Backend, DEFAULT_PREFIX_LOCAL, DEFAULT_PREFIX_REMOTE, ScriptFragment, Task, TaskBody,
};
pub use version::{get_version, get_version_long};
pub use workspace::Workspace;
