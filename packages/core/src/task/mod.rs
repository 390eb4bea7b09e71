//! Task module
//!
//! A task is a named unit of work: script fragments (or a script file)
//! rendered by a driver and run against a selection of hosts.

mod schema;

pub use schema::{
    Backend, DEFAULT_PREFIX_LOCAL, DEFAULT_PREFIX_REMOTE, ScriptFragment, Task, TaskBody,
};
