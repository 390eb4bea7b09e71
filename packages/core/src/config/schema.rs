//! Configuration document schema
//!
//! Converts a parsed JSONC document into typed hosts, tasks and drivers.
//! Every key is either a recognized field, an ssh_config keyword (hosts
//! only, uppercase-initial) or an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::error::ConfigError;
use crate::driver::Driver;
use crate::host::{Hook, Host, is_ssh_keyword};
use crate::registry::Registry;
use crate::task::{
    Backend, DEFAULT_PREFIX_LOCAL, DEFAULT_PREFIX_REMOTE, ScriptFragment, Task, TaskBody,
};

type Table = Map<String, Value>;

/// Entities declared inside one namespace
#[derive(Debug, Default)]
pub struct NamespaceDocument {
    pub name: String,
    pub description: String,
    pub hidden: bool,
    pub hosts: Vec<Host>,
    pub tasks: Vec<Task>,
    pub drivers: Vec<Driver>,
}

/// One configuration file, validated
#[derive(Debug, Default)]
pub struct Document {
    pub hosts: Vec<Host>,
    pub tasks: Vec<Task>,
    pub drivers: Vec<Driver>,
    pub namespaces: Vec<NamespaceDocument>,
    /// Output path for the rendered ssh_config
    pub ssh_config: Option<String>,
}

impl Document {
    /// Validate a parsed document
    ///
    /// Relative task `file` paths resolve against `base_dir`.
    pub fn from_value(value: &Value, base_dir: &Path) -> Result<Self, ConfigError> {
        let root = value.as_object().ok_or_else(|| {
            ConfigError::InvalidDocument("top level must be an object".to_string())
        })?;

        let mut doc = Document::default();
        for (key, value) in root {
            match key.as_str() {
                "hosts" => doc.hosts = hosts_from_section(value)?,
                "tasks" => doc.tasks = tasks_from_section(value, base_dir)?,
                "drivers" => doc.drivers = drivers_from_section(value)?,
                "ssh_config" => {
                    let path = value.as_str().ok_or_else(|| {
                        ConfigError::InvalidDocument("'ssh_config' must be a string".to_string())
                    })?;
                    doc.ssh_config = Some(path.to_string());
                }
                "namespaces" => {
                    let namespaces = value.as_object().ok_or_else(|| {
                        ConfigError::InvalidDocument("'namespaces' must be an object".to_string())
                    })?;
                    for (name, table) in namespaces {
                        doc.namespaces
                            .push(namespace_from_value(name, table, base_dir)?);
                    }
                }
                other => return Err(ConfigError::UnknownTopLevelKey(other.to_string())),
            }
        }

        Ok(doc)
    }

    /// Register every entity into `registry`
    pub fn register_into(self, registry: &mut Registry) {
        for host in self.hosts {
            registry.register_host(host);
        }
        for driver in self.drivers {
            registry.register_driver(driver);
        }
        for task in self.tasks {
            registry.register_task(task);
        }

        for ns in self.namespaces {
            let namespace = registry.namespace_mut(&ns.name);
            if !ns.description.is_empty() {
                namespace.description = ns.description;
            }
            namespace.hidden |= ns.hidden;

            for host in ns.hosts {
                registry.register_host_in(&ns.name, host);
            }
            for driver in ns.drivers {
                registry.register_driver_in(&ns.name, driver);
            }
            for task in ns.tasks {
                registry.register_task_in(&ns.name, task);
            }
        }
    }
}

fn namespace_from_value(
    name: &str,
    value: &Value,
    base_dir: &Path,
) -> Result<NamespaceDocument, ConfigError> {
    let table = value.as_object().ok_or_else(|| ConfigError::InvalidField {
        entity: "namespace",
        name: name.to_string(),
        field: name.to_string(),
        expected: "an object",
    })?;

    let mut ns = NamespaceDocument {
        name: name.to_string(),
        ..Default::default()
    };
    for (key, value) in table {
        match key.as_str() {
            "description" => ns.description = string_field("namespace", name, key, value)?,
            "hidden" => ns.hidden = bool_field("namespace", name, key, value)?,
            "hosts" => ns.hosts = hosts_from_section(value)?,
            "tasks" => ns.tasks = tasks_from_section(value, base_dir)?,
            "drivers" => ns.drivers = drivers_from_section(value)?,
            _ => return Err(unknown_field("namespace", name, key)),
        }
    }
    Ok(ns)
}

/// Split a section into `(name, table)` pairs
///
/// Accepts `{ "<name>": {...} }` or `[ { "name": "<name>", ... } ]`.
fn entity_tables(section: &Value, entity: &'static str) -> Result<Vec<(String, Table)>, ConfigError> {
    match section {
        Value::Object(map) => map
            .iter()
            .map(|(name, value)| match value {
                Value::Object(table) => Ok((name.clone(), table.clone())),
                _ => Err(ConfigError::InvalidField {
                    entity,
                    name: name.clone(),
                    field: name.clone(),
                    expected: "an object",
                }),
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let mut table = item.as_object().cloned().ok_or_else(|| {
                    ConfigError::InvalidDocument(format!("{entity} entries must be objects"))
                })?;
                match table.remove("name") {
                    Some(Value::String(name)) => Ok((name, table)),
                    _ => Err(ConfigError::MissingName(entity)),
                }
            })
            .collect(),
        _ => Err(ConfigError::InvalidDocument(format!(
            "{entity} section must be an object or an array"
        ))),
    }
}

fn hosts_from_section(section: &Value) -> Result<Vec<Host>, ConfigError> {
    entity_tables(section, "host")?
        .into_iter()
        .map(|(name, table)| host_from_table(&name, &table))
        .collect()
}

fn tasks_from_section(section: &Value, base_dir: &Path) -> Result<Vec<Task>, ConfigError> {
    entity_tables(section, "task")?
        .into_iter()
        .map(|(name, table)| task_from_table(&name, &table, base_dir))
        .collect()
}

fn drivers_from_section(section: &Value) -> Result<Vec<Driver>, ConfigError> {
    entity_tables(section, "driver")?
        .into_iter()
        .map(|(name, table)| driver_from_table(&name, &table))
        .collect()
}

/// Build a host from its configuration table
pub fn host_from_table(name: &str, table: &Table) -> Result<Host, ConfigError> {
    let mut host = Host::new(name);

    for (key, value) in table {
        if key.starts_with(|c: char| c.is_ascii_uppercase()) {
            if !is_ssh_keyword(key) {
                return Err(ConfigError::UnknownSshParameter {
                    host: name.to_string(),
                    param: key.clone(),
                });
            }
            let value = scalar_string(value).ok_or_else(|| ConfigError::InvalidField {
                entity: "host",
                name: name.to_string(),
                field: key.clone(),
                expected: "a string",
            })?;
            host.params.insert(key.clone(), value);
            continue;
        }

        match key.as_str() {
            "description" => host.description = string_field("host", name, key, value)?,
            "hidden" => host.hidden = bool_field("host", name, key, value)?,
            "props" => host.props = props_field("host", name, value)?,
            "tags" => {
                let items = value.as_array().ok_or_else(|| ConfigError::InvalidField {
                    entity: "host",
                    name: name.to_string(),
                    field: key.clone(),
                    expected: "an array of strings",
                })?;
                host.tags = items
                    .iter()
                    .map(|tag| {
                        tag.as_str().map(str::to_string).ok_or_else(|| ConfigError::InvalidTag {
                            host: name.to_string(),
                        })
                    })
                    .collect::<Result<_, _>>()?;
            }
            "hooks" => apply_hooks(&mut host, value)?,
            _ => return Err(unknown_field("host", name, key)),
        }
    }

    Ok(host)
}

fn apply_hooks(host: &mut Host, value: &Value) -> Result<(), ConfigError> {
    let hooks = value.as_object().ok_or_else(|| ConfigError::InvalidField {
        entity: "host",
        name: host.name.clone(),
        field: "hooks".to_string(),
        expected: "an object",
    })?;

    let command = |slot: &str| -> Result<Option<String>, ConfigError> {
        match hooks.get(slot) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(command)) => Ok(Some(command.clone())),
            Some(_) => Err(ConfigError::InvalidHook {
                host: host.name.clone(),
                slot: slot.to_string(),
            }),
        }
    };

    for slot in hooks.keys() {
        if !matches!(
            slot.as_str(),
            "before" | "before_connect" | "after_connect" | "after" | "after_disconnect"
        ) {
            return Err(unknown_field("host", &host.name, &format!("hooks.{slot}")));
        }
    }

    // Legacy names apply only when the current name is absent
    let before = command("before_connect")?.or(command("before")?);
    let after_connect = command("after_connect")?;
    let after = command("after_disconnect")?.or(command("after")?);

    host.hooks.before_connect = before.map(Hook::Command);
    host.hooks.after_connect = after_connect;
    host.hooks.after_disconnect = after.map(Hook::Command);
    Ok(())
}

/// Build a task from its configuration table
pub fn task_from_table(name: &str, table: &Table, base_dir: &Path) -> Result<Task, ConfigError> {
    let mut task = Task::new(name);
    let mut script: Option<Vec<ScriptFragment>> = None;
    let mut file: Option<PathBuf> = None;
    let mut prefix: Option<&Value> = None;

    for (key, value) in table {
        match key.as_str() {
            "description" => task.description = string_field("task", name, key, value)?,
            "driver" => task.driver = string_field("task", name, key, value)?,
            "script" => script = Some(script_field(name, value)?),
            "file" => file = Some(base_dir.join(string_field("task", name, key, value)?)),
            "backend" => {
                task.backend = match value.as_str() {
                    Some("local") => Backend::Local,
                    Some("remote") => Backend::Remote,
                    _ => {
                        return Err(ConfigError::InvalidField {
                            entity: "task",
                            name: name.to_string(),
                            field: key.clone(),
                            expected: "\"local\" or \"remote\"",
                        });
                    }
                }
            }
            "targets" => task.targets = string_list_field("task", name, key, value)?,
            "filters" => task.filters = string_list_field("task", name, key, value)?,
            "parallel" => task.parallel = bool_field("task", name, key, value)?,
            "privileged" => task.privileged = bool_field("task", name, key, value)?,
            "tty" => task.tty = bool_field("task", name, key, value)?,
            "hidden" => task.hidden = bool_field("task", name, key, value)?,
            "disabled" => task.disabled = bool_field("task", name, key, value)?,
            "prefix" => prefix = Some(value),
            "props" => task.props = props_field("task", name, value)?,
            _ => return Err(unknown_field("task", name, key)),
        }
    }

    task.body = match (script, file) {
        (Some(_), Some(_)) => return Err(ConfigError::ConflictingBody(name.to_string())),
        (None, None) => return Err(ConfigError::MissingBody(name.to_string())),
        (Some(fragments), None) => TaskBody::Script(fragments),
        (None, Some(path)) => {
            if !path.is_file() {
                return Err(ConfigError::MissingScriptFile {
                    task: name.to_string(),
                    path: path.display().to_string(),
                });
            }
            TaskBody::File(path)
        }
    };

    // `prefix: true` picks the default for the backend, so it is resolved last
    task.prefix = match prefix {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::Bool(true)) => Some(
            match task.backend {
                Backend::Remote => DEFAULT_PREFIX_REMOTE,
                Backend::Local => DEFAULT_PREFIX_LOCAL,
            }
            .to_string(),
        ),
        Some(Value::String(template)) => Some(template.clone()),
        Some(_) => {
            return Err(ConfigError::InvalidField {
                entity: "task",
                name: name.to_string(),
                field: "prefix".to_string(),
                expected: "a boolean or a string",
            });
        }
    };

    Ok(task)
}

fn script_field(task: &str, value: &Value) -> Result<Vec<ScriptFragment>, ConfigError> {
    let invalid = || ConfigError::InvalidField {
        entity: "task",
        name: task.to_string(),
        field: "script".to_string(),
        expected: "a string, or an array of strings or {code, description} objects",
    };

    match value {
        Value::String(code) => Ok(vec![ScriptFragment::new(code.clone())]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(code) => Ok(ScriptFragment::new(code.clone())),
                Value::Object(fragment) => {
                    let code = fragment
                        .get("code")
                        .and_then(Value::as_str)
                        .ok_or_else(invalid)?;
                    let description = match fragment.get("description") {
                        None => None,
                        Some(Value::String(d)) => Some(d.clone()),
                        Some(_) => return Err(invalid()),
                    };
                    if fragment.keys().any(|k| k != "code" && k != "description") {
                        return Err(invalid());
                    }
                    Ok(ScriptFragment {
                        code: code.to_string(),
                        description,
                    })
                }
                _ => Err(invalid()),
            })
            .collect(),
        _ => Err(invalid()),
    }
}

/// Build a driver from its configuration table
pub fn driver_from_table(name: &str, table: &Table) -> Result<Driver, ConfigError> {
    if Driver::is_reserved(name) {
        return Err(ConfigError::ReservedDriverName(name.to_string()));
    }

    let mut driver = Driver::new(name, "");
    let mut has_engine = false;
    for (key, value) in table {
        match key.as_str() {
            "engine" => {
                driver.engine = string_field("driver", name, key, value)?;
                has_engine = true;
            }
            "description" => driver.description = string_field("driver", name, key, value)?,
            "props" => {
                let props = value.as_object().ok_or_else(|| ConfigError::InvalidField {
                    entity: "driver",
                    name: name.to_string(),
                    field: key.clone(),
                    expected: "an object",
                })?;
                driver.props = props
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
            }
            _ => return Err(unknown_field("driver", name, key)),
        }
    }

    if !has_engine {
        return Err(ConfigError::MissingEngine(name.to_string()));
    }
    Ok(driver)
}

fn unknown_field(entity: &'static str, name: &str, field: &str) -> ConfigError {
    ConfigError::UnknownField {
        entity,
        name: name.to_string(),
        field: field.to_string(),
    }
}

fn string_field(
    entity: &'static str,
    name: &str,
    field: &str,
    value: &Value,
) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::InvalidField {
            entity,
            name: name.to_string(),
            field: field.to_string(),
            expected: "a string",
        })
}

fn bool_field(
    entity: &'static str,
    name: &str,
    field: &str,
    value: &Value,
) -> Result<bool, ConfigError> {
    value.as_bool().ok_or_else(|| ConfigError::InvalidField {
        entity,
        name: name.to_string(),
        field: field.to_string(),
        expected: "a boolean",
    })
}

/// A string, or an array of strings
fn string_list_field(
    entity: &'static str,
    name: &str,
    field: &str,
    value: &Value,
) -> Result<Vec<String>, ConfigError> {
    let invalid = || ConfigError::InvalidField {
        entity,
        name: name.to_string(),
        field: field.to_string(),
        expected: "a string or an array of strings",
    };

    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

fn props_field(
    entity: &'static str,
    name: &str,
    value: &Value,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let invalid = || ConfigError::InvalidField {
        entity,
        name: name.to_string(),
        field: "props".to_string(),
        expected: "an object of strings",
    };

    value
        .as_object()
        .ok_or_else(invalid)?
        .iter()
        .map(|(k, v)| scalar_string(v).map(|v| (k.clone(), v)).ok_or_else(invalid))
        .collect()
}

/// Strings pass through; numbers and booleans are stringified
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
