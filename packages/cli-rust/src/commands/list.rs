//! essh --hosts / --tasks / --tags - List configured entities

use anyhow::Result;
use clap::ValueEnum;
use comfy_table::{Cell, Color, Table};
use console::style;
use essh_core::{Backend, Host, HostQuery, Task, TaskQuery, Workspace};
use serde_json::{Map, Value, json};

/// Machine-readable listing formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Prettyjson,
}

/// Selections, filters and display options shared by the listings
pub struct ListOptions<'a> {
    pub select: &'a [String],
    pub filter: &'a [String],
    pub format: Option<OutputFormat>,
    pub quiet: bool,
    pub verbose: bool,
}

/// Registry kind and namespace an entity was loaded into
fn scope_label(ws: &Workspace, owner: Option<&essh_core::Owner>) -> String {
    let Some(owner) = owner else {
        return "-".to_string();
    };
    let kind = ws
        .registries()
        .iter()
        .find(|r| r.key() == owner.registry)
        .map(|r| r.kind().as_str())
        .unwrap_or("?");
    match &owner.namespace {
        Some(ns) => format!("{kind}:{ns}"),
        None => kind.to_string(),
    }
}

fn backend_color(backend: Backend) -> Color {
    match backend {
        Backend::Remote => Color::Cyan,
        Backend::Local => Color::Green,
    }
}

fn print_json(value: &Value, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::Prettyjson => serde_json::to_string_pretty(value)?,
    };
    println!("{text}");
    Ok(())
}

/// `[{ "<name>": { <params>, description, hidden, tags } }]`
fn hosts_json(hosts: &[&Host]) -> Value {
    Value::Array(
        hosts
            .iter()
            .map(|host| {
                let mut fields: Map<String, Value> = host
                    .params
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                fields.insert("description".to_string(), json!(host.description));
                fields.insert("hidden".to_string(), json!(host.hidden));
                fields.insert("tags".to_string(), json!(host.tags));

                let mut entry = Map::new();
                entry.insert(host.name.clone(), Value::Object(fields));
                Value::Object(entry)
            })
            .collect(),
    )
}

fn tasks_json(tasks: &[&Task]) -> Value {
    Value::Array(
        tasks
            .iter()
            .map(|task| {
                json!({
                    "name": task.public_name(),
                    "description": task.description,
                    "backend": task.backend.as_str(),
                    "driver": task.driver,
                    "targets": task.targets,
                    "filters": task.filters,
                    "parallel": task.parallel,
                    "privileged": task.privileged,
                })
            })
            .collect(),
    )
}

/// List hosts, excluding hidden ones
pub fn cmd_hosts(ws: &Workspace, opts: &ListOptions<'_>) -> Result<()> {
    let hosts: Vec<&Host> = HostQuery::new(ws)
        .append_selections(opts.select)
        .append_filters(opts.filter)
        .get_hosts_order_by_name()
        .into_iter()
        .filter(|h| !h.hidden)
        .collect();

    if let Some(format) = opts.format {
        return print_json(&hosts_json(&hosts), format);
    }

    if opts.quiet {
        for host in &hosts {
            println!("{}", host.name);
        }
        return Ok(());
    }

    if hosts.is_empty() {
        println!("No hosts found.");
        return Ok(());
    }

    let mut table = Table::new();
    let mut header = vec!["NAME", "DESCRIPTION", "TAGS"];
    if opts.verbose {
        header.extend(["HOSTNAME", "SCOPE"]);
    }
    table.set_header(header);

    for host in hosts {
        let tags = if host.tags.is_empty() {
            "-".to_string()
        } else {
            host.tags.join(", ")
        };
        let mut row = vec![
            Cell::new(&host.name).fg(Color::Cyan),
            Cell::new(host.description_or_default()),
            Cell::new(tags),
        ];
        if opts.verbose {
            let hostname = host
                .params
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("HostName"))
                .map(|(_, v)| v.as_str())
                .unwrap_or("-");
            row.push(Cell::new(hostname));
            row.push(Cell::new(scope_label(ws, host.owner())));
        }
        table.add_row(row);
    }

    println!("{table}");
    Ok(())
}

/// List tasks, excluding hidden and disabled ones
pub fn cmd_tasks(ws: &Workspace, opts: &ListOptions<'_>) -> Result<()> {
    let tasks: Vec<&Task> = TaskQuery::new(ws)
        .append_selections(opts.select)
        .append_filters(opts.filter)
        .get_tasks_order_by_name()
        .into_iter()
        .filter(|t| !t.hidden && !t.disabled)
        .collect();

    if let Some(format) = opts.format {
        return print_json(&tasks_json(&tasks), format);
    }

    if opts.quiet {
        for task in &tasks {
            println!("{}", task.public_name());
        }
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let mut table = Table::new();
    let mut header = vec!["NAME", "DESCRIPTION", "TARGETS", "TYPE"];
    if opts.verbose {
        header.extend(["DRIVER", "SCOPE"]);
    }
    table.set_header(header);

    for task in tasks {
        let targets = if task.targets.is_empty() {
            "-".to_string()
        } else {
            task.targets.join(", ")
        };
        let mut row = vec![
            Cell::new(task.public_name()).fg(Color::Cyan),
            Cell::new(task.description_or_default()),
            Cell::new(targets),
            Cell::new(task.backend.as_str()).fg(backend_color(task.backend)),
        ];
        if opts.verbose {
            row.push(Cell::new(&task.driver));
            row.push(Cell::new(scope_label(ws, task.owner())));
        }
        table.add_row(row);
    }

    println!("{table}");
    Ok(())
}

/// List distinct host tags
pub fn cmd_tags(ws: &Workspace, opts: &ListOptions<'_>) -> Result<()> {
    let tags = ws.tags();

    if let Some(format) = opts.format {
        return print_json(&json!(tags), format);
    }

    if tags.is_empty() && !opts.quiet {
        println!("No tags found.");
        return Ok(());
    }

    for tag in tags {
        if opts.quiet {
            println!("{tag}");
        } else {
            println!("{}", style(tag).cyan());
        }
    }
    Ok(())
}
