//! essh <task> [payload] - Run a task on its target hosts
//!
//! Every script is rendered before anything is spawned, so a template or
//! file error aborts the run without side effects.

use std::path::Path;
use std::process::{ExitCode, Stdio};

use anyhow::{Result, bail};
use essh_core::command::{local_task_command, remote_task_command, wrap_privileged};
use essh_core::driver::render_prefix;
use essh_core::{CommandSpec, Host, HostQuery, RenderContext, Task, Workspace};
use futures_util::future::join_all;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use super::exit_code;
use crate::output::prefix_style;

/// One rendered execution of a task
struct Run {
    label: String,
    prefix: String,
    color: usize,
    spec: CommandSpec,
}

/// Hosts a task runs against
///
/// A task without targets selects no host at all.
fn target_hosts<'w>(ws: &'w Workspace, task: &Task) -> Vec<&'w Host> {
    if task.targets.is_empty() {
        return Vec::new();
    }
    HostQuery::new(ws)
        .append_selections(&task.targets)
        .append_filters(&task.filters)
        .get_hosts_order_by_name()
}

fn plan(
    ws: &Workspace,
    task: &Task,
    config: &Path,
    payload: Option<&str>,
    debug: bool,
) -> Result<Vec<Run>> {
    let hosts = target_hosts(ws, task);
    if task.is_remote() && hosts.is_empty() {
        bail!(
            "Task '{}' selects no hosts (targets: {:?}, filters: {:?})",
            task.public_name(),
            task.targets,
            task.filters
        );
    }

    let driver = ws.driver_for(task)?;
    // Local tasks without hosts still run once
    let slots: Vec<Option<&Host>> = if hosts.is_empty() {
        vec![None]
    } else {
        hosts.into_iter().map(Some).collect()
    };

    slots
        .into_iter()
        .enumerate()
        .map(|(color, host)| -> Result<Run> {
            let ctx = RenderContext {
                host,
                ssh_config: Some(config),
                payload,
                debug,
            };
            let mut script = driver.generate_runnable_content(task, &ctx)?;
            if task.privileged {
                script = wrap_privileged(&script);
            }
            if debug {
                eprintln!("[essh debug] rendered script:\n{script}");
            }

            let spec = match host {
                Some(host) if task.is_remote() => {
                    remote_task_command(config, host, &script, task.tty)
                }
                _ => local_task_command(&script),
            };

            Ok(Run {
                label: host.map_or_else(|| "local".to_string(), |h| h.name.clone()),
                prefix: render_prefix(task, host)?,
                color,
                spec,
            })
        })
        .collect()
}

async fn forward_lines<R>(reader: R, prefix: &str, color: usize, to_stderr: bool) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let prefix = prefix_style(prefix, color);
        if to_stderr {
            eprintln!("{prefix}{line}");
        } else {
            println!("{prefix}{line}");
        }
    }
    Ok(())
}

/// Spawn one run, forwarding its output line by line with the prefix
async fn execute(run: &Run) -> Result<Option<i32>> {
    tracing::debug!("Running task on {}: {}", run.label, run.spec.program);

    let mut child = Command::new(&run.spec.program)
        .args(&run.spec.args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (out, err) = tokio::join!(
        async {
            match stdout {
                Some(s) => forward_lines(s, &run.prefix, run.color, false).await,
                None => Ok(()),
            }
        },
        async {
            match stderr {
                Some(s) => forward_lines(s, &run.prefix, run.color, true).await,
                None => Ok(()),
            }
        },
    );
    out?;
    err?;

    let status = child.wait().await?;
    Ok(status.code())
}

/// Execute planned runs and return the first non-zero status
///
/// Sequential runs stop at the first failure.
async fn run_all(runs: &[Run], parallel: bool) -> Result<Option<i32>> {
    let codes: Vec<Option<i32>> = if parallel {
        join_all(runs.iter().map(execute))
            .await
            .into_iter()
            .collect::<Result<_>>()?
    } else {
        let mut codes = Vec::with_capacity(runs.len());
        for run in runs {
            let code = execute(run).await?;
            codes.push(code);
            if code != Some(0) {
                tracing::debug!("Stopping after failure on {}", run.label);
                break;
            }
        }
        codes
    };

    Ok(codes
        .into_iter()
        .find(|code| *code != Some(0))
        .unwrap_or(Some(0)))
}

/// Run `task`, in parallel across hosts when it asks for it
pub async fn cmd_task(
    ws: &Workspace,
    task: &Task,
    config: &Path,
    payload: Option<&str>,
    debug: bool,
) -> Result<ExitCode> {
    let runs = plan(ws, task, config, payload, debug)?;
    tracing::debug!(
        "Task {} planned on {} target(s), parallel: {}",
        task.public_name(),
        runs.len(),
        task.parallel
    );

    Ok(exit_code(run_all(&runs, task.parallel).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use essh_core::registry::{Registry, RegistryKind};
    use essh_core::task::Backend;

    fn workspace(tasks: Vec<Task>) -> Workspace {
        let mut reg = Registry::new("/tmp/essh-cli-task", RegistryKind::Local);
        reg.register_host(Host::new("web01").with_tag("web"));
        reg.register_host(Host::new("web02").with_tag("web"));
        reg.register_host(Host::new("db01").with_tag("db"));
        for task in tasks {
            reg.register_task(task);
        }
        Workspace::new().with_registry(reg)
    }

    #[test]
    fn local_task_without_targets_runs_once() {
        let ws = workspace(vec![Task::new("hello").with_script("echo hi")]);
        let task = ws.task("hello", None).unwrap();
        let runs = plan(&ws, task, Path::new("/tmp/cfg"), None, false).unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].label, "local");
        assert_eq!(runs[0].spec.program, "/bin/sh");
    }

    #[test]
    fn remote_task_runs_per_host() {
        let ws = workspace(vec![Task::new("up").with_script("uptime").on(&["web"])]);
        let task = ws.task("up", None).unwrap();
        let runs = plan(&ws, task, Path::new("/tmp/cfg"), None, false).unwrap();

        let labels: Vec<&str> = runs.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["web01", "web02"]);
        assert!(runs.iter().all(|r| r.spec.program == "ssh"));
    }

    #[test]
    fn remote_task_without_hosts_is_error() {
        let ws = workspace(vec![Task::new("up").with_script("uptime").on(&["nope"])]);
        let task = ws.task("up", None).unwrap();
        assert!(plan(&ws, task, Path::new("/tmp/cfg"), None, false).is_err());
    }

    #[test]
    fn filters_narrow_targets() {
        let mut task = Task::new("up").with_script("uptime").on(&["web", "db"]);
        task.filters = vec!["db".to_string()];
        let ws = workspace(vec![task]);

        let hosts = target_hosts(&ws, ws.task("up", None).unwrap());
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].name, "db01");
    }

    #[test]
    fn unknown_driver_fails_before_running() {
        let ws = workspace(vec![Task::new("t").with_script("echo x").with_driver("nope")]);
        let task = ws.task("t", None).unwrap();
        assert!(plan(&ws, task, Path::new("/tmp/cfg"), None, false).is_err());
    }

    #[tokio::test]
    async fn sequential_local_task_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!(
            "test \"$ESSH_HOSTNAME\" != db01 || exit 4\ntouch {}/$ESSH_HOSTNAME",
            dir.path().display()
        );
        let mut task = Task::new("t").with_driver("bash").with_script(script);
        task.backend = Backend::Local;
        task.targets = vec!["web".to_string(), "db".to_string()];
        let ws = workspace(vec![task]);

        let runs = plan(&ws, ws.task("t", None).unwrap(), Path::new("/tmp/cfg"), None, false)
            .unwrap();
        assert_eq!(runs.len(), 3);

        let code = run_all(&runs, false).await.unwrap();
        assert_eq!(code, Some(4));
        // db01 sorts first, so nothing else ran
        assert!(!dir.path().join("web01").exists());
    }

    #[tokio::test]
    async fn parallel_local_task_runs_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = Task::new("t").with_script(format!(
            "touch {}/$ESSH_HOSTNAME",
            dir.path().display()
        ));
        task.targets = vec!["web".to_string()];
        task.parallel = true;
        let ws = workspace(vec![task]);

        let runs = plan(&ws, ws.task("t", None).unwrap(), Path::new("/tmp/cfg"), None, false)
            .unwrap();
        assert_eq!(run_all(&runs, true).await.unwrap(), Some(0));

        assert!(dir.path().join("web01").exists());
        assert!(dir.path().join("web02").exists());
    }
}
