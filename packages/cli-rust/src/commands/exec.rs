//! essh --exec <command> [payload] - Run an ad-hoc command as a task

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Result, bail};
use essh_core::{Backend, DEFAULT_PREFIX_LOCAL, DEFAULT_PREFIX_REMOTE, Task, Workspace};

use super::cmd_task;

/// Name of the task built from `--exec`
pub const EXEC_TASK_NAME: &str = "exec";

/// Task flags given on the command line with `--exec`
#[derive(Debug, Default, Clone)]
pub struct ExecOptions {
    /// Run remotely on these hosts or tags
    pub on: Vec<String>,
    /// Run locally once per matching host
    pub foreach: Vec<String>,
    pub privileged: bool,
    pub parallel: bool,
    pub pty: bool,
    /// Use the default prefix for the backend
    pub prefix: bool,
    /// Custom prefix template, wins over `prefix`
    pub prefix_string: Option<String>,
    /// Treat the command as a script file path
    pub file: bool,
}

/// Build the task `--exec` runs
///
/// Script files are resolved against `cwd`.
pub fn exec_task(command: &str, opts: &ExecOptions, cwd: &Path) -> Result<Task> {
    if !opts.on.is_empty() && !opts.foreach.is_empty() {
        bail!("--on and --foreach cannot be used together");
    }

    let mut task = if opts.file {
        Task::new(EXEC_TASK_NAME).with_file(cwd.join(command))
    } else {
        Task::new(EXEC_TASK_NAME).with_script(command)
    };

    if opts.on.is_empty() {
        task.backend = Backend::Local;
        task.targets = opts.foreach.clone();
    } else {
        task.backend = Backend::Remote;
        task.targets = opts.on.clone();
    }

    task.privileged = opts.privileged;
    task.parallel = opts.parallel;
    task.tty = opts.pty;
    task.prefix = match (&opts.prefix_string, opts.prefix) {
        (Some(template), _) => Some(template.clone()),
        (None, true) => Some(
            match task.backend {
                Backend::Remote => DEFAULT_PREFIX_REMOTE,
                Backend::Local => DEFAULT_PREFIX_LOCAL,
            }
            .to_string(),
        ),
        (None, false) => None,
    };

    Ok(task)
}

/// Run `args[0]` as an ad-hoc task, `args[1]` being its payload
pub async fn cmd_exec(
    ws: &Workspace,
    config: &Path,
    args: &[String],
    opts: &ExecOptions,
    cwd: &Path,
    debug: bool,
) -> Result<ExitCode> {
    let Some(command) = args.first() else {
        bail!("--exec requires a command");
    };
    if args.len() > 2 {
        bail!("--exec takes a command and at most one payload argument");
    }

    let task = exec_task(command, opts, cwd)?;
    tracing::debug!("Ad-hoc task on {:?}: {}", task.targets, command);

    let payload = args.get(1).map(String::as_str);
    cmd_task(ws, &task, config, payload, debug).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use essh_core::TaskBody;

    #[test]
    fn plain_exec_runs_locally_once() {
        let task = exec_task("uptime", &ExecOptions::default(), Path::new("/work")).unwrap();
        assert_eq!(task.backend, Backend::Local);
        assert!(task.targets.is_empty());
        assert!(task.prefix.is_none());
        assert_eq!(task.resolve_scripts().unwrap()[0].code, "uptime");
    }

    #[test]
    fn on_makes_remote_task_with_default_prefix() {
        let opts = ExecOptions {
            on: vec!["web".to_string()],
            prefix: true,
            parallel: true,
            pty: true,
            ..Default::default()
        };
        let task = exec_task("uptime", &opts, Path::new("/work")).unwrap();
        assert!(task.is_remote());
        assert_eq!(task.targets, vec!["web"]);
        assert_eq!(task.prefix.as_deref(), Some(DEFAULT_PREFIX_REMOTE));
        assert!(task.parallel && task.tty);
    }

    #[test]
    fn foreach_makes_local_task_per_host() {
        let opts = ExecOptions {
            foreach: vec!["db".to_string()],
            prefix: true,
            prefix_string: Some("[{{ host.name }}] ".to_string()),
            ..Default::default()
        };
        let task = exec_task("hostname", &opts, Path::new("/work")).unwrap();
        assert_eq!(task.backend, Backend::Local);
        assert_eq!(task.targets, vec!["db"]);
        assert_eq!(task.prefix.as_deref(), Some("[{{ host.name }}] "));
    }

    #[test]
    fn on_and_foreach_conflict() {
        let opts = ExecOptions {
            on: vec!["web".to_string()],
            foreach: vec!["web".to_string()],
            ..Default::default()
        };
        assert!(exec_task("true", &opts, Path::new("/work")).is_err());
    }

    #[test]
    fn file_is_resolved_against_cwd() {
        let opts = ExecOptions {
            file: true,
            ..Default::default()
        };
        let task = exec_task("scripts/run.sh", &opts, Path::new("/work")).unwrap();
        assert!(matches!(task.body, TaskBody::File(ref p) if p == Path::new("/work/scripts/run.sh")));
    }

    #[tokio::test]
    async fn foreach_runs_once_per_selected_host() {
        use essh_core::Host;
        use essh_core::registry::{Registry, RegistryKind};

        let dir = tempfile::tempdir().unwrap();
        let mut reg = Registry::new("/tmp/essh-cli-exec", RegistryKind::Local);
        reg.register_host(Host::new("db01").with_tag("db"));
        reg.register_host(Host::new("db02").with_tag("db"));
        let ws = Workspace::new().with_registry(reg);

        let opts = ExecOptions {
            foreach: vec!["db".to_string()],
            ..Default::default()
        };
        let args = vec![format!("touch {}/$ESSH_HOSTNAME", dir.path().display())];
        cmd_exec(&ws, Path::new("/tmp/cfg"), &args, &opts, dir.path(), false)
            .await
            .unwrap();

        assert!(dir.path().join("db01").exists());
        assert!(dir.path().join("db02").exists());
    }

    #[tokio::test]
    async fn exec_without_command_is_error() {
        let ws = Workspace::new();
        let result = cmd_exec(
            &ws,
            Path::new("/tmp/cfg"),
            &[],
            &ExecOptions::default(),
            Path::new("/"),
            false,
        )
        .await;
        assert!(result.is_err());
    }
}
