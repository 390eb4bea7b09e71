//! Argument construction for the external ssh, scp, rsync and shell
//! commands
//!
//! Nothing here spawns a process; callers hand a [`CommandSpec`] to their
//! process runner of choice.

use std::path::Path;

use thiserror::Error;

use crate::host::Host;

/// Heredoc delimiter wrapping a remote task script
pub const SCRIPT_DELIMITER: &str = "EOF-ESSH-SCRIPT";

/// Heredoc delimiter wrapping a privileged script
pub const PRIVILEGED_DELIMITER: &str = "EOF-ESSH-PRIVILEGED";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("{command} requires at least {min} argument(s)")]
    TooFewArguments { command: &'static str, min: usize },
}

/// Program, arguments and extra environment of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Builder pattern: append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Builder pattern: append arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Builder pattern: set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program and arguments joined for debug output
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn config_arg(config: &Path) -> String {
    config.display().to_string()
}

/// `ssh -F <config> <args...>`
///
/// With an after_connect script the session gets a tty and runs the script
/// remotely before exec'ing the user's shell.
pub fn ssh_command(config: &Path, args: &[String], after_connect: Option<&str>) -> CommandSpec {
    match after_connect {
        Some(script) => CommandSpec::new("ssh")
            .arg("-t")
            .arg("-F")
            .arg(config_arg(config))
            .args(args.iter().cloned())
            .arg(format!("{script}\nexec $SHELL\n")),
        None => CommandSpec::new("ssh")
            .arg("-F")
            .arg(config_arg(config))
            .args(args.iter().cloned()),
    }
}

/// `scp -F <config> <args...>`
pub fn scp_command(config: &Path, args: &[String]) -> Result<CommandSpec, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::TooFewArguments {
            command: "scp",
            min: 2,
        });
    }
    Ok(CommandSpec::new("scp")
        .arg("-F")
        .arg(config_arg(config))
        .args(args.iter().cloned()))
}

/// `rsync -e "ssh -F <config>" <args...>`
pub fn rsync_command(config: &Path, args: &[String]) -> Result<CommandSpec, CommandError> {
    if args.is_empty() {
        return Err(CommandError::TooFewArguments {
            command: "rsync",
            min: 1,
        });
    }
    Ok(CommandSpec::new("rsync")
        .arg("-e")
        .arg(format!("ssh -F {}", config_arg(config)))
        .args(args.iter().cloned()))
}

/// `/bin/sh -c "<args...>"` with `ESSH_SSH_CONFIG` exported
pub fn shell_command(config: &Path, args: &[String]) -> Result<CommandSpec, CommandError> {
    if args.is_empty() {
        return Err(CommandError::TooFewArguments {
            command: "shell",
            min: 1,
        });
    }
    Ok(CommandSpec::new("/bin/sh")
        .arg("-c")
        .arg(args.join(" "))
        .env("ESSH_SSH_CONFIG", config_arg(config)))
}

/// Run a rendered script on `host` over ssh
///
/// The script travels as a quoted heredoc in the remote command line, so the
/// local stdin stays free for the remote process.
pub fn remote_task_command(config: &Path, host: &Host, script: &str, tty: bool) -> CommandSpec {
    let spec = if tty {
        CommandSpec::new("ssh").arg("-t").arg("-t")
    } else {
        CommandSpec::new("ssh")
    };

    spec.arg("-F")
        .arg(config_arg(config))
        .arg(&host.name)
        .arg("bash")
        .arg("-se")
        .arg(heredoc(SCRIPT_DELIMITER, script))
}

/// Run a rendered script on this machine
pub fn local_task_command(script: &str) -> CommandSpec {
    CommandSpec::new("/bin/sh").arg("-c").arg(script)
}

/// Wrap a script so it runs as root through `sudo su -`
pub fn wrap_privileged(script: &str) -> String {
    format!("sudo su - {}", heredoc(PRIVILEGED_DELIMITER, script))
}

fn heredoc(delimiter: &str, body: &str) -> String {
    format!("<<\\{delimiter}\n{}\n{delimiter}", body.trim_end_matches('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_ssh_command() {
        let spec = ssh_command(Path::new("/tmp/cfg"), &args(&["web01"]), None);
        assert_eq!(spec.program, "ssh");
        assert_eq!(spec.args, args(&["-F", "/tmp/cfg", "web01"]));
    }

    #[test]
    fn test_ssh_command_with_after_connect() {
        let spec = ssh_command(Path::new("/tmp/cfg"), &args(&["web01"]), Some("cd /app"));
        assert_eq!(
            spec.args,
            args(&["-t", "-F", "/tmp/cfg", "web01", "cd /app\nexec $SHELL\n"])
        );
    }

    #[test]
    fn test_scp_requires_two_args() {
        let err = scp_command(Path::new("/tmp/cfg"), &args(&["a"])).unwrap_err();
        assert_eq!(
            err,
            CommandError::TooFewArguments {
                command: "scp",
                min: 2
            }
        );

        let spec = scp_command(Path::new("/tmp/cfg"), &args(&["a", "web01:/tmp/a"])).unwrap();
        assert_eq!(spec.args, args(&["-F", "/tmp/cfg", "a", "web01:/tmp/a"]));
    }

    #[test]
    fn test_rsync_command() {
        assert!(rsync_command(Path::new("/tmp/cfg"), &[]).is_err());

        let spec = rsync_command(Path::new("/tmp/cfg"), &args(&["-av", "src/", "web01:dst/"]))
            .unwrap();
        assert_eq!(
            spec.args,
            args(&["-e", "ssh -F /tmp/cfg", "-av", "src/", "web01:dst/"])
        );
    }

    #[test]
    fn test_shell_command_exports_config() {
        let spec = shell_command(Path::new("/tmp/cfg"), &args(&["echo", "hi"])).unwrap();
        assert_eq!(spec.args, args(&["-c", "echo hi"]));
        assert_eq!(
            spec.env,
            vec![("ESSH_SSH_CONFIG".to_string(), "/tmp/cfg".to_string())]
        );
    }

    #[test]
    fn test_remote_task_command() {
        let host = Host::new("web01");
        let spec = remote_task_command(Path::new("/tmp/cfg"), &host, "echo hi\n", false);
        assert_eq!(
            spec.args,
            args(&[
                "-F",
                "/tmp/cfg",
                "web01",
                "bash",
                "-se",
                "<<\\EOF-ESSH-SCRIPT\necho hi\nEOF-ESSH-SCRIPT"
            ])
        );

        let spec = remote_task_command(Path::new("/tmp/cfg"), &host, "echo hi", true);
        assert_eq!(&spec.args[..3], &args(&["-t", "-t", "-F"])[..]);
    }

    #[test]
    fn test_wrap_privileged() {
        assert_eq!(
            wrap_privileged("whoami\n"),
            "sudo su - <<\\EOF-ESSH-PRIVILEGED\nwhoami\nEOF-ESSH-PRIVILEGED"
        );
    }

    #[test]
    fn test_local_task_runs_script() {
        let spec = local_task_command("echo hi");
        let output = std::process::Command::new(&spec.program)
            .args(&spec.args)
            .output()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hi\n");
    }
}
