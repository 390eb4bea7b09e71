//! essh <ssh args> / --scp / --rsync / --shell - Run the external commands
//! against the generated ssh_config

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use essh_core::command::{rsync_command, scp_command, shell_command, ssh_command};
use essh_core::{CommandSpec, HookExecutor, Workspace};
use tokio::process::Command;

use super::exit_code;
use crate::output::show_error;

/// Run `spec` attached to the terminal and return its exit status
async fn run_attached(spec: &CommandSpec, debug: bool) -> Result<Option<i32>> {
    if debug {
        eprintln!("[essh debug] real command: {}", spec.display());
    }
    tracing::debug!("Spawning {}", spec.display());

    let status = Command::new(&spec.program)
        .args(&spec.args)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .status()
        .await
        .with_context(|| format!("Failed to run {}", spec.program))?;

    Ok(status.code())
}

/// Status to exit with once the after_disconnect hook has run
///
/// A failing session keeps its own status; a clean session whose hook
/// failed exits 1.
fn session_status(code: Option<i32>, hook_failed: bool) -> Option<i32> {
    match code {
        Some(0) if hook_failed => Some(1),
        code => code,
    }
}

/// ssh bracketed by the hooks of the host named last on the command line
pub async fn cmd_ssh(ws: &Workspace, config: &Path, args: &[String], debug: bool) -> Result<ExitCode> {
    let session = HookExecutor::for_invocation(ws, args)
        .run(|after_connect| async move {
            let spec = ssh_command(config, args, after_connect);
            run_attached(&spec, debug).await
        })
        .await?;

    let code = session.output?;
    let hook_failed = match session.after_disconnect {
        Ok(()) => false,
        Err(e) => {
            show_error(&e.into());
            true
        }
    };

    Ok(exit_code(session_status(code, hook_failed)))
}

pub async fn cmd_scp(config: &Path, args: &[String], debug: bool) -> Result<ExitCode> {
    let spec = scp_command(config, args)?;
    Ok(exit_code(run_attached(&spec, debug).await?))
}

pub async fn cmd_rsync(config: &Path, args: &[String], debug: bool) -> Result<ExitCode> {
    let spec = rsync_command(config, args)?;
    Ok(exit_code(run_attached(&spec, debug).await?))
}

pub async fn cmd_shell(config: &Path, args: &[String], debug: bool) -> Result<ExitCode> {
    let spec = shell_command(config, args)?;
    Ok(exit_code(run_attached(&spec, debug).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shell_sees_ssh_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("seen");
        let args = vec![format!(
            "test \"$ESSH_SSH_CONFIG\" = /tmp/essh.cfg && touch {}",
            marker.display()
        )];

        cmd_shell(Path::new("/tmp/essh.cfg"), &args, false).await.unwrap();
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn shell_exit_status_is_mirrored() {
        let args = vec!["exit 3".to_string()];
        let status = run_attached(&shell_command(Path::new("/tmp/cfg"), &args).unwrap(), false)
            .await
            .unwrap();
        assert_eq!(status, Some(3));
    }

    #[test]
    fn session_status_survives_hook_failure() {
        assert_eq!(session_status(Some(255), true), Some(255));
        assert_eq!(session_status(Some(0), true), Some(1));
        assert_eq!(session_status(Some(0), false), Some(0));
        assert_eq!(session_status(None, false), None);
    }

    #[tokio::test]
    async fn ssh_runs_after_disconnect_hook_of_last_host() {
        use essh_core::Host;
        use essh_core::registry::{Registry, RegistryKind};

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("after");
        let mut reg = Registry::new("/tmp/essh-cli-remote", RegistryKind::Local);
        reg.register_host(
            Host::new("essh-no-such-host.invalid")
                .with_after_disconnect(format!("touch {}", marker.display())),
        );
        let ws = Workspace::new().with_registry(reg);

        // -V prints the version and exits without connecting
        let args = vec!["-V".to_string(), "essh-no-such-host.invalid".to_string()];
        let cfg = dir.path().join("cfg");
        std::fs::write(&cfg, "").unwrap();
        let _ = cmd_ssh(&ws, &cfg, &args, false).await;
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn scp_without_destination_is_error() {
        let args = vec!["only-source".to_string()];
        assert!(cmd_scp(Path::new("/tmp/cfg"), &args, false).await.is_err());
    }
}
