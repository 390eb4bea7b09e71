//! Hook lifecycle around an external session
//!
//! `before_connect` runs before the external command and aborts it on
//! failure. `after_connect` is not run locally: it is handed to the session
//! to run on the remote side. `after_disconnect` runs once the command has
//! returned, whatever its exit status.

use std::fmt;
use std::future::Future;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::host::{Hook, Host};
use crate::workspace::Workspace;

/// Lifecycle point a local hook runs at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    BeforeConnect,
    AfterDisconnect,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::BeforeConnect => f.write_str("before_connect"),
            HookPhase::AfterDisconnect => f.write_str("after_disconnect"),
        }
    }
}

/// A hook that failed
#[derive(Error, Debug)]
pub enum HookError {
    #[error("before_connect hook of '{host}' failed: {message}")]
    BeforeConnect { host: String, message: String },

    #[error("after_disconnect hook of '{host}' failed: {message}")]
    AfterDisconnect { host: String, message: String },
}

impl HookError {
    fn new(phase: HookPhase, host: &str, message: String) -> Self {
        let host = host.to_string();
        match phase {
            HookPhase::BeforeConnect => HookError::BeforeConnect { host, message },
            HookPhase::AfterDisconnect => HookError::AfterDisconnect { host, message },
        }
    }

    pub fn phase(&self) -> HookPhase {
        match self {
            HookError::BeforeConnect { .. } => HookPhase::BeforeConnect,
            HookError::AfterDisconnect { .. } => HookPhase::AfterDisconnect,
        }
    }
}

/// A session that ran, with the outcome of its after_disconnect hook
#[derive(Debug)]
pub struct Session<T> {
    pub output: T,
    pub after_disconnect: Result<(), HookError>,
}

impl<T> Session<T> {
    /// The session output, or the after_disconnect failure
    pub fn into_result(self) -> Result<T, HookError> {
        self.after_disconnect.map(|()| self.output)
    }
}

/// Run one hook to completion
///
/// Commands run through `/bin/sh -c` attached to the current terminal.
pub fn run_hook(hook: &Hook) -> Result<(), String> {
    match hook {
        Hook::Command(command) => {
            let status = Command::new("/bin/sh")
                .arg("-c")
                .arg(command)
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(|e| format!("failed to spawn /bin/sh: {e}"))?;

            if status.success() {
                Ok(())
            } else {
                Err(match status.code() {
                    Some(code) => format!("command exited with status {code}"),
                    None => "command terminated by signal".to_string(),
                })
            }
        }
        Hook::Callback(callback) => callback().map_err(|e| format!("{e:#}")),
    }
}

/// Hooks of the host targeted by one invocation
#[derive(Debug, Clone, Copy)]
pub struct HookExecutor<'a> {
    host: Option<&'a Host>,
}

impl<'a> HookExecutor<'a> {
    pub fn new(host: Option<&'a Host>) -> Self {
        Self { host }
    }

    /// Executor for the host named by the last positional argument
    ///
    /// When the target host is not the last argument no hook fires.
    pub fn for_invocation<S: AsRef<str>>(workspace: &'a Workspace, args: &[S]) -> Self {
        let host = args.last().and_then(|arg| workspace.host(arg.as_ref()));
        if let Some(host) = host {
            tracing::debug!("Hooks resolved from host {}", host.name);
        }
        Self { host }
    }

    pub fn host(&self) -> Option<&'a Host> {
        self.host
    }

    /// Script to run remotely before the interactive shell starts
    pub fn after_connect_script(&self) -> Option<&'a str> {
        self.host.and_then(|h| h.hooks.after_connect.as_deref())
    }

    pub fn before_connect(&self) -> Result<(), HookError> {
        self.fire(HookPhase::BeforeConnect)
    }

    pub fn after_disconnect(&self) -> Result<(), HookError> {
        self.fire(HookPhase::AfterDisconnect)
    }

    /// Bracket `session` with the host's hooks
    ///
    /// `session` receives the after_connect script and is skipped when the
    /// before_connect hook fails. The after_disconnect hook runs whatever
    /// `session` returned, and its failure is reported alongside the output.
    pub async fn run<T, F, Fut>(&self, session: F) -> Result<Session<T>, HookError>
    where
        F: FnOnce(Option<&'a str>) -> Fut,
        Fut: Future<Output = T>,
    {
        self.before_connect()?;
        let output = session(self.after_connect_script()).await;
        Ok(Session {
            output,
            after_disconnect: self.after_disconnect(),
        })
    }

    fn fire(&self, phase: HookPhase) -> Result<(), HookError> {
        let Some(host) = self.host else {
            return Ok(());
        };
        let hook = match phase {
            HookPhase::BeforeConnect => host.hooks.before_connect.as_ref(),
            HookPhase::AfterDisconnect => host.hooks.after_disconnect.as_ref(),
        };
        let Some(hook) = hook else {
            return Ok(());
        };

        tracing::debug!("Running {} hook of {}", phase, host.name);
        run_hook(hook).map_err(|message| HookError::new(phase, &host.name, message))
    }
}
