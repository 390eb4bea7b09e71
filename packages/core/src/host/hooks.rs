//! Connection hooks attached to a host
//!
//! A hook slot holds either a shell command or an in-process callback.
//! The value is resolved once at registration time, so running a hook
//! never has to inspect what kind of value it was given.

use std::fmt;
use std::sync::Arc;

/// In-process hook body
pub type HookFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// A single before/after action bound to a host
#[derive(Clone)]
pub enum Hook {
    /// Shell command run through `/bin/sh -c`
    Command(String),
    /// Zero-argument callback supplied by a programmatic caller
    Callback(HookFn),
}

impl Hook {
    /// Create a command hook
    pub fn command(command: impl Into<String>) -> Self {
        Hook::Command(command.into())
    }

    /// Create a callback hook
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Hook::Callback(Arc::new(f))
    }

    /// Command text, if this hook is a command
    pub fn as_command(&self) -> Option<&str> {
        match self {
            Hook::Command(command) => Some(command),
            Hook::Callback(_) => None,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Command(command) => f.debug_tuple("Command").field(command).finish(),
            Hook::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<&str> for Hook {
    fn from(command: &str) -> Self {
        Hook::command(command)
    }
}

impl From<String> for Hook {
    fn from(command: String) -> Self {
        Hook::Command(command)
    }
}

/// The three hook slots of a host
///
/// `after_connect` is shipped to the remote side as script text, so it can
/// only ever be a command.
#[derive(Debug, Clone, Default)]
pub struct Hooks {
    pub before_connect: Option<Hook>,
    pub after_connect: Option<String>,
    pub after_disconnect: Option<Hook>,
}

impl Hooks {
    /// True when no slot is set
    pub fn is_empty(&self) -> bool {
        self.before_connect.is_none()
            && self.after_connect.is_none()
            && self.after_disconnect.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_from_str_is_command() {
        let hook: Hook = "echo hi".into();
        assert_eq!(hook.as_command(), Some("echo hi"));
    }

    #[test]
    fn test_callback_has_no_command_text() {
        let hook = Hook::callback(|| Ok(()));
        assert!(hook.as_command().is_none());
        assert_eq!(format!("{hook:?}"), "Callback(..)");
    }

    #[test]
    fn test_hooks_default_is_empty() {
        let mut hooks = Hooks::default();
        assert!(hooks.is_empty());

        hooks.after_connect = Some("uptime".to_string());
        assert!(!hooks.is_empty());
    }
}
