//! Error display for the CLI
//!
//! Prints a styled error block with a tip matched to the error kind.

use console::style;
use essh_core::{CommandError, ConfigError, HookError, HookPhase, RenderError};

/// Print `err` and its causes to stderr
pub fn show_error(err: &anyhow::Error) {
    eprintln!("{} {}", style("Error:").red().bold(), err);

    let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
    if !causes.is_empty() {
        eprintln!();
        for cause in causes {
            eprintln!("  {}", cause);
        }
    }

    if let Some(tip) = tip_for(err) {
        eprintln!();
        eprintln!("  {} {}", style("Tip:").cyan(), tip);
    }
}

fn tip_for(err: &anyhow::Error) -> Option<&'static str> {
    if err.chain().any(|c| c.downcast_ref::<ConfigError>().is_some()) {
        return Some("Check the config file for unknown keys or values of the wrong type.");
    }
    if let Some(hook) = err.downcast_ref::<HookError>() {
        return Some(match hook.phase() {
            HookPhase::BeforeConnect => "The before_connect hook failed, ssh was not started.",
            HookPhase::AfterDisconnect => "The session finished but its after_disconnect hook failed.",
        });
    }
    if err.downcast_ref::<RenderError>().is_some() {
        return Some("Run with --debug to see the rendered script context.");
    }
    if err.downcast_ref::<CommandError>().is_some() {
        return Some("Run essh --help for usage.");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn config_error_tip_found_through_context() {
        let err: anyhow::Result<()> =
            Err(ConfigError::MissingBody("t".to_string())).context("Invalid configuration");
        assert!(tip_for(&err.unwrap_err()).unwrap().contains("config file"));
    }

    #[test]
    fn hook_error_tip_depends_on_phase() {
        let err = anyhow::Error::new(HookError::AfterDisconnect {
            host: "web01".to_string(),
            message: "exit 1".to_string(),
        });
        assert!(tip_for(&err).unwrap().contains("after_disconnect"));
    }

    #[test]
    fn plain_error_has_no_tip() {
        assert!(tip_for(&anyhow::anyhow!("boom")).is_none());
    }
}
