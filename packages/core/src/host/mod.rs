//! Host management module
//!
//! Provides the host data model:
//! - Host records with ssh parameters, tags and props
//! - Connection hooks (command or callback)
//! - ssh_config rendering for a resolved host set

mod hooks;
mod schema;
mod ssh_config;

// Public exports
pub use hooks::{Hook, HookFn, Hooks};
pub use schema::Host;
pub use ssh_config::{collect_tags, is_ssh_keyword, render_ssh_config, write_ssh_config};
