//! Output utilities for CLI commands
//!
//! Color helpers for task output prefixes and centralized error
//! formatting.

pub mod colors;
pub mod errors;

pub use colors::prefix_style;
pub use errors::show_error;
