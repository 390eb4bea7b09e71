//! essh - Extended ssh command
//!
//! This is the main entry point for the Rust CLI binary.

use std::process::ExitCode;

fn main() -> ExitCode {
    essh::main_entry()
}
