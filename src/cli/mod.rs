//! Command-line support for the `extsnmpd` binary.

pub mod args;

pub use args::{DaemonArgs, directive_help};
