//! External commands exposed as MIB variables.
//!
//! `exec` and `sh` directives register commands in a [`Registry`]. Commands
//! without an OID are served as rows of the UCD extensible table
//! (`1.3.6.1.4.1.2021.8.1`); commands with an OID get a subtree of their own
//! with the same six columns. `pass` directives hand a whole subtree to an
//! external program.
//!
//! Every read of a `result` or `message` column runs the command again
//! through the [`CommandRunner`]; nothing is cached.

mod entry;
mod handler;
mod launcher;
mod pass;
mod registry;

pub use entry::{CommandKind, ExtensibleEntry};
pub use handler::{EXT_TABLE_OID, ExecSettings, ExtField, ExtensibleSchemas};
pub use launcher::{
    CommandLine, CommandOutput, CommandRunner, DEFAULT_EXEC_TIMEOUT, MAX_CAPTURE, ProcessLauncher,
    STRMAX,
};
pub use pass::PassEntry;
pub use registry::{DirectiveProblem, ListKind, Registered, Registry};
