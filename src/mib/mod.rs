//! MIB object tree.
//!
//! The tree is a sorted table of [`Subtree`]s. Each subtree owns a region of
//! the OID namespace and a list of [`Variable`]s whose handlers produce
//! values. Dispatch walks the table in order, so GETNEXT is a linear scan
//! that stops at the first variable able to answer.
//!
//! ```text
//! request OID ──► SubtreeTable::resolve ──► Subtree ──► Variable ──► VariableHandler::access
//!                                                                     │
//!                                               match_instance / match_scalar
//! ```

mod dispatch;
pub mod matcher;
mod subtree;
pub mod system;
mod variable;

pub use dispatch::Resolution;
pub use matcher::{InstanceBound, MAX_MSG_LINES, MatchMode, match_instance, match_scalar};
pub use subtree::{Subtree, SubtreeKind, SubtreeTable};
pub use system::{SystemField, SystemGroup, SystemSettings};
pub use variable::{
    Access, BoxFuture, Found, Lookup, Magic, SetAction, ValueType, Variable, VariableHandler,
    WriteHandler, WriteResult,
};
