//! Variables and the handler traits behind them.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ErrorStatus;
use crate::extensible::ExtField;
use crate::oid::Oid;
use crate::value::Value;

use super::matcher::MatchMode;
use super::system::SystemField;

/// Type alias for a boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Access mode of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

impl Access {
    pub fn is_writable(self) -> bool {
        self == Access::ReadWrite
    }
}

/// Wire type a variable produces and, when writable, accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Integer,
    OctetString,
    ObjectIdentifier,
    TimeTicks,
    /// Decided per instance (pass-through).
    Any,
}

impl ValueType {
    /// Does `value` carry this type on the wire?
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ValueType::Integer => matches!(value, Value::Integer(_)),
            ValueType::OctetString => matches!(value, Value::OctetString(_)),
            ValueType::ObjectIdentifier => matches!(value, Value::ObjectIdentifier(_)),
            ValueType::TimeTicks => matches!(value, Value::TimeTicks(_)),
            ValueType::Any => !value.is_exception(),
        }
    }
}

/// Which field a variable serves.
///
/// Handlers match on this exhaustively; adding a field is a compile error
/// everywhere it is not yet handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Magic {
    System(SystemField),
    Extensible(ExtField),
    PassThrough,
}

/// One variable within a subtree.
#[derive(Clone)]
pub struct Variable {
    magic: Magic,
    value_type: ValueType,
    access: Access,
    suffix: Oid,
    handler: Arc<dyn VariableHandler>,
}

impl Variable {
    pub fn new(
        magic: Magic,
        value_type: ValueType,
        access: Access,
        suffix: Oid,
        handler: Arc<dyn VariableHandler>,
    ) -> Self {
        Self {
            magic,
            value_type,
            access,
            suffix,
            handler,
        }
    }

    pub fn magic(&self) -> Magic {
        self.magic
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// OID suffix relative to the owning subtree's base.
    pub fn suffix(&self) -> &Oid {
        &self.suffix
    }

    pub fn handler(&self) -> &Arc<dyn VariableHandler> {
        &self.handler
    }
}

/// Two variables are equal when they describe the same field and share the
/// same handler instance.
impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.magic == other.magic
            && self.value_type == other.value_type
            && self.access == other.access
            && self.suffix == other.suffix
            && std::ptr::addr_eq(Arc::as_ptr(&self.handler), Arc::as_ptr(&other.handler))
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("magic", &self.magic)
            .field("value_type", &self.value_type)
            .field("access", &self.access)
            .field("suffix", &self.suffix)
            .finish_non_exhaustive()
    }
}

/// A single access to a variable, as handed to its handler.
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a> {
    /// Full name of the variable: subtree base followed by the suffix.
    pub name: &'a Oid,
    pub variable: &'a Variable,
    pub request: &'a Oid,
    pub mode: MatchMode,
}

/// A resolved variable instance.
#[derive(Clone)]
pub struct Found {
    pub oid: Oid,
    pub value: Value,
    /// Present when this instance accepts SET.
    pub writer: Option<Arc<dyn WriteHandler>>,
}

impl Found {
    pub fn read_only(oid: Oid, value: impl Into<Value>) -> Self {
        Self {
            oid,
            value: value.into(),
            writer: None,
        }
    }

    pub fn writable(oid: Oid, value: impl Into<Value>, writer: Arc<dyn WriteHandler>) -> Self {
        Self {
            oid,
            value: value.into(),
            writer: Some(writer),
        }
    }
}

impl fmt::Debug for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Found")
            .field("oid", &self.oid)
            .field("value", &self.value)
            .field("writable", &self.writer.is_some())
            .finish()
    }
}

/// Produces values for a variable.
///
/// Implementations run the matcher for their own instance scheme and return
/// `None` when the request does not land on an instance they serve. Under
/// [`MatchMode::Next`] the returned OID must sort strictly after the request.
///
/// # Example
///
/// ```
/// use extsnmpd::mib::{BoxFuture, Found, Lookup, VariableHandler, match_scalar};
///
/// struct Answer;
///
/// impl VariableHandler for Answer {
///     fn access<'a>(&'a self, lookup: Lookup<'a>) -> BoxFuture<'a, Option<Found>> {
///         Box::pin(async move {
///             let oid = match_scalar(lookup.name, lookup.request, lookup.mode)?;
///             Some(Found::read_only(oid, 42))
///         })
///     }
/// }
/// ```
pub trait VariableHandler: Send + Sync {
    fn access<'a>(&'a self, lookup: Lookup<'a>) -> BoxFuture<'a, Option<Found>>;
}

/// SET phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetAction {
    /// Check type and range. No side effects.
    Validate,
    /// Perform the write.
    Commit,
    /// Revert a committed write after a later varbind failed.
    Undo,
}

/// Outcome of one SET phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Ok,
    WrongType,
    Failed(ErrorStatus),
}

impl WriteResult {
    pub fn is_ok(self) -> bool {
        self == WriteResult::Ok
    }

    /// PDU error status for this result.
    pub fn status(self) -> ErrorStatus {
        match self {
            WriteResult::Ok => ErrorStatus::NoError,
            WriteResult::WrongType => ErrorStatus::WrongType,
            WriteResult::Failed(status) => status,
        }
    }
}

/// Applies SET phases to one variable instance.
///
/// A writer is created per resolved instance, so it may keep whatever state
/// `Undo` needs from `Commit`.
pub trait WriteHandler: Send + Sync {
    fn apply<'a>(
        &'a self,
        action: SetAction,
        value: &'a Value,
        target: &'a Oid,
    ) -> BoxFuture<'a, WriteResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    struct Nothing;

    impl VariableHandler for Nothing {
        fn access<'a>(&'a self, _lookup: Lookup<'a>) -> BoxFuture<'a, Option<Found>> {
            Box::pin(async { None })
        }
    }

    #[test]
    fn value_type_acceptance() {
        assert!(ValueType::Integer.accepts(&Value::Integer(1)));
        assert!(!ValueType::Integer.accepts(&Value::from("1")));
        assert!(ValueType::OctetString.accepts(&Value::from("x")));
        assert!(ValueType::Any.accepts(&Value::Gauge32(3)));
        assert!(!ValueType::Any.accepts(&Value::NoSuchObject));
    }

    #[test]
    fn variable_equality_tracks_handler_identity() {
        let shared: Arc<dyn VariableHandler> = Arc::new(Nothing);
        let make = |handler: &Arc<dyn VariableHandler>| {
            Variable::new(
                Magic::PassThrough,
                ValueType::Any,
                Access::ReadOnly,
                oid!(1),
                handler.clone(),
            )
        };

        assert_eq!(make(&shared), make(&shared));
        let other: Arc<dyn VariableHandler> = Arc::new(Nothing);
        assert_ne!(make(&shared), make(&other));
    }

    #[test]
    fn write_result_status() {
        assert_eq!(WriteResult::Ok.status(), ErrorStatus::NoError);
        assert_eq!(WriteResult::WrongType.status(), ErrorStatus::WrongType);
        assert_eq!(
            WriteResult::Failed(ErrorStatus::CommitFailed).status(),
            ErrorStatus::CommitFailed
        );
    }
}
