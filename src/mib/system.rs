//! The MIB-II `system` group (1.3.6.1.2.1.1).
//!
//! Six scalars. `sysContact`, `sysName` and `sysLocation` accept SET; written
//! values live as long as the group, so the next reconfiguration reverts them
//! to whatever the configuration says.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use bytes::Bytes;

use crate::error::ErrorStatus;
use crate::oid::Oid;
use crate::value::Value;

use super::matcher::match_scalar;
use super::subtree::{Subtree, SubtreeKind};
use super::variable::{
    Access, BoxFuture, Found, Lookup, Magic, SetAction, ValueType, Variable, VariableHandler,
    WriteHandler, WriteResult,
};

/// Base of the system group.
pub const SYSTEM_OID: [u32; 7] = [1, 3, 6, 1, 2, 1, 1];

/// Longest value accepted for a writable system string.
pub const MAX_SYSTEM_STRING: usize = 255;

/// Columns of the system group; the discriminant is the column arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemField {
    Descr = 1,
    ObjectId = 2,
    UpTime = 3,
    Contact = 4,
    Name = 5,
    Location = 6,
}

impl SystemField {
    pub const ALL: [SystemField; 6] = [
        SystemField::Descr,
        SystemField::ObjectId,
        SystemField::UpTime,
        SystemField::Contact,
        SystemField::Name,
        SystemField::Location,
    ];

    pub fn arc(self) -> u32 {
        self as u32
    }

    fn value_type(self) -> ValueType {
        match self {
            SystemField::ObjectId => ValueType::ObjectIdentifier,
            SystemField::UpTime => ValueType::TimeTicks,
            _ => ValueType::OctetString,
        }
    }

    fn access(self) -> Access {
        match self {
            SystemField::Contact | SystemField::Name | SystemField::Location => Access::ReadWrite,
            _ => Access::ReadOnly,
        }
    }
}

/// Configured values of the system group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSettings {
    pub descr: String,
    pub object_id: Oid,
    pub contact: String,
    pub name: String,
    pub location: String,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            descr: format!(
                "extsnmpd {} ({})",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS
            ),
            object_id: Oid::from_slice(&[1, 3, 6, 1, 4, 1, 2021, 250, 255]),
            contact: String::new(),
            name: String::new(),
            location: String::new(),
        }
    }
}

#[derive(Debug)]
struct Writable {
    contact: Bytes,
    name: Bytes,
    location: Bytes,
}

impl Writable {
    fn get(&self, field: SystemField) -> Option<&Bytes> {
        match field {
            SystemField::Contact => Some(&self.contact),
            SystemField::Name => Some(&self.name),
            SystemField::Location => Some(&self.location),
            _ => None,
        }
    }

    fn slot(&mut self, field: SystemField) -> Option<&mut Bytes> {
        match field {
            SystemField::Contact => Some(&mut self.contact),
            SystemField::Name => Some(&mut self.name),
            SystemField::Location => Some(&mut self.location),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct SystemState {
    descr: Bytes,
    object_id: Oid,
    started: Instant,
    writable: RwLock<Writable>,
}

/// Handler for the system group.
#[derive(Debug, Clone)]
pub struct SystemGroup {
    state: Arc<SystemState>,
}

impl SystemGroup {
    pub fn new(settings: &SystemSettings) -> Self {
        let state = SystemState {
            descr: Bytes::from(settings.descr.clone()),
            object_id: settings.object_id.clone(),
            started: Instant::now(),
            writable: RwLock::new(Writable {
                contact: Bytes::from(settings.contact.clone()),
                name: Bytes::from(settings.name.clone()),
                location: Bytes::from(settings.location.clone()),
            }),
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// The subtree serving this group.
    pub fn subtree(&self) -> Subtree {
        let handler: Arc<dyn VariableHandler> = Arc::new(self.clone());
        let variables: Vec<Variable> = SystemField::ALL
            .iter()
            .map(|&field| {
                Variable::new(
                    Magic::System(field),
                    field.value_type(),
                    field.access(),
                    Oid::from_slice(&[field.arc()]),
                    handler.clone(),
                )
            })
            .collect();
        Subtree::new(
            Oid::from_slice(&SYSTEM_OID),
            Arc::from(variables),
            SubtreeKind::Static,
        )
    }

    /// Hundredths of a second since the group was created.
    pub fn uptime(&self) -> u32 {
        (self.state.started.elapsed().as_millis() / 10) as u32
    }

    fn value(&self, field: SystemField) -> Value {
        match field {
            SystemField::Descr => Value::OctetString(self.state.descr.clone()),
            SystemField::ObjectId => Value::ObjectIdentifier(self.state.object_id.clone()),
            SystemField::UpTime => Value::TimeTicks(self.uptime()),
            SystemField::Contact | SystemField::Name | SystemField::Location => {
                let guard = self
                    .state
                    .writable
                    .read()
                    .unwrap_or_else(PoisonError::into_inner);
                guard
                    .get(field)
                    .cloned()
                    .map_or(Value::Null, Value::OctetString)
            }
        }
    }
}

impl VariableHandler for SystemGroup {
    fn access<'a>(&'a self, lookup: Lookup<'a>) -> BoxFuture<'a, Option<Found>> {
        Box::pin(async move {
            let Magic::System(field) = lookup.variable.magic() else {
                return None;
            };
            let oid = match_scalar(lookup.name, lookup.request, lookup.mode)?;
            let value = self.value(field);

            if lookup.variable.access().is_writable() {
                let writer = Arc::new(SystemWriter {
                    group: self.clone(),
                    field,
                    previous: Mutex::new(None),
                });
                Some(Found::writable(oid, value, writer))
            } else {
                Some(Found::read_only(oid, value))
            }
        })
    }
}

/// SET support for one writable system string.
struct SystemWriter {
    group: SystemGroup,
    field: SystemField,
    previous: Mutex<Option<Bytes>>,
}

impl SystemWriter {
    fn swap(&self, new: Bytes) -> Option<Bytes> {
        let mut guard = self
            .group
            .state
            .writable
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard
            .slot(self.field)
            .map(|slot| std::mem::replace(slot, new))
    }
}

impl WriteHandler for SystemWriter {
    fn apply<'a>(
        &'a self,
        action: SetAction,
        value: &'a Value,
        target: &'a Oid,
    ) -> BoxFuture<'a, WriteResult> {
        Box::pin(async move {
            let Value::OctetString(text) = value else {
                return WriteResult::WrongType;
            };

            match action {
                SetAction::Validate => {
                    if text.len() > MAX_SYSTEM_STRING {
                        return WriteResult::Failed(ErrorStatus::WrongLength);
                    }
                }
                SetAction::Commit => {
                    let old = self.swap(text.clone());
                    tracing::info!(target: "extsnmpd::mib", { snmp.oid = %target, field = ?self.field }, "system value changed");
                    *self.previous.lock().unwrap_or_else(PoisonError::into_inner) = old;
                }
                SetAction::Undo => {
                    let old = self
                        .previous
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take();
                    if let Some(old) = old {
                        self.swap(old);
                    }
                }
            }
            WriteResult::Ok
        })
    }
}
