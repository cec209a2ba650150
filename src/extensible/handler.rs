//! Variable handlers for extensible entries.
//!
//! Both the relocatable table and the per-entry subtrees share one column
//! layout:
//!
//! | arc | column    | access     | value                                  |
//! |-----|-----------|------------|----------------------------------------|
//! | 1   | index     | read-only  | instance number                        |
//! | 2   | name      | read-only  | configured name                        |
//! | 3   | command   | read-only  | configured command line                |
//! | 100 | result    | read-only  | exit status of a fresh run             |
//! | 101 | message   | read-only  | output of a fresh run                  |
//! | 102 | fix       | read-write | always 0; writing 1 runs the fix command |

use std::sync::Arc;
use std::time::Duration;

use crate::mib::{
    Access, BoxFuture, Found, InstanceBound, Lookup, MAX_MSG_LINES, Magic, MatchMode, SetAction,
    Subtree, SubtreeKind, ValueType, Variable, VariableHandler, WriteHandler, WriteResult,
    match_instance,
};
use crate::oid::Oid;
use crate::value::Value;

use super::entry::{CommandKind, ExtensibleEntry};
use super::launcher::{CommandLine, CommandOutput, CommandRunner, DEFAULT_EXEC_TIMEOUT};
use super::pass::PassHandler;
use super::registry::{ListKind, Registry};

/// Base of the UCD extensible table (`extEntry`).
pub const EXT_TABLE_OID: [u32; 9] = [1, 3, 6, 1, 4, 1, 2021, 8, 1];

/// Columns of the extensible table; the discriminant is the column arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtField {
    Index = 1,
    Name = 2,
    Command = 3,
    Result = 100,
    Message = 101,
    Fix = 102,
}

impl ExtField {
    pub const ALL: [ExtField; 6] = [
        ExtField::Index,
        ExtField::Name,
        ExtField::Command,
        ExtField::Result,
        ExtField::Message,
        ExtField::Fix,
    ];

    pub fn arc(self) -> u32 {
        self as u32
    }

    fn value_type(self) -> ValueType {
        match self {
            ExtField::Name | ExtField::Command | ExtField::Message => ValueType::OctetString,
            ExtField::Index | ExtField::Result | ExtField::Fix => ValueType::Integer,
        }
    }

    fn access(self) -> Access {
        match self {
            ExtField::Fix => Access::ReadWrite,
            _ => Access::ReadOnly,
        }
    }
}

/// Settings shared by every launched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecSettings {
    pub timeout: Duration,
    /// Template run when `fix` is set to 1; `%s` becomes the entry name.
    pub fix_command: Option<String>,
}

impl Default for ExecSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_EXEC_TIMEOUT,
            fix_command: None,
        }
    }
}

/// What the handlers need at request time.
pub(super) struct ExecContext {
    pub(super) registry: Arc<Registry>,
    pub(super) runner: Arc<dyn CommandRunner>,
    pub(super) settings: ExecSettings,
}

impl ExecContext {
    pub(super) async fn run(&self, command: &CommandLine) -> CommandOutput {
        self.runner.run(command, self.settings.timeout).await
    }

    async fn run_entry(&self, entry: &ExtensibleEntry) -> CommandOutput {
        let output = self.run(&entry.command_line()).await;
        tracing::debug!(target: "extsnmpd::exec", { exec.command = %entry.command(), exec.status = output.status, name = %entry.name() }, "extensible command ran");
        entry.record(&output);
        output
    }

    /// Value of `field` for the entry at `index`.
    ///
    /// `line` selects a message line for per-entry subtrees; `None` always
    /// answers with the first line, as table rows do. A missing line means
    /// there is no such instance.
    async fn field_value(
        &self,
        field: ExtField,
        entry: &ExtensibleEntry,
        index: u32,
        line: Option<u32>,
    ) -> Option<Value> {
        let value = match field {
            ExtField::Index => Value::Integer(clamp_i32(index)),
            ExtField::Name => Value::from(entry.name()),
            ExtField::Command => Value::from(entry.command()),
            ExtField::Result => Value::Integer(self.run_entry(entry).await.status),
            ExtField::Message => {
                let output = self.run_entry(entry).await;
                let text = match (entry.kind(), line) {
                    (_, None) | (CommandKind::Shell, Some(1)) => output.first_line(),
                    (CommandKind::Shell, Some(_)) => return None,
                    (CommandKind::Exec, Some(1)) if output.is_failure() => "",
                    (CommandKind::Exec, Some(n)) => output.line(n)?,
                };
                Value::from(text)
            }
            ExtField::Fix => Value::Integer(0),
        };
        Some(value)
    }

    fn found(
        self: &Arc<Self>,
        field: ExtField,
        oid: Oid,
        value: Value,
        entry: &Arc<ExtensibleEntry>,
    ) -> Found {
        match field {
            ExtField::Fix => {
                let writer = Arc::new(FixWriter {
                    ctx: self.clone(),
                    entry: entry.clone(),
                });
                Found::writable(oid, value, writer)
            }
            _ => Found::read_only(oid, value),
        }
    }
}

fn clamp_i32(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn ext_field(variable: &Variable) -> Option<ExtField> {
    match variable.magic() {
        Magic::Extensible(field) => Some(field),
        _ => None,
    }
}

/// Serves the relocatable list as rows of the extensible table.
struct TableHandler {
    ctx: Arc<ExecContext>,
}

impl VariableHandler for TableHandler {
    fn access<'a>(&'a self, lookup: Lookup<'a>) -> BoxFuture<'a, Option<Found>> {
        Box::pin(async move {
            let field = ext_field(lookup.variable)?;
            let registry = &self.ctx.registry;
            let bound = InstanceBound::from(registry.count(ListKind::Relocatable));

            let oid = match_instance(lookup.name, lookup.request, lookup.mode, bound)?;
            let instance = oid.last()?;
            let entry = registry.lookup(ListKind::Relocatable, instance)?;

            let value = self.ctx.field_value(field, entry, instance, None).await?;
            Some(self.ctx.found(field, oid, value, entry))
        })
    }
}

/// Serves the subtree mounted at a general-list entry's OID.
struct GeneralHandler {
    ctx: Arc<ExecContext>,
}

impl GeneralHandler {
    /// Find the entry whose OID is the parent of `name`.
    fn owner(&self, name: &Oid) -> Option<&Arc<ExtensibleEntry>> {
        let general = self.ctx.registry.entries(ListKind::General);
        general.iter().find(|entry| {
            entry.oid().is_some_and(|prefix| {
                match_instance(prefix, name, MatchMode::Probe, InstanceBound::Unbounded)
                    .is_some_and(|probed| probed == *name)
            })
        })
    }
}

impl VariableHandler for GeneralHandler {
    fn access<'a>(&'a self, lookup: Lookup<'a>) -> BoxFuture<'a, Option<Found>> {
        Box::pin(async move {
            let field = ext_field(lookup.variable)?;
            let Some(entry) = self.owner(lookup.name) else {
                tracing::debug!(target: "extsnmpd::mib", { snmp.oid = %lookup.name }, "no extensible entry owns this subtree");
                return None;
            };

            let bound = match field {
                ExtField::Message => InstanceBound::Limit(MAX_MSG_LINES),
                _ => InstanceBound::Limit(1),
            };
            let oid = match_instance(lookup.name, lookup.request, lookup.mode, bound)?;
            let line = oid.last()?;

            // the instance arc doubles as the index, as in the table
            let value = self.ctx.field_value(field, entry, line, Some(line)).await?;
            Some(self.ctx.found(field, oid, value, entry))
        })
    }
}

/// SET handler for the `fix` column.
struct FixWriter {
    ctx: Arc<ExecContext>,
    entry: Arc<ExtensibleEntry>,
}

impl WriteHandler for FixWriter {
    fn apply<'a>(
        &'a self,
        action: SetAction,
        value: &'a Value,
        target: &'a Oid,
    ) -> BoxFuture<'a, WriteResult> {
        Box::pin(async move {
            let Value::Integer(requested) = value else {
                return WriteResult::WrongType;
            };
            if action != SetAction::Commit || *requested != 1 {
                return WriteResult::Ok;
            }

            let Some(template) = &self.ctx.settings.fix_command else {
                tracing::debug!(target: "extsnmpd::exec", { snmp.oid = %target, name = %self.entry.name() }, "fix requested but no fix command configured");
                return WriteResult::Ok;
            };
            let command = CommandLine::new(
                CommandKind::Exec,
                &template.replace("%s", self.entry.name()),
            );
            let output = self.ctx.run(&command).await;
            tracing::info!(target: "extsnmpd::exec", { snmp.oid = %target, exec.command = %command, exec.status = output.status }, "fix command ran");
            WriteResult::Ok
        })
    }
}

/// Shared variable lists for extensible subtrees.
///
/// Every subtree of a given kind references the same list, so two tables
/// built from the same schemas bind identical variables.
#[derive(Clone)]
pub struct ExtensibleSchemas {
    table: Arc<[Variable]>,
    general: Arc<[Variable]>,
    pass: Arc<[Variable]>,
}

impl ExtensibleSchemas {
    pub fn new(
        registry: Arc<Registry>,
        runner: Arc<dyn CommandRunner>,
        settings: ExecSettings,
    ) -> Self {
        let ctx = Arc::new(ExecContext {
            registry,
            runner,
            settings,
        });

        let table: Arc<dyn VariableHandler> = Arc::new(TableHandler { ctx: ctx.clone() });
        let general: Arc<dyn VariableHandler> = Arc::new(GeneralHandler { ctx: ctx.clone() });
        let pass: Arc<dyn VariableHandler> = Arc::new(PassHandler::new(ctx));

        Self {
            table: columns(&table),
            general: columns(&general),
            pass: Arc::from(vec![Variable::new(
                Magic::PassThrough,
                ValueType::Any,
                Access::ReadWrite,
                Oid::empty(),
                pass,
            )]),
        }
    }

    /// The static extensible table subtree.
    pub fn table_subtree(&self) -> Subtree {
        Subtree::new(
            Oid::from_slice(&EXT_TABLE_OID),
            self.table.clone(),
            SubtreeKind::Static,
        )
    }

    pub fn general(&self) -> Arc<[Variable]> {
        self.general.clone()
    }

    pub fn pass(&self) -> Arc<[Variable]> {
        self.pass.clone()
    }
}

fn columns(handler: &Arc<dyn VariableHandler>) -> Arc<[Variable]> {
    ExtField::ALL
        .iter()
        .map(|&field| {
            Variable::new(
                Magic::Extensible(field),
                field.value_type(),
                field.access(),
                Oid::from_slice(&[field.arc()]),
                handler.clone(),
            )
        })
        .collect()
}

impl std::fmt::Debug for ExtensibleSchemas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensibleSchemas")
            .field("table", &self.table.len())
            .field("general", &self.general.len())
            .field("pass", &self.pass.len())
            .finish()
    }
}
