//! `pass` subtrees: a whole OID region answered by an external program.
//!
//! The program is run once per access:
//!
//! ```text
//! prog -g <oid>                  GET
//! prog -n <oid>                  GETNEXT
//! prog -s <oid> <type> <value>   SET (commit)
//! ```
//!
//! GET and GETNEXT expect three lines back: the OID, a type keyword and the
//! value. Anything else means there is no such instance.

use std::net::Ipv4Addr;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::ErrorStatus;
use crate::mib::{
    BoxFuture, Found, Lookup, MatchMode, SetAction, VariableHandler, WriteHandler, WriteResult,
};
use crate::oid::Oid;
use crate::value::Value;

use super::entry::CommandKind;
use super::handler::ExecContext;
use super::launcher::CommandLine;

/// A `pass <oid> <command>` registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassEntry {
    oid: Oid,
    command: String,
}

impl PassEntry {
    pub fn new(oid: Oid, command: impl Into<String>) -> Self {
        Self {
            oid,
            command: command.into(),
        }
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn invoke<I, S>(&self, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::new(CommandKind::Exec, &self.command).with_args(args)
    }
}

pub(super) struct PassHandler {
    ctx: Arc<ExecContext>,
}

impl PassHandler {
    pub(super) fn new(ctx: Arc<ExecContext>) -> Self {
        Self { ctx }
    }

    fn owner(&self, base: &Oid) -> Option<&Arc<PassEntry>> {
        self.ctx
            .registry
            .pass_entries()
            .iter()
            .find(|pass| pass.oid() == base)
    }
}

impl VariableHandler for PassHandler {
    fn access<'a>(&'a self, lookup: Lookup<'a>) -> BoxFuture<'a, Option<Found>> {
        Box::pin(async move {
            let pass = self.owner(lookup.name)?;

            let command = match lookup.mode {
                MatchMode::Next => {
                    let from = lookup.request.max(lookup.name);
                    pass.invoke(["-n".to_owned(), from.to_string()])
                }
                MatchMode::Exact | MatchMode::Probe => {
                    pass.invoke(["-g".to_owned(), lookup.request.to_string()])
                }
            };
            let output = self.ctx.run(&command).await;

            let Some((oid, value)) = parse_reply(&output.stdout) else {
                tracing::trace!(target: "extsnmpd::exec", { exec.command = %command, exec.status = output.status }, "pass command returned nothing usable");
                return None;
            };

            if !oid.starts_with(pass.oid()) {
                tracing::debug!(target: "extsnmpd::exec", { exec.command = %command, snmp.oid = %oid }, "pass command answered outside its subtree");
                return None;
            }
            let acceptable = match lookup.mode {
                MatchMode::Next => oid > *lookup.request,
                MatchMode::Exact | MatchMode::Probe => oid == *lookup.request,
            };
            if !acceptable {
                return None;
            }

            let writer = Arc::new(PassWriter {
                ctx: self.ctx.clone(),
                pass: pass.clone(),
            });
            Some(Found::writable(oid, value, writer))
        })
    }
}

struct PassWriter {
    ctx: Arc<ExecContext>,
    pass: Arc<PassEntry>,
}

impl WriteHandler for PassWriter {
    fn apply<'a>(
        &'a self,
        action: SetAction,
        value: &'a Value,
        target: &'a Oid,
    ) -> BoxFuture<'a, WriteResult> {
        Box::pin(async move {
            let Some((kind, text)) = format_value(value) else {
                return WriteResult::WrongType;
            };

            match action {
                SetAction::Validate => WriteResult::Ok,
                SetAction::Commit => {
                    let command = self
                        .pass
                        .invoke(["-s".to_owned(), target.to_string(), kind.to_owned(), text]);
                    let output = self.ctx.run(&command).await;
                    tracing::debug!(target: "extsnmpd::exec", { exec.command = %command, exec.status = output.status }, "pass set");

                    if output.is_failure() {
                        return WriteResult::Failed(ErrorStatus::CommitFailed);
                    }
                    match output.first_line().trim() {
                        "not-writable" => WriteResult::Failed(ErrorStatus::NotWritable),
                        "wrong-type" => WriteResult::WrongType,
                        _ => WriteResult::Ok,
                    }
                }
                // the external program has no way to take a write back
                SetAction::Undo => WriteResult::Failed(ErrorStatus::UndoFailed),
            }
        })
    }
}

/// Parse a three-line `oid / type / value` reply.
fn parse_reply(stdout: &str) -> Option<(Oid, Value)> {
    let mut lines = stdout.lines();
    let oid = Oid::parse(lines.next()?.trim()).ok()?;
    let kind = lines.next()?.trim();
    let text = lines.next().unwrap_or("");
    Some((oid, parse_value(kind, text)?))
}

fn parse_value(kind: &str, text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let value = match kind.to_ascii_lowercase().as_str() {
        "integer" => Value::Integer(trimmed.parse().ok()?),
        "gauge" => Value::Gauge32(trimmed.parse().ok()?),
        "counter" => Value::Counter32(trimmed.parse().ok()?),
        "counter64" => Value::Counter64(trimmed.parse().ok()?),
        "timeticks" => Value::TimeTicks(trimmed.parse().ok()?),
        "ipaddress" => Value::from(trimmed.parse::<Ipv4Addr>().ok()?),
        "objectid" => Value::ObjectIdentifier(Oid::parse(trimmed).ok()?),
        "string" => Value::from(text),
        "octet" => {
            let bytes = trimmed
                .split_whitespace()
                .map(|pair| u8::from_str_radix(pair, 16).ok())
                .collect::<Option<Vec<u8>>>()?;
            Value::OctetString(Bytes::from(bytes))
        }
        _ => return None,
    };
    Some(value)
}

/// Type keyword and text for a SET value, or `None` if pass cannot carry it.
fn format_value(value: &Value) -> Option<(&'static str, String)> {
    let formatted = match value {
        Value::Integer(v) => ("integer", v.to_string()),
        Value::Gauge32(v) => ("gauge", v.to_string()),
        Value::Counter32(v) => ("counter", v.to_string()),
        Value::Counter64(v) => ("counter64", v.to_string()),
        Value::TimeTicks(v) => ("timeticks", v.to_string()),
        Value::IpAddress(_) | Value::ObjectIdentifier(_) => (value.type_keyword(), value.to_string()),
        Value::OctetString(data) => match std::str::from_utf8(data) {
            Ok(text) => ("string", text.to_owned()),
            Err(_) => {
                let hex: Vec<String> = data.iter().map(|b| format!("{:02x}", b)).collect();
                ("octet", hex.join(" "))
            }
        },
        _ => return None,
    };
    Some(formatted)
}
