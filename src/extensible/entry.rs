use std::sync::{Mutex, PoisonError};

use crate::oid::Oid;

use super::launcher::{CommandLine, CommandOutput};

/// How an entry's command is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `sh`: handed to `/bin/sh -c`.
    Shell,
    /// `exec`: split on whitespace and run directly.
    Exec,
}

impl CommandKind {
    /// Pick the kind from a directive keyword. Anything starting with `sh`
    /// (any case) is a shell command.
    pub fn from_keyword(keyword: &str) -> Self {
        if keyword
            .get(..2)
            .is_some_and(|head| head.eq_ignore_ascii_case("sh"))
        {
            CommandKind::Shell
        } else {
            CommandKind::Exec
        }
    }
}

/// One configured external command.
#[derive(Debug)]
pub struct ExtensibleEntry {
    kind: CommandKind,
    oid: Option<Oid>,
    name: String,
    command: String,
    last: Mutex<Option<CommandOutput>>,
}

impl ExtensibleEntry {
    pub fn new(
        kind: CommandKind,
        oid: Option<Oid>,
        name: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            oid,
            name: name.into(),
            command: command.into(),
            last: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// The literal OID, if one was configured.
    pub fn oid(&self) -> Option<&Oid> {
        self.oid.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn command_line(&self) -> CommandLine {
        CommandLine::new(self.kind, &self.command)
    }

    /// Output of the most recent run. Informational only; reads never
    /// answer from it.
    pub fn last_output(&self) -> Option<CommandOutput> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn record(&self, output: &CommandOutput) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(output.clone());
    }
}

impl PartialEq for ExtensibleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.oid == other.oid
            && self.name == other.name
            && self.command == other.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_selects_kind() {
        assert_eq!(CommandKind::from_keyword("sh"), CommandKind::Shell);
        assert_eq!(CommandKind::from_keyword("SH"), CommandKind::Shell);
        assert_eq!(CommandKind::from_keyword("shell"), CommandKind::Shell);
        assert_eq!(CommandKind::from_keyword("exec"), CommandKind::Exec);
        assert_eq!(CommandKind::from_keyword("s"), CommandKind::Exec);
    }

    #[test]
    fn records_last_output() {
        let entry = ExtensibleEntry::new(CommandKind::Exec, None, "t", "/bin/true");
        assert_eq!(entry.last_output(), None);
        entry.record(&CommandOutput::new(0, "ok\n"));
        assert_eq!(entry.last_output().map(|o| o.status), Some(0));
    }
}
