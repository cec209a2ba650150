//! Registration lists for `exec`, `sh` and `pass` directives.

use std::fmt;
use std::sync::Arc;

use crate::oid::Oid;

use super::entry::{CommandKind, ExtensibleEntry};
use super::pass::PassEntry;

/// Which list an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Entries with a literal OID; each is mounted as its own subtree.
    General,
    /// Entries without an OID; served as rows of the extensible table.
    Relocatable,
}

/// Something wrong with a directive. The directive is still registered as
/// far as it could be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveProblem {
    MissingName,
    MissingCommand,
    /// The leading OID did not parse; the entry was registered without one.
    InvalidOid,
    /// `pass` needs an OID; nothing was registered.
    MissingOid,
}

impl fmt::Display for DirectiveProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveProblem::MissingName => write!(f, "missing name"),
            DirectiveProblem::MissingCommand => write!(f, "missing command"),
            DirectiveProblem::InvalidOid => write!(f, "invalid OID"),
            DirectiveProblem::MissingOid => write!(f, "missing OID"),
        }
    }
}

/// Where a parsed directive ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registered {
    pub list: ListKind,
    /// 1-based position within `list`.
    pub instance: u32,
    pub problem: Option<DirectiveProblem>,
}

/// The extensible registry.
///
/// Lists are append-only until [`Registry::reset`], so an entry's instance
/// number never changes while it is being served.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    general: Vec<Arc<ExtensibleEntry>>,
    relocatable: Vec<Arc<ExtensibleEntry>>,
    passes: Vec<Arc<PassEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. It goes to the general list if it has an OID and to
    /// the relocatable list otherwise.
    pub fn register(
        &mut self,
        kind: CommandKind,
        oid: Option<Oid>,
        name: impl Into<String>,
        command: impl Into<String>,
    ) -> (ListKind, u32) {
        let list = if oid.is_some() {
            ListKind::General
        } else {
            ListKind::Relocatable
        };
        let entries = self.list_mut(list);
        entries.push(Arc::new(ExtensibleEntry::new(kind, oid, name, command)));
        (list, instance_of(entries.len()))
    }

    /// Parse and register an `exec` or `sh` directive.
    ///
    /// `args` is everything after the keyword:
    /// `[<oid>] <name> <command...> [# comment]`.
    ///
    /// ```
    /// use extsnmpd::extensible::{ListKind, Registry};
    ///
    /// let mut registry = Registry::new();
    /// let done = registry.parse_directive("exec", "1 updown /bin/true");
    /// assert_eq!(done.list, ListKind::General);
    ///
    /// let entry = registry.lookup(ListKind::General, 1).unwrap();
    /// assert_eq!(entry.command(), "/bin/true");
    /// ```
    pub fn parse_directive(&mut self, keyword: &str, args: &str) -> Registered {
        let kind = CommandKind::from_keyword(keyword);
        let mut problem = None;

        let rest = args.trim_start();
        let rest = rest.strip_prefix('.').unwrap_or(rest);

        let (oid, rest) = if rest.starts_with(|c: char| c.is_ascii_digit()) {
            let (text, rest) = split_token(rest);
            match Oid::parse(text) {
                Ok(oid) => (Some(oid), rest),
                Err(_) => {
                    problem = Some(DirectiveProblem::InvalidOid);
                    (None, rest)
                }
            }
        } else {
            (None, rest)
        };

        let (name, rest) = split_token(rest);
        let command = strip_comment(rest);

        if name.is_empty() {
            problem = problem.or(Some(DirectiveProblem::MissingName));
        } else if command.is_empty() {
            problem = problem.or(Some(DirectiveProblem::MissingCommand));
        }

        let (list, instance) = self.register(kind, oid, name, command);
        Registered {
            list,
            instance,
            problem,
        }
    }

    /// Parse and register a `pass <oid> <command>` directive.
    pub fn parse_pass(&mut self, args: &str) -> Result<u32, DirectiveProblem> {
        let (text, rest) = split_token(args.trim_start());
        let text = text.strip_prefix('.').unwrap_or(text);
        if !text.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(DirectiveProblem::MissingOid);
        }
        let oid = Oid::parse(text).map_err(|_| DirectiveProblem::InvalidOid)?;

        let command = rest.trim();
        if command.is_empty() {
            return Err(DirectiveProblem::MissingCommand);
        }

        self.passes.push(Arc::new(PassEntry::new(oid, command)));
        Ok(instance_of(self.passes.len()))
    }

    /// Entry at 1-based `instance` of `list`.
    pub fn lookup(&self, list: ListKind, instance: u32) -> Option<&Arc<ExtensibleEntry>> {
        let index = usize::try_from(instance.checked_sub(1)?).ok()?;
        self.entries(list).get(index)
    }

    pub fn entries(&self, list: ListKind) -> &[Arc<ExtensibleEntry>] {
        match list {
            ListKind::General => &self.general,
            ListKind::Relocatable => &self.relocatable,
        }
    }

    pub fn count(&self, list: ListKind) -> usize {
        self.entries(list).len()
    }

    pub fn pass_entries(&self) -> &[Arc<PassEntry>] {
        &self.passes
    }

    /// Drop every registration.
    pub fn reset(&mut self) {
        self.general.clear();
        self.relocatable.clear();
        self.passes.clear();
    }

    fn list_mut(&mut self, list: ListKind) -> &mut Vec<Arc<ExtensibleEntry>> {
        match list {
            ListKind::General => &mut self.general,
            ListKind::Relocatable => &mut self.relocatable,
        }
    }
}

fn instance_of(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Split off the first whitespace-delimited token.
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], s[end..].trim_start()),
        None => (s, ""),
    }
}

/// Command text up to a `#` or `;` comment, trimmed.
fn strip_comment(s: &str) -> &str {
    let end = s.find(['#', ';']).unwrap_or(s.len());
    s[..end].trim()
}
