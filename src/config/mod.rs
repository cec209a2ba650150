//! `snmpd.conf`-style configuration.
//!
//! One directive per line; the keyword is case-insensitive and lines starting
//! with `#` are comments. Malformed directives are logged and skipped (or
//! kept partially, for `exec`/`sh`); only an unreadable file that was asked
//! for explicitly is an error.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::extensible::{ExecSettings, ListKind, Registry};
use crate::mib::SystemSettings;
use crate::oid::Oid;

/// Configuration read when `-C` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/snmp/snmpd.conf";

/// Standard SNMP agent port.
pub const DEFAULT_PORT: u16 = 161;

/// Directives understood, as printed by `extsnmpd -H`.
pub const DIRECTIVES: &[(&str, &str)] = &[
    ("exec", "[OID] NAME COMMAND [ARGS...]"),
    ("sh", "[OID] NAME SHELL-COMMAND"),
    ("pass", "OID COMMAND"),
    ("execfix", "COMMAND-TEMPLATE (%s is the entry name)"),
    ("exectimeout", "SECONDS"),
    ("sysdescr", "TEXT"),
    ("sysobjectid", "OID"),
    ("syscontact", "TEXT"),
    ("sysname", "TEXT"),
    ("syslocation", "TEXT"),
    ("agentaddress", "[udp:][ADDRESS:]PORT"),
];

/// Which files to read, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSources {
    /// Read [`DEFAULT_CONFIG_PATH`] first, if it exists.
    pub use_default: bool,
    /// Files named explicitly; each must be readable.
    pub files: Vec<PathBuf>,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            use_default: true,
            files: Vec::new(),
        }
    }
}

impl ConfigSources {
    /// Only the given files, no default.
    pub fn files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            use_default: false,
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    pub fn load(&self) -> Result<AgentConfig> {
        let mut config = AgentConfig::default();
        config.reload(self)?;
        Ok(config)
    }
}

/// Everything the configuration files decide.
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    pub registry: Registry,
    pub system: SystemSettings,
    pub exec: ExecSettings,
    /// From `agentaddress`; the command line takes precedence.
    pub listen: Option<SocketAddr>,
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration text.
    ///
    /// ```
    /// use extsnmpd::config::AgentConfig;
    /// use extsnmpd::extensible::ListKind;
    ///
    /// let config = AgentConfig::from_text("exec foo /bin/false\nsyslocation lab\n");
    /// assert_eq!(config.registry.count(ListKind::Relocatable), 1);
    /// assert_eq!(config.system.location, "lab");
    /// ```
    pub fn from_text(text: &str) -> Self {
        let mut config = Self::default();
        config.apply_text(text, None);
        config
    }

    /// Forget everything, then read `sources` again.
    pub fn reload(&mut self, sources: &ConfigSources) -> Result<()> {
        self.registry.reset();
        self.system = SystemSettings::default();
        self.exec = ExecSettings::default();
        self.listen = None;

        if sources.use_default {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            match std::fs::read_to_string(path) {
                Ok(text) => self.apply_text(&text, Some(path)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(target: "extsnmpd::config", { path = %path.display() }, "no default configuration");
                }
                Err(e) => {
                    tracing::warn!(target: "extsnmpd::config", { path = %path.display(), error = %e }, "cannot read default configuration");
                }
            }
        }

        for path in &sources.files {
            let text = std::fs::read_to_string(path).map_err(|e| {
                Error::Config {
                    path: Some(path.clone()),
                    line: 0,
                    message: e.to_string().into(),
                }
                .boxed()
            })?;
            self.apply_text(&text, Some(path));
        }

        tracing::info!(target: "extsnmpd::config", {
            general = self.registry.count(ListKind::General),
            relocatable = self.registry.count(ListKind::Relocatable),
            pass = self.registry.pass_entries().len()
        }, "configuration loaded");
        Ok(())
    }

    /// Apply every line of `text`. `origin` is only used in log messages.
    pub fn apply_text(&mut self, text: &str, origin: Option<&Path>) {
        for (index, line) in text.lines().enumerate() {
            self.apply_line(line, Origin { path: origin, line: index + 1 });
        }
    }

    fn apply_line(&mut self, line: &str, at: Origin<'_>) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        let (keyword, args) = match line.split_once(char::is_whitespace) {
            Some((keyword, args)) => (keyword, args.trim()),
            None => (line, ""),
        };

        match keyword.to_ascii_lowercase().as_str() {
            "exec" | "sh" => {
                let done = self.registry.parse_directive(keyword, args);
                if let Some(problem) = done.problem {
                    tracing::warn!(target: "extsnmpd::config", { at = %at, problem = %problem }, "malformed {} directive, kept partially", keyword);
                }
            }
            "pass" => {
                if let Err(problem) = self.registry.parse_pass(args) {
                    tracing::warn!(target: "extsnmpd::config", { at = %at, problem = %problem }, "malformed pass directive ignored");
                }
            }
            "execfix" => {
                self.exec.fix_command = (!args.is_empty()).then(|| args.to_owned());
            }
            "exectimeout" => match args.parse::<u64>() {
                Ok(secs) if secs > 0 => self.exec.timeout = Duration::from_secs(secs),
                _ => {
                    tracing::warn!(target: "extsnmpd::config", { at = %at, value = args }, "exectimeout needs a positive number of seconds");
                }
            },
            "sysdescr" => self.system.descr = args.to_owned(),
            "syscontact" => self.system.contact = args.to_owned(),
            "sysname" => self.system.name = args.to_owned(),
            "syslocation" => self.system.location = args.to_owned(),
            "sysobjectid" => match Oid::parse(args) {
                Ok(oid) => self.system.object_id = oid,
                Err(e) => {
                    tracing::warn!(target: "extsnmpd::config", { at = %at, error = %e }, "bad sysobjectid");
                }
            },
            "agentaddress" => match parse_listen(args) {
                Some(addr) => self.listen = Some(addr),
                None => {
                    tracing::warn!(target: "extsnmpd::config", { at = %at, value = args }, "bad agentaddress");
                }
            },
            _ => {
                tracing::warn!(target: "extsnmpd::config", { at = %at, keyword = keyword }, "unknown directive ignored");
            }
        }
    }
}

/// Parse `[udp:][ADDRESS:]PORT`. A bare port listens on all IPv4 addresses.
pub fn parse_listen(text: &str) -> Option<SocketAddr> {
    let text = text.trim();
    let text = text.strip_prefix("udp:").unwrap_or(text);
    if let Ok(port) = text.parse::<u16>() {
        return Some(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }
    text.parse().ok()
}

#[derive(Clone, Copy)]
struct Origin<'a> {
    path: Option<&'a Path>,
    line: usize,
}

impl fmt::Display for Origin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path {
            Some(path) => write!(f, "{}:{}", path.display(), self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}
