//! Command-line arguments of the `extsnmpd` daemon.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::agent::{AgentBuilder, DEFAULT_MAX_CONCURRENT};
use crate::config::{ConfigSources, DEFAULT_CONFIG_PATH, DIRECTIVES, parse_listen};

/// SNMP agent with an extensible MIB backed by external commands.
#[derive(Debug, Parser)]
#[command(name = "extsnmpd", version, about, disable_version_flag = true)]
pub struct DaemonArgs {
    /// UDP port to listen on (all IPv4 addresses).
    #[arg(short = 'p', long = "port", value_name = "PORT", conflicts_with = "listen")]
    pub port: Option<u16>,

    /// Listen address, `[udp:][ADDRESS:]PORT`.
    #[arg(long = "listen", value_name = "ADDR", value_parser = parse_listen_arg)]
    pub listen: Option<SocketAddr>,

    /// Read this configuration file; may be repeated.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Vec<PathBuf>,

    /// Do not read the default configuration file.
    #[arg(short = 'C', long = "no-default-config")]
    pub no_default_config: bool,

    /// Log the address of each new peer.
    #[arg(short = 'a', long = "log-addresses")]
    pub log_addresses: bool,

    /// Log every request (extsnmpd=debug).
    #[arg(short = 'V', long = "verbose")]
    pub verbose: bool,

    /// Also dump packets (extsnmpd=trace).
    #[arg(short = 'D', long = "debug")]
    pub debug: bool,

    /// Write the process id to FILE.
    #[arg(short = 'P', long = "pid-file", value_name = "FILE")]
    pub pid_file: Option<PathBuf>,

    /// Deadline for each launched command, in seconds.
    #[arg(long = "exec-timeout", value_name = "SECS")]
    pub exec_timeout: Option<u64>,

    /// Requests handled at once.
    #[arg(long = "max-concurrent", value_name = "N", default_value_t = DEFAULT_MAX_CONCURRENT)]
    pub max_concurrent: usize,

    /// List configuration directives and exit.
    #[arg(short = 'H', long = "config-help")]
    pub config_help: bool,
}

fn parse_listen_arg(text: &str) -> Result<SocketAddr, String> {
    parse_listen(text).ok_or_else(|| format!("invalid listen address '{}'", text))
}

impl DaemonArgs {
    /// Address from `--listen` or `--port`, if either was given.
    pub fn bind_addr(&self) -> Option<SocketAddr> {
        self.listen.or_else(|| {
            self.port
                .map(|port| SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        })
    }

    pub fn config_sources(&self) -> ConfigSources {
        ConfigSources {
            use_default: !self.no_default_config,
            files: self.config.clone(),
        }
    }

    pub fn exec_timeout(&self) -> Option<Duration> {
        self.exec_timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Agent builder configured from these arguments.
    pub fn agent_builder(&self) -> AgentBuilder {
        let mut builder = AgentBuilder::new()
            .config_sources(self.config_sources())
            .max_concurrent_requests(self.max_concurrent)
            .log_addresses(self.log_addresses);
        if let Some(addr) = self.bind_addr() {
            builder = builder.bind(addr.to_string());
        }
        if let Some(timeout) = self.exec_timeout() {
            builder = builder.exec_timeout(timeout);
        }
        builder
    }

    /// Log filter implied by `-V`/`-D`; `RUST_LOG` takes precedence.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "extsnmpd=trace"
        } else if self.verbose {
            "extsnmpd=debug"
        } else {
            "extsnmpd=info"
        }
    }

    /// Initialize tracing on stderr.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_filter()));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Text printed by `-H`.
pub fn directive_help() -> String {
    let mut help = format!(
        "Configuration directives understood (default file {}):\n",
        DEFAULT_CONFIG_PATH
    );
    let width = DIRECTIVES.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, usage) in DIRECTIVES {
        help.push_str(&format!("  {:width$}  {}\n", name, usage, width = width));
    }
    help
}
