//! # extsnmpd
//!
//! An async SNMPv1/v2c agent whose MIB can be extended with external
//! commands.
//!
//! ## Features
//!
//! - Subtree dispatch engine with GET, GETNEXT, GETBULK and three-phase SET
//! - `exec`/`sh` entries: run a command, serve its exit status and output
//! - `pass` entries: delegate a whole subtree to an external program
//! - MIB-II `system` group with writable contact, name and location
//! - `snmpd.conf`-style configuration, reloaded on `SIGHUP`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use extsnmpd::Agent;
//! use extsnmpd::config::AgentConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<extsnmpd::Error>> {
//!     let config = AgentConfig::from_text(
//!         "syslocation lab\n\
//!          exec backup /usr/local/bin/check-backup\n",
//!     );
//!
//!     let agent = Agent::builder()
//!         .bind("0.0.0.0:1161")
//!         .config(config)
//!         .build()
//!         .await?;
//!
//!     agent.run().await
//! }
//! ```
//!
//! The relocatable `exec` entry above shows up as row 1 of the extensible
//! table, `1.3.6.1.4.1.2021.8.1.{column}.1`.

pub mod agent;
pub mod ber;
pub mod config;
pub mod error;
pub mod extensible;
pub mod message;
pub mod mib;
pub mod oid;
pub mod pdu;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use agent::{Agent, AgentBuilder};
pub use config::{AgentConfig, ConfigSources};
pub use error::{DecodeErrorKind, Error, ErrorStatus, OidErrorKind, Result};
pub use extensible::{CommandRunner, ProcessLauncher, Registry};
pub use message::CommunityMessage;
pub use mib::{Resolution, SubtreeTable};
pub use oid::Oid;
pub use pdu::{Pdu, PduType};
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;
