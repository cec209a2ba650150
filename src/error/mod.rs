//! Error types for extsnmpd.
//!
//! This module provides:
//!
//! - [`Error`] - The daemon error type for setup, I/O and wire failures
//! - [`ErrorStatus`] - SNMP protocol error codes written into responses (RFC 3416)
//!
//! # Error Handling
//!
//! Errors are boxed for efficiency: `Result<T> = Result<T, Box<Error>>`.
//!
//! Per-request outcomes such as a missing object or a SET of the wrong type
//! are never errors. They travel as values (see
//! [`Resolution`](crate::mib::Resolution) and
//! [`WriteResult`](crate::mib::WriteResult)) and end up as PDU error codes.
//!
//! ```rust
//! use extsnmpd::{Error, Result};
//!
//! fn report(result: Result<()>) {
//!     match result {
//!         Ok(()) => {}
//!         Err(e) => match &*e {
//!             Error::Config { path, line, message } => {
//!                 eprintln!("{:?}:{}: {}", path, line, message);
//!             }
//!             _ => eprintln!("error: {}", e),
//!         },
//!     }
//! }
//! ```

pub(crate) mod internal;

use std::net::SocketAddr;
use std::path::PathBuf;

pub use internal::{DecodeErrorKind, OidErrorKind};

/// Placeholder peer address used when the sender is not known.
pub(crate) const UNKNOWN_PEER: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)), 0);

// Detailed decode failures are logged, then collapsed into a single public variant:
//
// tracing::debug!(
//     target: "extsnmpd::ber",
//     { snmp.offset = 42, kind = %DecodeErrorKind::ZeroLengthInteger },
//     "decode error details here"
// );
// return Err(Error::MalformedRequest { peer }.boxed());

/// Result type alias using the crate's boxed Error type.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// The main error type for extsnmpd.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Socket failure (bind, receive, send).
    #[error("network error on {target}: {source}")]
    Network {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A datagram could not be decoded as an SNMP message.
    #[error("malformed request from {peer}")]
    MalformedRequest { peer: SocketAddr },

    /// Invalid OID text or encoding.
    #[error("invalid OID{}: {kind}", input.as_ref().map(|s| format!(" '{}'", s)).unwrap_or_default())]
    InvalidOid {
        kind: OidErrorKind,
        input: Option<Box<str>>,
    },

    /// Fatal configuration problem.
    ///
    /// Malformed directives are not fatal and never produce this error; they
    /// are logged and the partial entry is kept.
    #[error("configuration error{}: {message}", path.as_ref().map(|p| format!(" in {}:{}", p.display(), line)).unwrap_or_default())]
    Config {
        path: Option<PathBuf>,
        line: usize,
        message: Box<str>,
    },

    /// The subtree table could not be allocated.
    #[error("cannot allocate subtree table for {requested} entries")]
    Allocation { requested: usize },

    /// The agent was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Box this error (convenience for constructing boxed errors).
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Create a configuration error that is not tied to a file position.
    pub fn config(message: impl Into<Box<str>>) -> Self {
        Self::Config {
            path: None,
            line: 0,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid { kind, input: None }
    }

    pub(crate) fn invalid_oid_with_input(kind: OidErrorKind, input: impl Into<Box<str>>) -> Self {
        Self::InvalidOid {
            kind,
            input: Some(input.into()),
        }
    }
}

/// SNMP protocol error status codes (RFC 3416).
///
/// The agent writes these into the `error-status` field of a Response PDU.
/// SNMPv1 only knows codes 0-5; use [`ErrorStatus::to_v1`] before answering
/// a v1 request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// Unknown status code.
    Unknown(i32),
}

impl ErrorStatus {
    /// Create from raw status code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            other => Self::Unknown(other),
        }
    }

    /// Convert to raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::Unknown(code) => *code,
        }
    }

    /// Map a v2c status onto the closest SNMPv1 code (RFC 2576 Section 4.3).
    pub fn to_v1(self) -> Self {
        match self {
            Self::NoError
            | Self::TooBig
            | Self::NoSuchName
            | Self::BadValue
            | Self::ReadOnly
            | Self::GenErr => self,
            Self::WrongValue
            | Self::WrongEncoding
            | Self::WrongType
            | Self::WrongLength
            | Self::InconsistentValue => Self::BadValue,
            Self::NoAccess
            | Self::NotWritable
            | Self::NoCreation
            | Self::InconsistentName
            | Self::AuthorizationError => Self::NoSuchName,
            Self::ResourceUnavailable
            | Self::CommitFailed
            | Self::UndoFailed
            | Self::Unknown(_) => Self::GenErr,
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => write!(f, "noError"),
            Self::TooBig => write!(f, "tooBig"),
            Self::NoSuchName => write!(f, "noSuchName"),
            Self::BadValue => write!(f, "badValue"),
            Self::ReadOnly => write!(f, "readOnly"),
            Self::GenErr => write!(f, "genErr"),
            Self::NoAccess => write!(f, "noAccess"),
            Self::WrongType => write!(f, "wrongType"),
            Self::WrongLength => write!(f, "wrongLength"),
            Self::WrongEncoding => write!(f, "wrongEncoding"),
            Self::WrongValue => write!(f, "wrongValue"),
            Self::NoCreation => write!(f, "noCreation"),
            Self::InconsistentValue => write!(f, "inconsistentValue"),
            Self::ResourceUnavailable => write!(f, "resourceUnavailable"),
            Self::CommitFailed => write!(f, "commitFailed"),
            Self::UndoFailed => write!(f, "undoFailed"),
            Self::AuthorizationError => write!(f, "authorizationError"),
            Self::NotWritable => write!(f, "notWritable"),
            Self::InconsistentName => write!(f, "inconsistentName"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}
