//! Fine-grained causes behind [`Error::MalformedRequest`](super::Error) and
//! [`Error::InvalidOid`](super::Error).
//!
//! A datagram that fails to decode is dropped, so the only place these show
//! up is the debug log line written at the point of failure.

use std::fmt;

/// Why a datagram could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// A TLV carried the wrong tag for its position in the message.
    UnexpectedTag { expected: u8, actual: u8 },
    /// The datagram ended inside a TLV header.
    TruncatedData,
    /// A TLV header claimed more content than the datagram holds.
    InsufficientData { needed: usize, available: usize },
    /// A nested TLV ran past the end of its parent.
    TlvOverflow,
    IndefiniteLength,
    LengthTooLong { octets: usize },
    LengthExceedsMax { length: usize, max: usize },
    ZeroLengthInteger,
    Integer64TooLong { length: usize },
    InvalidNull,
    InvalidOidEncoding,
    InvalidIpAddressLength { length: usize },
    /// Not v1 or v2c.
    UnknownVersion(i32),
    UnknownPduType(u8),
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "tag 0x{actual:02x} where 0x{expected:02x} belongs")
            }
            Self::TruncatedData => f.write_str("datagram ends mid-header"),
            Self::InsufficientData { needed, available } => {
                write!(f, "content of {needed} bytes, {available} left")
            }
            Self::TlvOverflow => f.write_str("nested value overruns its container"),
            Self::IndefiniteLength => f.write_str("indefinite length"),
            Self::LengthTooLong { octets } => write!(f, "{octets}-octet length field"),
            Self::LengthExceedsMax { length, max } => {
                write!(f, "length {length} over limit {max}")
            }
            Self::ZeroLengthInteger => f.write_str("empty INTEGER"),
            Self::Integer64TooLong { length } => write!(f, "{length}-byte Counter64"),
            Self::InvalidNull => f.write_str("NULL with content"),
            Self::InvalidOidEncoding => f.write_str("bad OBJECT IDENTIFIER encoding"),
            Self::InvalidIpAddressLength { length } => write!(f, "{length}-byte IpAddress"),
            Self::UnknownVersion(version) => write!(f, "version {version} not served"),
            Self::UnknownPduType(tag) => write!(f, "PDU tag 0x{tag:02x} not served"),
        }
    }
}

/// Why an OID was rejected, either from text or from construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidErrorKind {
    Empty,
    /// A dotted component is not a 32-bit number.
    InvalidArc,
    InvalidFirstArc(u32),
    InvalidSecondArc { first: u32, second: u32 },
    TooManyArcs { count: usize, max: usize },
}

impl fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Empty => f.write_str("no arcs"),
            Self::InvalidArc => f.write_str("component is not a 32-bit number"),
            Self::InvalidFirstArc(arc) => write!(f, "first arc {arc} is not 0, 1 or 2"),
            Self::InvalidSecondArc { first, second } => {
                write!(f, "second arc {second} not allowed under {first}")
            }
            Self::TooManyArcs { count, max } => write!(f, "{count} arcs, limit {max}"),
        }
    }
}
