//! SNMP value types (RFC 2578 SMI plus the RFC 3416 exception values).

use crate::ber::{
    Decoder, EncodeBuf, integer_content_len, tag, tlv_len, unsigned_content_len,
};
use crate::error::{DecodeErrorKind, Result};
use crate::oid::Oid;
use bytes::Bytes;

/// SNMP value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    Integer(i32),
    OctetString(Bytes),
    Null,
    ObjectIdentifier(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    /// Hundredths of a second.
    TimeTicks(u32),
    Opaque(Bytes),
    Counter64(u64),
    /// v2c exception: no object exists at this OID.
    NoSuchObject,
    /// v2c exception: the object exists but this instance does not.
    NoSuchInstance,
    /// v2c exception: GETNEXT ran off the end of the MIB.
    EndOfMibView,
    /// Unrecognized tag, kept verbatim.
    Unknown { tag: u8, data: Bytes },
}

impl Value {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(*v),
            Value::Integer(v) if *v >= 0 => Some(*v as u32),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(v) | Value::Opaque(v) => Some(v),
            _ => None,
        }
    }

    /// OCTET STRING contents as UTF-8, if valid.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::OctetString(v) => std::str::from_utf8(v).ok(),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Value::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    /// Returns `true` for the three v2c exception values.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Short SMI type keyword, as used by the pass-through protocol.
    pub fn type_keyword(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::OctetString(_) => "string",
            Value::Null => "null",
            Value::ObjectIdentifier(_) => "objectid",
            Value::IpAddress(_) => "ipaddress",
            Value::Counter32(_) => "counter",
            Value::Gauge32(_) => "gauge",
            Value::TimeTicks(_) => "timeticks",
            Value::Opaque(_) => "opaque",
            Value::Counter64(_) => "counter64",
            Value::NoSuchObject => "noSuchObject",
            Value::NoSuchInstance => "noSuchInstance",
            Value::EndOfMibView => "endOfMibView",
            Value::Unknown { .. } => "unknown",
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Integer(v) => buf.push_integer(*v),
            Value::OctetString(data) => buf.push_octet_string(data),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned(tag::application::COUNTER32, u64::from(*v)),
            Value::Gauge32(v) => buf.push_unsigned(tag::application::GAUGE32, u64::from(*v)),
            Value::TimeTicks(v) => buf.push_unsigned(tag::application::TIMETICKS, u64::from(*v)),
            Value::Opaque(data) => {
                buf.push_bytes(data);
                buf.push_length(data.len());
                buf.push_tag(tag::application::OPAQUE);
            }
            Value::Counter64(v) => buf.push_unsigned(tag::application::COUNTER64, *v),
            Value::NoSuchObject => buf.push_empty(tag::context::NO_SUCH_OBJECT),
            Value::NoSuchInstance => buf.push_empty(tag::context::NO_SUCH_INSTANCE),
            Value::EndOfMibView => buf.push_empty(tag::context::END_OF_MIB_VIEW),
            Value::Unknown { tag, data } => {
                buf.push_bytes(data);
                buf.push_length(data.len());
                buf.push_tag(*tag);
            }
        }
    }

    /// Encoded TLV size in bytes, computed without encoding.
    pub fn ber_encoded_len(&self) -> usize {
        let content = match self {
            Value::Integer(v) => integer_content_len(*v),
            Value::OctetString(data) | Value::Opaque(data) => data.len(),
            Value::Unknown { data, .. } => data.len(),
            Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => 0,
            Value::ObjectIdentifier(oid) => oid.ber_content_len(),
            Value::IpAddress(_) => 4,
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => {
                unsigned_content_len(u64::from(*v))
            }
            Value::Counter64(v) => unsigned_content_len(*v),
        };
        tlv_len(content)
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let tag = decoder.read_tag()?;
        let len = decoder.read_length()?;

        match tag {
            tag::universal::INTEGER => decoder.read_integer_value(len).map(Value::Integer),
            tag::universal::OCTET_STRING => decoder.read_bytes(len).map(Value::OctetString),
            tag::universal::NULL => decoder.read_empty_value(len).map(|()| Value::Null),
            tag::universal::OBJECT_IDENTIFIER => {
                decoder.read_oid_value(len).map(Value::ObjectIdentifier)
            }
            tag::application::IP_ADDRESS => {
                decoder.read_ip_address_value(len).map(Value::IpAddress)
            }
            tag::application::COUNTER32 => decoder.read_unsigned32_value(len).map(Value::Counter32),
            tag::application::GAUGE32 => decoder.read_unsigned32_value(len).map(Value::Gauge32),
            tag::application::TIMETICKS => decoder.read_unsigned32_value(len).map(Value::TimeTicks),
            tag::application::OPAQUE => decoder.read_bytes(len).map(Value::Opaque),
            tag::application::COUNTER64 => {
                decoder.read_unsigned64_value(len).map(Value::Counter64)
            }
            tag::context::NO_SUCH_OBJECT => {
                decoder.read_empty_value(len).map(|()| Value::NoSuchObject)
            }
            tag::context::NO_SUCH_INSTANCE => {
                decoder.read_empty_value(len).map(|()| Value::NoSuchInstance)
            }
            tag::context::END_OF_MIB_VIEW => {
                decoder.read_empty_value(len).map(|()| Value::EndOfMibView)
            }
            0x24 => Err(decoder.error(DecodeErrorKind::UnexpectedTag {
                expected: tag::universal::OCTET_STRING,
                actual: tag,
            })),
            _ => {
                let data = decoder.read_bytes(len)?;
                Ok(Value::Unknown { tag, data })
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::OctetString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "{}", s),
                Err(_) => {
                    for b in data.iter() {
                        write!(f, "{:02x}", b)?;
                    }
                    Ok(())
                }
            },
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::IpAddress([a, b, c, d]) => write!(f, "{}.{}.{}.{}", a, b, c, d),
            Value::Counter32(v) | Value::Gauge32(v) => write!(f, "{}", v),
            Value::TimeTicks(v) => write!(f, "{}", v),
            Value::Opaque(data) => write!(f, "Opaque({} bytes)", data.len()),
            Value::Counter64(v) => write!(f, "{}", v),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
            Value::Unknown { tag, data } => {
                write!(f, "Unknown(tag=0x{:02X}, {} bytes)", tag, data.len())
            }
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::OctetString(Bytes::from(s))
    }
}

impl From<&[u8]> for Value {
    fn from(data: &[u8]) -> Self {
        Value::OctetString(Bytes::copy_from_slice(data))
    }
}

impl From<Oid> for Value {
    fn from(oid: Oid) -> Self {
        Value::ObjectIdentifier(oid)
    }
}

impl From<std::net::Ipv4Addr> for Value {
    fn from(addr: std::net::Ipv4Addr) -> Self {
        Value::IpAddress(addr.octets())
    }
}
