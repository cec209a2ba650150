//! BER (Basic Encoding Rules) codec for the SNMP subset of ASN.1.
//!
//! Encoding builds messages back to front in [`EncodeBuf`], so every length
//! is known when it is written. Decoding is zero-copy over [`bytes::Bytes`].

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::Decoder;
pub use encode::{EncodeBuf, integer_content_len, tlv_len, unsigned_content_len};
pub use length::{MAX_LENGTH, decode_length, encode_length, encoded_length_len};
