//! BER length octets (X.690 Section 8.1.3).
//!
//! Short form for 0-127, long form with up to four length octets otherwise.
//! The indefinite form is rejected, as net-snmp does.

use crate::error::DecodeErrorKind;

/// Largest content length accepted from the wire.
///
/// A UDP datagram can never carry more than 64 KiB, so anything above this
/// is a corrupt or hostile length field.
pub const MAX_LENGTH: usize = 0x10000;

/// Number of octets needed to encode `len`.
pub fn encoded_length_len(len: usize) -> usize {
    match len {
        0..=0x7F => 1,
        0x80..=0xFF => 2,
        0x100..=0xFFFF => 3,
        0x1_0000..=0xFF_FFFF => 4,
        _ => 5,
    }
}

/// Encode `len`, returning the octets in wire order.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut buf = [0u8; 5];
    let total = encoded_length_len(len);

    if total == 1 {
        buf[0] = len as u8;
        return (buf, 1);
    }

    let octets = total - 1;
    buf[0] = 0x80 | octets as u8;
    for i in 0..octets {
        buf[1 + i] = (len >> (8 * (octets - 1 - i))) as u8;
    }
    (buf, total)
}

/// Decode a length, returning `(length, octets consumed)`.
pub fn decode_length(data: &[u8]) -> Result<(usize, usize), DecodeErrorKind> {
    let Some(&first) = data.first() else {
        return Err(DecodeErrorKind::TruncatedData);
    };

    if first == 0x80 {
        return Err(DecodeErrorKind::IndefiniteLength);
    }
    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let octets = (first & 0x7F) as usize;
    if octets > 4 {
        return Err(DecodeErrorKind::LengthTooLong { octets });
    }
    let Some(body) = data.get(1..1 + octets) else {
        return Err(DecodeErrorKind::TruncatedData);
    };

    let len = body.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
    if len > MAX_LENGTH {
        return Err(DecodeErrorKind::LengthExceedsMax {
            length: len,
            max: MAX_LENGTH,
        });
    }

    Ok((len, 1 + octets))
}
