//! BER encoding.
//!
//! [`EncodeBuf`] accumulates octets in reverse. Fields of a constructed type
//! are therefore pushed last-to-first, and the tag and length are prepended
//! once the content size is known.

use bytes::Bytes;

use super::length::{encode_length, encoded_length_len};
use super::tag;
use crate::oid::Oid;

/// Reverse-building BER encoder.
#[derive(Debug, Default)]
pub struct EncodeBuf {
    buf: Vec<u8>,
}

impl EncodeBuf {
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of octets written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Prepend raw octets (given in wire order).
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buf.extend(data.iter().rev());
    }

    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    pub fn push_length(&mut self, len: usize) {
        let (octets, n) = encode_length(len);
        self.push_bytes(&octets[..n]);
    }

    /// Prepend a constructed TLV whose content is produced by `f`.
    pub fn push_constructed(&mut self, tag: u8, f: impl FnOnce(&mut Self)) {
        let start = self.buf.len();
        f(self);
        let content_len = self.buf.len() - start;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    pub fn push_sequence(&mut self, f: impl FnOnce(&mut Self)) {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    pub fn push_integer(&mut self, value: i32) {
        let bytes = value.to_be_bytes();
        let skip = 4 - integer_content_len(value);
        self.push_bytes(&bytes[skip..]);
        self.push_length(4 - skip);
        self.push_tag(tag::universal::INTEGER);
    }

    /// Prepend an unsigned integer with an application tag (Counter32, Gauge32, ...).
    pub fn push_unsigned(&mut self, tag: u8, value: u64) {
        let content_len = unsigned_content_len(value);
        let bytes = value.to_be_bytes();
        if content_len > 8 {
            self.push_bytes(&bytes);
            self.push_bytes(&[0]);
        } else {
            self.push_bytes(&bytes[8 - content_len..]);
        }
        self.push_length(content_len);
        self.push_tag(tag);
    }

    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_bytes(data);
        self.push_length(data.len());
        self.push_tag(tag::universal::OCTET_STRING);
    }

    /// Prepend an empty TLV with the given tag (NULL and v2c exceptions).
    pub fn push_empty(&mut self, tag: u8) {
        self.push_length(0);
        self.push_tag(tag);
    }

    pub fn push_null(&mut self) {
        self.push_empty(tag::universal::NULL);
    }

    pub fn push_oid(&mut self, oid: &Oid) {
        let content = oid.to_ber_smallvec();
        self.push_bytes(&content);
        self.push_length(content.len());
        self.push_tag(tag::universal::OBJECT_IDENTIFIER);
    }

    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_bytes(&addr);
        self.push_length(4);
        self.push_tag(tag::application::IP_ADDRESS);
    }

    /// Consume the buffer and return the octets in wire order.
    pub fn finish(self) -> Bytes {
        let mut buf = self.buf;
        buf.reverse();
        Bytes::from(buf)
    }
}

/// Minimal two's-complement content length of a signed integer.
pub fn integer_content_len(value: i32) -> usize {
    let bytes = value.to_be_bytes();
    let mut len = 4;
    while len > 1 {
        let lead = bytes[4 - len];
        let next = bytes[5 - len];
        let redundant = (lead == 0x00 && next & 0x80 == 0) || (lead == 0xFF && next & 0x80 != 0);
        if !redundant {
            break;
        }
        len -= 1;
    }
    len
}

/// Content length of an unsigned integer, including a leading zero when
/// the top bit would otherwise read as a sign.
pub fn unsigned_content_len(value: u64) -> usize {
    let significant = (8 - (value.leading_zeros() / 8) as usize).max(1);
    let top = (value >> (8 * (significant - 1))) as u8;
    if top & 0x80 != 0 {
        significant + 1
    } else {
        significant
    }
}

/// Total TLV length for a content length.
pub fn tlv_len(content_len: usize) -> usize {
    1 + encoded_length_len(content_len) + content_len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(f: impl FnOnce(&mut EncodeBuf)) -> Vec<u8> {
        let mut buf = EncodeBuf::new();
        f(&mut buf);
        buf.finish().to_vec()
    }

    #[test]
    fn integers_are_minimal() {
        assert_eq!(encoded(|b| b.push_integer(0)), vec![0x02, 0x01, 0x00]);
        assert_eq!(encoded(|b| b.push_integer(127)), vec![0x02, 0x01, 0x7F]);
        assert_eq!(encoded(|b| b.push_integer(128)), vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(encoded(|b| b.push_integer(-1)), vec![0x02, 0x01, 0xFF]);
        assert_eq!(encoded(|b| b.push_integer(-129)), vec![0x02, 0x02, 0xFF, 0x7F]);
    }

    #[test]
    fn unsigned_gets_sign_padding() {
        assert_eq!(
            encoded(|b| b.push_unsigned(tag::application::GAUGE32, 0)),
            vec![0x42, 0x01, 0x00]
        );
        assert_eq!(
            encoded(|b| b.push_unsigned(tag::application::COUNTER32, 0xFFFF_FFFF)),
            vec![0x41, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            encoded(|b| b.push_unsigned(tag::application::COUNTER64, u64::MAX)).len(),
            2 + 9
        );
    }

    #[test]
    fn sequence_fields_are_pushed_in_reverse() {
        let bytes = encoded(|b| {
            b.push_sequence(|b| {
                b.push_integer(2);
                b.push_integer(1);
            })
        });
        assert_eq!(bytes, vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]);
    }

    #[test]
    fn tlv_len_accounts_for_long_form() {
        assert_eq!(tlv_len(0), 2);
        assert_eq!(tlv_len(200), 203);
        let bytes = encoded(|b| b.push_octet_string(&[b'x'; 200]));
        assert_eq!(bytes.len(), tlv_len(200));
    }
}
