//! SNMP Protocol Data Units handled by the agent.

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, ErrorStatus, Result};
use crate::oid::Oid;
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list};

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PduType {
    GetRequest = 0xA0,
    GetNextRequest = 0xA1,
    Response = 0xA2,
    SetRequest = 0xA3,
    GetBulkRequest = 0xA5,
}

impl PduType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0xA0 => Some(Self::GetRequest),
            0xA1 => Some(Self::GetNextRequest),
            0xA2 => Some(Self::Response),
            0xA3 => Some(Self::SetRequest),
            0xA5 => Some(Self::GetBulkRequest),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Returns `true` for PDUs an agent answers.
    pub fn is_request(self) -> bool {
        !matches!(self, Self::Response)
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GetRequest => write!(f, "GET"),
            Self::GetNextRequest => write!(f, "GETNEXT"),
            Self::Response => write!(f, "RESPONSE"),
            Self::SetRequest => write!(f, "SET"),
            Self::GetBulkRequest => write!(f, "GETBULK"),
        }
    }
}

/// Request/response PDU.
///
/// For GETBULK, `error_status` carries non-repeaters and `error_index`
/// carries max-repetitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub pdu_type: PduType,
    pub request_id: i32,
    pub error_status: i32,
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    fn request(pdu_type: PduType, request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    pub fn get_request(request_id: i32, oids: &[Oid]) -> Self {
        let varbinds = oids.iter().cloned().map(VarBind::null).collect();
        Self::request(PduType::GetRequest, request_id, varbinds)
    }

    pub fn get_next_request(request_id: i32, oids: &[Oid]) -> Self {
        let varbinds = oids.iter().cloned().map(VarBind::null).collect();
        Self::request(PduType::GetNextRequest, request_id, varbinds)
    }

    pub fn set_request(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self::request(PduType::SetRequest, request_id, varbinds)
    }

    pub fn get_bulk_request(
        request_id: i32,
        non_repeaters: i32,
        max_repetitions: i32,
        oids: &[Oid],
    ) -> Self {
        let mut pdu = Self::get_next_request(request_id, oids);
        pdu.pdu_type = PduType::GetBulkRequest;
        pdu.error_status = non_repeaters;
        pdu.error_index = max_repetitions;
        pdu
    }

    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }

    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let tag = decoder.read_tag()?;
        let Some(pdu_type) = PduType::from_tag(tag) else {
            return Err(decoder.error(DecodeErrorKind::UnknownPduType(tag)));
        };

        let len = decoder.read_length()?;
        let mut body = decoder.sub_decoder(len)?;

        let request_id = body.read_integer()?;
        let error_status = body.read_integer()?;
        let error_index = body.read_integer()?;
        let varbinds = decode_varbind_list(&mut body)?;

        Ok(Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    pub fn error_status(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }

    /// A Response carrying `varbinds` and no error.
    pub fn to_response(&self, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// A Response echoing the request varbinds with an error status.
    ///
    /// `error_index` is 1-based; 0 means the error is not tied to a varbind.
    pub fn to_error_response(&self, status: ErrorStatus, error_index: i32) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: status.as_i32(),
            error_index,
            varbinds: self.varbinds.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::value::Value;

    #[test]
    fn decode_get_request() {
        let pdu = Pdu::get_request(7, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let mut buf = EncodeBuf::new();
        pdu.encode(&mut buf);
        let bytes = buf.finish();
        assert_eq!(bytes[0], 0xA0);

        let decoded = Pdu::decode(&mut Decoder::new(bytes)).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn trap_pdus_are_rejected() {
        let mut dec = Decoder::from_slice(&[0xA4, 0x00]);
        assert!(Pdu::decode(&mut dec).is_err());
    }

    #[test]
    fn error_response_echoes_varbinds() {
        let request = Pdu::set_request(
            99,
            vec![VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 4, 0), Value::Integer(1))],
        );
        let response = request.to_error_response(ErrorStatus::WrongType, 1);
        assert_eq!(response.pdu_type, PduType::Response);
        assert_eq!(response.request_id, 99);
        assert_eq!(response.error_status(), ErrorStatus::WrongType);
        assert_eq!(response.error_index, 1);
        assert_eq!(response.varbinds, request.varbinds);
    }

    #[test]
    fn bulk_parameters_ride_in_error_fields() {
        let pdu = Pdu::get_bulk_request(1, 1, 10, &[oid!(1, 3, 6)]);
        assert_eq!(pdu.pdu_type, PduType::GetBulkRequest);
        assert_eq!((pdu.error_status, pdu.error_index), (1, 10));
    }
}
