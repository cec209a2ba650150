//! Request decoding and the read-side PDU handlers.

use std::net::SocketAddr;

use bytes::Bytes;

use crate::error::{ErrorStatus, Result};
use crate::message::CommunityMessage;
use crate::mib::Resolution;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::util::HexDump;
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;

use super::{Agent, MibView};

/// Conservative allowance for everything in a response except the
/// varbinds: message header, community and PDU fields.
pub(super) const RESPONSE_OVERHEAD: usize = 100;

impl Agent {
    /// Process one datagram and return the encoded response.
    ///
    /// Returns `None` when nothing should be sent back: a non-request PDU,
    /// or a GETBULK in a v1 message.
    pub(super) async fn handle_request(
        &self,
        data: Bytes,
        source: SocketAddr,
    ) -> Result<Option<Bytes>> {
        tracing::trace!(target: "extsnmpd::agent", { snmp.source = %source, bytes = data.len(), dump = %HexDump(&data) }, "received");

        let msg = CommunityMessage::decode_from_peer(data, source)?;
        let pdu = &msg.pdu;

        if !pdu.pdu_type.is_request() {
            tracing::debug!(target: "extsnmpd::agent", { snmp.source = %source, snmp.pdu_type = %pdu.pdu_type }, "ignoring non-request PDU");
            return Ok(None);
        }
        if pdu.pdu_type == PduType::GetBulkRequest && msg.version == Version::V1 {
            tracing::debug!(target: "extsnmpd::agent", { snmp.source = %source }, "GETBULK is not part of SNMPv1");
            return Ok(None);
        }

        tracing::debug!(target: "extsnmpd::agent", {
            snmp.source = %source,
            snmp.version = %msg.version,
            snmp.pdu_type = %pdu.pdu_type,
            snmp.request_id = pdu.request_id,
            snmp.oids = %OidList(&pdu.varbinds)
        }, "request");

        let view = self.view();
        let response = match pdu.pdu_type {
            PduType::GetRequest => handle_get(&view, pdu, msg.version).await,
            PduType::GetNextRequest => handle_get_next(&view, pdu, msg.version).await,
            PduType::GetBulkRequest => {
                handle_get_bulk(&view, pdu, self.inner.max_message_size).await
            }
            PduType::SetRequest => self.handle_set(&view, pdu, msg.version).await,
            PduType::Response => return Ok(None),
        };

        let encoded = self.encode_response(&msg, response);
        if let Some(bytes) = &encoded {
            tracing::trace!(target: "extsnmpd::agent", { snmp.source = %source, bytes = bytes.len(), dump = %HexDump(bytes) }, "sending");
        }
        Ok(encoded)
    }

    /// Encode `response`, falling back to an empty `tooBig` response when it
    /// does not fit. Returns `None` if not even that fits.
    fn encode_response(&self, request: &CommunityMessage, response: Pdu) -> Option<Bytes> {
        let max = self.inner.max_message_size;
        let encoded =
            CommunityMessage::new(request.version, request.community.clone(), response).encode();
        if encoded.len() <= max {
            return Some(encoded);
        }

        tracing::debug!(target: "extsnmpd::agent", { snmp.request_id = request.pdu.request_id, size = encoded.len(), max = max }, "response too big");
        let mut too_big = request.pdu.to_error_response(ErrorStatus::TooBig, 0);
        too_big.varbinds.clear();
        let encoded =
            CommunityMessage::new(request.version, request.community.clone(), too_big).encode();
        (encoded.len() <= max).then_some(encoded)
    }
}

/// Error response for an unresolved varbind in a v1 request.
fn no_such_name(pdu: &Pdu, index: usize) -> Pdu {
    pdu.to_error_response(ErrorStatus::NoSuchName, error_index(index))
}

/// 1-based error index for the varbind at `index`.
pub(super) fn error_index(index: usize) -> i32 {
    i32::try_from(index + 1).unwrap_or(i32::MAX)
}

pub(super) async fn handle_get(view: &MibView, pdu: &Pdu, version: Version) -> Pdu {
    let mut varbinds = Vec::with_capacity(pdu.varbinds.len());

    for (index, vb) in pdu.varbinds.iter().enumerate() {
        let value = match view.table.get(&vb.oid).await {
            Resolution::Found(found) => found.value,
            _ if version == Version::V1 => return no_such_name(pdu, index),
            Resolution::NoSuchInstance => Value::NoSuchInstance,
            Resolution::NoSuchObject | Resolution::EndOfMibView => Value::NoSuchObject,
        };
        varbinds.push(VarBind::new(vb.oid.clone(), value));
    }

    pdu.to_response(varbinds)
}

pub(super) async fn handle_get_next(view: &MibView, pdu: &Pdu, version: Version) -> Pdu {
    let mut varbinds = Vec::with_capacity(pdu.varbinds.len());

    for (index, vb) in pdu.varbinds.iter().enumerate() {
        match next_varbind(view, &vb.oid).await {
            Some(next) => varbinds.push(next),
            None if version == Version::V1 => return no_such_name(pdu, index),
            None => varbinds.push(VarBind::new(vb.oid.clone(), Value::EndOfMibView)),
        }
    }

    pdu.to_response(varbinds)
}

/// GETBULK (RFC 3416 section 4.2.3).
///
/// Varbinds are added until the next one would push the response past
/// `max_size`. If not even the first fits, the answer is `tooBig`.
pub(super) async fn handle_get_bulk(view: &MibView, pdu: &Pdu, max_size: usize) -> Pdu {
    let non_repeaters = usize::try_from(pdu.error_status.max(0)).unwrap_or(0);
    let max_repetitions = usize::try_from(pdu.error_index.max(0)).unwrap_or(0);

    let mut varbinds = Vec::new();
    let mut size = RESPONSE_OVERHEAD;

    let mut push = |vb: VarBind, varbinds: &mut Vec<VarBind>| -> bool {
        let vb_size = vb.encoded_size();
        if size + vb_size > max_size {
            return false;
        }
        size += vb_size;
        varbinds.push(vb);
        true
    };

    for vb in pdu.varbinds.iter().take(non_repeaters) {
        let next = next_varbind(view, &vb.oid)
            .await
            .unwrap_or_else(|| VarBind::new(vb.oid.clone(), Value::EndOfMibView));
        if !push(next, &mut varbinds) {
            if varbinds.is_empty() {
                return pdu.to_error_response(ErrorStatus::TooBig, 0);
            }
            return pdu.to_response(varbinds);
        }
    }

    let repeaters = pdu.varbinds.get(non_repeaters..).unwrap_or(&[]);
    let mut cursors: Vec<Oid> = repeaters.iter().map(|vb| vb.oid.clone()).collect();
    let mut exhausted = vec![false; cursors.len()];

    'rows: for _ in 0..max_repetitions {
        for (cursor, done) in cursors.iter_mut().zip(exhausted.iter_mut()) {
            let next = if *done {
                VarBind::new(cursor.clone(), Value::EndOfMibView)
            } else {
                match next_varbind(view, cursor).await {
                    Some(next) => {
                        *cursor = next.oid.clone();
                        next
                    }
                    None => {
                        *done = true;
                        VarBind::new(cursor.clone(), Value::EndOfMibView)
                    }
                }
            };
            if !push(next, &mut varbinds) {
                if varbinds.is_empty() {
                    return pdu.to_error_response(ErrorStatus::TooBig, 0);
                }
                break 'rows;
            }
        }
        if exhausted.iter().all(|done| *done) {
            break;
        }
    }

    pdu.to_response(varbinds)
}

async fn next_varbind(view: &MibView, oid: &Oid) -> Option<VarBind> {
    view.table
        .get_next(oid)
        .await
        .found()
        .map(|found| VarBind::new(found.oid, found.value))
}

/// Space-separated OIDs of a varbind list, for debug logs.
struct OidList<'a>(&'a [VarBind]);

impl std::fmt::Display for OidList<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, vb) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", vb.oid)?;
        }
        Ok(())
    }
}
