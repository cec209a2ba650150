//! Minimal SNMP client over a raw UDP socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use bytes::Bytes;
use extsnmpd::{CommunityMessage, Oid, Pdu, Value, VarBind, Version};
use tokio::net::UdpSocket;

const TIMEOUT: Duration = Duration::from_secs(3);

pub struct UdpClient {
    socket: UdpSocket,
    target: SocketAddr,
    version: Version,
    community: Bytes,
    next_id: AtomicI32,
}

impl UdpClient {
    pub async fn v2c(target: SocketAddr) -> Self {
        Self::new(target, Version::V2c).await
    }

    pub async fn v1(target: SocketAddr) -> Self {
        Self::new(target, Version::V1).await
    }

    async fn new(target: SocketAddr, version: Version) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind client socket");
        Self {
            socket,
            target,
            version,
            community: Bytes::from_static(b"public"),
            next_id: AtomicI32::new(1),
        }
    }

    pub fn request_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send a PDU and wait for the response message.
    pub async fn send(&self, pdu: Pdu) -> CommunityMessage {
        self.try_send(pdu, TIMEOUT)
            .await
            .expect("no response from agent")
    }

    /// Send a PDU; `None` if nothing comes back within `wait`.
    pub async fn try_send(&self, pdu: Pdu, wait: Duration) -> Option<CommunityMessage> {
        let msg = CommunityMessage::new(self.version, self.community.clone(), pdu);
        self.send_raw(&msg.encode()).await;
        let reply = self.recv(wait).await?;
        Some(CommunityMessage::decode(reply).expect("agent sent malformed response"))
    }

    pub async fn send_raw(&self, data: &[u8]) {
        self.socket.send_to(data, self.target).await.expect("send");
    }

    pub async fn recv(&self, wait: Duration) -> Option<Bytes> {
        let mut buf = vec![0u8; 65535];
        let (len, _) = tokio::time::timeout(wait, self.socket.recv_from(&mut buf))
            .await
            .ok()?
            .expect("recv");
        buf.truncate(len);
        Some(Bytes::from(buf))
    }

    pub async fn get(&self, oids: &[Oid]) -> Pdu {
        self.send(Pdu::get_request(self.request_id(), oids)).await.pdu
    }

    pub async fn get_one(&self, oid: Oid) -> Value {
        let pdu = self.get(&[oid]).await;
        assert_eq!(pdu.error_status, 0, "GET failed: {:?}", pdu);
        pdu.varbinds.into_iter().next().expect("one varbind").value
    }

    pub async fn get_next(&self, oids: &[Oid]) -> Pdu {
        self.send(Pdu::get_next_request(self.request_id(), oids))
            .await
            .pdu
    }

    pub async fn get_bulk(&self, non_repeaters: i32, max_repetitions: i32, oids: &[Oid]) -> Pdu {
        self.send(Pdu::get_bulk_request(
            self.request_id(),
            non_repeaters,
            max_repetitions,
            oids,
        ))
        .await
        .pdu
    }

    pub async fn set(&self, varbinds: Vec<VarBind>) -> Pdu {
        self.send(Pdu::set_request(self.request_id(), varbinds))
            .await
            .pdu
    }

    /// GETNEXT from `start` until leaving the `start` subtree or the MIB.
    pub async fn walk(&self, start: Oid) -> Vec<VarBind> {
        let mut out = Vec::new();
        let mut cursor = start.clone();
        loop {
            let pdu = self.get_next(&[cursor.clone()]).await;
            if pdu.error_status != 0 {
                break;
            }
            let Some(vb) = pdu.varbinds.into_iter().next() else {
                break;
            };
            if vb.value == Value::EndOfMibView || !vb.oid.starts_with(&start) {
                break;
            }
            assert!(vb.oid > cursor, "walk did not advance at {}", cursor);
            cursor = vb.oid.clone();
            out.push(vb);
        }
        out
    }
}
