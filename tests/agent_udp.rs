//! Agent round trips over UDP.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedRunner, TestAgent, UdpClient, system};
use extsnmpd::{Agent, AgentConfig, ErrorStatus, Oid, Pdu, PduType, Value, VarBind, oid};

async fn plain_agent() -> TestAgent {
    TestAgent::with_runner(
        "sysdescr unit test agent\nsyscontact ops@example.net\nsysname box1\nsyslocation rack 4\n",
        Arc::new(ScriptedRunner::new()),
    )
    .await
}

#[tokio::test]
async fn v2c_get_system_scalars() {
    let agent = plain_agent().await;
    let client = UdpClient::v2c(agent.addr()).await;

    let pdu = client.get(&[system(1), system(3), system(5)]).await;
    assert_eq!(pdu.pdu_type, PduType::Response);
    assert_eq!(pdu.error_status, 0);
    assert_eq!(pdu.varbinds[0].value, Value::from("unit test agent"));
    assert!(matches!(pdu.varbinds[1].value, Value::TimeTicks(_)));
    assert_eq!(pdu.varbinds[2].value, Value::from("box1"));
}

#[tokio::test]
async fn response_echoes_request_id_and_community() {
    let agent = plain_agent().await;
    let client = UdpClient::v2c(agent.addr()).await;

    let reply = client.send(Pdu::get_request(4242, &[system(1)])).await;
    assert_eq!(reply.pdu.request_id, 4242);
    assert_eq!(&reply.community[..], b"public");
}

#[tokio::test]
async fn v2c_exceptions_and_v1_errors() {
    let agent = plain_agent().await;

    let v2 = UdpClient::v2c(agent.addr()).await;
    let pdu = v2.get(&[oid!(1, 3, 6, 1, 2, 1, 1, 1, 5), oid!(1, 3, 6, 1, 99)]).await;
    assert_eq!(pdu.varbinds[0].value, Value::NoSuchInstance);
    assert_eq!(pdu.varbinds[1].value, Value::NoSuchObject);

    let v1 = UdpClient::v1(agent.addr()).await;
    let pdu = v1.get(&[system(1), oid!(1, 3, 6, 1, 99)]).await;
    assert_eq!(pdu.error_status(), ErrorStatus::NoSuchName);
    assert_eq!(pdu.error_index, 2);
}

#[tokio::test]
async fn walk_system_group() {
    let agent = plain_agent().await;
    let client = UdpClient::v2c(agent.addr()).await;

    let walked = client.walk(oid!(1, 3, 6, 1, 2, 1, 1)).await;
    let oids: Vec<Oid> = walked.iter().map(|vb| vb.oid.clone()).collect();
    assert_eq!(oids, (1..=6).map(system).collect::<Vec<_>>());
}

#[tokio::test]
async fn get_next_off_the_end() {
    let agent = plain_agent().await;

    let v2 = UdpClient::v2c(agent.addr()).await;
    let pdu = v2.get_next(&[oid!(1, 3, 6, 1, 9)]).await;
    assert_eq!(pdu.varbinds[0].value, Value::EndOfMibView);

    let v1 = UdpClient::v1(agent.addr()).await;
    let pdu = v1.get_next(&[oid!(1, 3, 6, 1, 9)]).await;
    assert_eq!(pdu.error_status(), ErrorStatus::NoSuchName);
}

#[tokio::test]
async fn set_then_get() {
    let agent = plain_agent().await;
    let client = UdpClient::v2c(agent.addr()).await;

    let pdu = client
        .set(vec![
            VarBind::new(system(6), Value::from("rack 9")),
            VarBind::new(system(4), Value::from("noc@example.net")),
        ])
        .await;
    assert_eq!(pdu.error_status, 0);
    assert_eq!(pdu.varbinds.len(), 2);

    assert_eq!(client.get_one(system(6)).await, Value::from("rack 9"));
    assert_eq!(client.get_one(system(4)).await, Value::from("noc@example.net"));
}

#[tokio::test]
async fn failed_set_is_atomic() {
    let agent = plain_agent().await;
    let client = UdpClient::v2c(agent.addr()).await;

    let pdu = client
        .set(vec![
            VarBind::new(system(6), Value::from("elsewhere")),
            VarBind::new(system(1), Value::from("not writable")),
        ])
        .await;
    assert_eq!(pdu.error_status(), ErrorStatus::NotWritable);
    assert_eq!(pdu.error_index, 2);
    assert_eq!(client.get_one(system(6)).await, Value::from("rack 4"));

    let v1 = UdpClient::v1(agent.addr()).await;
    let pdu = v1
        .set(vec![VarBind::new(system(5), Value::Integer(3))])
        .await;
    assert_eq!(pdu.error_status(), ErrorStatus::BadValue);
}

#[tokio::test]
async fn get_bulk_over_the_wire() {
    let agent = plain_agent().await;
    let client = UdpClient::v2c(agent.addr()).await;

    let pdu = client.get_bulk(0, 4, &[oid!(1, 3, 6, 1, 2, 1, 1)]).await;
    let oids: Vec<Oid> = pdu.varbinds.iter().map(|vb| vb.oid.clone()).collect();
    assert_eq!(oids, (1..=4).map(system).collect::<Vec<_>>());
}

#[tokio::test]
async fn get_bulk_is_ignored_in_v1() {
    let agent = plain_agent().await;
    let client = UdpClient::v1(agent.addr()).await;

    let reply = client
        .try_send(
            Pdu::get_bulk_request(1, 0, 4, &[oid!(1, 3)]),
            Duration::from_millis(300),
        )
        .await;
    assert!(reply.is_none());
}

#[tokio::test]
async fn oversized_response_becomes_too_big() {
    let long = "x".repeat(200);
    let agent = TestAgent::start(
        Agent::builder()
            .config(AgentConfig::from_text(&format!("sysdescr {}\n", long)))
            .max_message_size(150),
    )
    .await;
    let client = UdpClient::v2c(agent.addr()).await;

    let pdu = client.get(&[system(1)]).await;
    assert_eq!(pdu.error_status(), ErrorStatus::TooBig);
    assert!(pdu.varbinds.is_empty());
}

#[tokio::test]
async fn garbage_is_dropped_and_agent_keeps_serving() {
    let agent = plain_agent().await;
    let client = UdpClient::v2c(agent.addr()).await;

    client.send_raw(&[0x30, 0x03, 0x02, 0x01]).await;
    client.send_raw(b"definitely not BER").await;
    assert!(client.recv(Duration::from_millis(200)).await.is_none());

    assert_eq!(client.get_one(system(5)).await, Value::from("box1"));
}

#[tokio::test]
async fn stops_when_cancelled() {
    let agent = plain_agent().await;
    let client = UdpClient::v2c(agent.addr()).await;
    assert_eq!(client.get_one(system(5)).await, Value::from("box1"));

    agent.stop();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let reply = client
        .try_send(
            Pdu::get_request(1, &[system(5)]),
            Duration::from_millis(300),
        )
        .await;
    assert!(reply.is_none());
}
