//! End-to-end tests for the device WebSocket channel.
//!
//! Each test spawns a real server and connects real WebSocket clients.
//! `X-Forwarded-For` on the handshake picks the address the hub sees.

// Test code is allowed to use expect/unwrap and indexing for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use clipboard_hub::actors::KICK_NOT_FOUND_MESSAGE;
use clipboard_hub::protocol::{KICKED_REASON, REJECTED_BANNED_REASON};
use futures::{SinkExt, StreamExt};
use hub_test_utils::TestHubServer;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Device = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect_from(server: &TestHubServer, ip: &str) -> Device {
    let mut request = format!("ws://{}/ws", server.addr())
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("x-forwarded-for", HeaderValue::from_str(ip).unwrap());

    let (device, _response) = connect_async(request).await.unwrap();
    device
}

/// Next JSON event, or `None` once the server has closed the channel.
async fn next_event(device: &mut Device) -> Option<Value> {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, device.next())
            .await
            .expect("timed out waiting for a frame");

        match frame {
            Some(Ok(Message::Text(text))) => return Some(serde_json::from_str(&text).unwrap()),
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
            Some(Ok(_)) => {}
        }
    }
}

/// Skip events until one named `name` arrives.
async fn wait_for(device: &mut Device, name: &str) -> Value {
    loop {
        match next_event(device).await {
            Some(event) if event["event"] == name => return event,
            Some(_) => {}
            None => panic!("channel closed before {name}"),
        }
    }
}

/// Read until close, returning every event seen on the way.
async fn drain_until_closed(device: &mut Device) -> Vec<Value> {
    let mut events = Vec::new();
    while let Some(event) = next_event(device).await {
        events.push(event);
    }
    events
}

async fn send_json(device: &mut Device, value: Value) {
    device.send(Message::Text(value.to_string())).await.unwrap();
}

async fn session_id_for(server: &TestHubServer, ip: &str) -> String {
    server
        .hub()
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .find(|session| session.ip == ip)
        .map(|session| session.session_id)
        .unwrap()
}

async fn wait_for_session_count(server: &TestHubServer, expected: usize) {
    for _ in 0..50 {
        if server.hub().list_sessions().await.unwrap().len() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session count never reached {expected}");
}

#[tokio::test]
async fn test_admitted_device_gets_initial_sync() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let mut device = connect_from(&server, "10.0.0.1").await;

    let init = next_event(&mut device).await.unwrap();
    assert_eq!(init["event"], "init-clipboards");
    assert_eq!(init["data"][0]["id"], "default");

    let presence = next_event(&mut device).await.unwrap();
    assert_eq!(presence["event"], "devices-updated");
    assert_eq!(presence["data"][0]["ip"], "10.0.0.1");
    Ok(())
}

#[tokio::test]
async fn test_acked_update_replies_on_socket() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let mut device = connect_from(&server, "10.0.0.1").await;
    wait_for(&mut device, "devices-updated").await;

    send_json(
        &mut device,
        json!({"event": "update-clipboard", "data": {"id": "notes", "content": "hi"}, "ack": 7}),
    )
    .await;

    // The ack is written inline; the broadcast goes through the queue.
    let mut events = vec![
        next_event(&mut device).await.unwrap(),
        next_event(&mut device).await.unwrap(),
    ];
    events.sort_by_key(|event| event["event"].as_str().unwrap().to_string());

    assert_eq!(events[0], json!({"event": "ack", "data": {"id": 7, "success": true}}));
    assert_eq!(events[1]["event"], "clipboard-updated");
    assert_eq!(events[1]["data"][1]["id"], "notes");
    Ok(())
}

#[tokio::test]
async fn test_kick_of_unknown_device_acks_failure() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let mut device = connect_from(&server, "10.0.0.1").await;
    wait_for(&mut device, "devices-updated").await;

    send_json(
        &mut device,
        json!({"event": "kick-device", "data": "no-such-device", "ack": 3}),
    )
    .await;

    let ack = wait_for(&mut device, "ack").await;
    assert_eq!(ack["data"]["id"], 3);
    assert_eq!(ack["data"]["success"], false);
    assert_eq!(ack["data"]["error"], KICK_NOT_FOUND_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn test_kicked_is_last_frame_and_address_is_rejected_after() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let mut a = connect_from(&server, "1.1.1.1").await;
    wait_for(&mut a, "devices-updated").await;
    let mut b = connect_from(&server, "2.2.2.2").await;
    wait_for(&mut b, "devices-updated").await;

    let target = session_id_for(&server, "2.2.2.2").await;
    send_json(
        &mut a,
        json!({"event": "kick-device", "data": target, "ack": 1}),
    )
    .await;

    let ack = wait_for(&mut a, "ack").await;
    assert_eq!(ack, json!({"event": "ack", "data": {"id": 1, "success": true}}));

    let events = drain_until_closed(&mut b).await;
    let last = events.last().unwrap();
    assert_eq!(last["event"], "kicked");
    assert_eq!(last["data"]["reason"], KICKED_REASON);

    wait_for_session_count(&server, 1).await;

    // Reconnecting from the kicked address is refused at admission.
    let mut again = connect_from(&server, "2.2.2.2").await;
    let events = drain_until_closed(&mut again).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "kicked");
    assert_eq!(events[0]["data"]["reason"], REJECTED_BANNED_REASON);

    let sessions = server.hub().list_sessions().await?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].ip, "1.1.1.1");
    Ok(())
}

#[tokio::test]
async fn test_client_close_unregisters_and_announces() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let mut stays = connect_from(&server, "10.0.0.1").await;
    wait_for(&mut stays, "devices-updated").await;
    let mut leaves = connect_from(&server, "10.0.0.2").await;
    wait_for(&mut leaves, "devices-updated").await;

    let presence = wait_for(&mut stays, "devices-updated").await;
    assert_eq!(presence["data"].as_array().unwrap().len(), 2);

    leaves.close(None).await?;

    let presence = wait_for(&mut stays, "devices-updated").await;
    assert_eq!(presence["data"].as_array().unwrap().len(), 1);
    assert_eq!(presence["data"][0]["ip"], "10.0.0.1");
    wait_for_session_count(&server, 1).await;
    Ok(())
}

#[tokio::test]
async fn test_undecodable_frame_is_dropped_without_closing() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let mut device = connect_from(&server, "10.0.0.1").await;
    wait_for(&mut device, "devices-updated").await;

    device.send(Message::Text("not json".to_string())).await?;
    send_json(
        &mut device,
        json!({"event": "delete-clipboard", "data": "missing", "ack": 2}),
    )
    .await;

    let ack = wait_for(&mut device, "ack").await;
    assert_eq!(ack["data"]["id"], 2);
    assert_eq!(ack["data"]["success"], true);
    assert_eq!(server.hub().list_sessions().await?.len(), 1);
    Ok(())
}
