//! End-to-end tests for the privileged `/admin` API.

// Test code is allowed to use expect/unwrap and indexing for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use clipboard_hub::actors::{Admission, ChannelHandle, Outbound};
use clipboard_hub::protocol::{admin_ban_reason, KickNotice, REJECTED_BANNED_REASON};
use hub_test_utils::{basic_auth_header, TestHubServer};
use serde_json::{json, Value};

#[tokio::test]
async fn test_admin_requires_basic_auth() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let client = reqwest::Client::new();

    for path in ["/admin/devices", "/admin/blacklist"] {
        let response = client.get(format!("{}{}", server.url(), path)).send().await?;
        assert_eq!(response.status(), 401);
        assert_eq!(
            response
                .headers()
                .get("www-authenticate")
                .and_then(|v| v.to_str().ok()),
            Some("Basic realm=\"Admin Access\"")
        );

        let response = client
            .get(format!("{}{}", server.url(), path))
            .header("authorization", basic_auth_header("test-admin", "nope"))
            .send()
            .await?;
        assert_eq!(response.status(), 401);
    }
    Ok(())
}

#[tokio::test]
async fn test_devices_lists_connected_sessions() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;

    let (channel, _rx) = ChannelHandle::new("sess-1", "10.1.1.1");
    assert_eq!(server.hub().admit(channel).await?, Admission::Accepted);

    let body: Value = reqwest::Client::new()
        .get(format!("{}/admin/devices", server.url()))
        .header("authorization", server.admin_auth_header())
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body[0]["id"], "sess-1");
    assert_eq!(body[0]["ip"], "10.1.1.1");
    assert!(body[0]["connectedAt"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_admin_ban_closes_matching_devices_only() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;

    let (a, mut a_rx) = ChannelHandle::new("a", "1.2.3.4");
    let (b, mut b_rx) = ChannelHandle::new("b", "1.2.3.4");
    let (c, mut c_rx) = ChannelHandle::new("c", "5.6.7.8");
    for channel in [a, b, c] {
        assert_eq!(server.hub().admit(channel).await?, Admission::Accepted);
    }
    for rx in [&mut a_rx, &mut b_rx, &mut c_rx] {
        while rx.try_recv().is_ok() {}
    }

    let response = reqwest::Client::new()
        .post(format!("{}/admin/blacklist", server.url()))
        .header("authorization", server.admin_auth_header())
        .json(&json!({"ip": "1.2.3.4", "hours": 5}))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let kicked = Outbound::Kick(KickNotice {
        reason: admin_ban_reason(5.0),
    });
    assert_eq!(a_rx.try_recv().ok(), Some(kicked.clone()));
    assert_eq!(b_rx.try_recv().ok(), Some(kicked));
    assert!(matches!(c_rx.try_recv(), Ok(Outbound::Event(_))));

    let sessions = server.hub().list_sessions().await?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_id, "c");

    // New connections from the address are turned away.
    let (retry, _retry_rx) = ChannelHandle::new("a2", "1.2.3.4");
    assert_eq!(
        server.hub().admit(retry).await?,
        Admission::Rejected(KickNotice {
            reason: REJECTED_BANNED_REASON.to_string()
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_blacklist_listing_and_unban() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let client = reqwest::Client::new();
    let auth = server.admin_auth_header();

    for (ip, hours) in [("9.9.9.9", 720), ("1.1.1.1", 1)] {
        let response = client
            .post(format!("{}/admin/blacklist", server.url()))
            .header("authorization", &auth)
            .json(&json!({"ip": ip, "hours": hours}))
            .send()
            .await?;
        assert_eq!(response.status(), 200);
    }

    let body: Value = client
        .get(format!("{}/admin/blacklist", server.url()))
        .header("authorization", &auth)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body[0]["ip"], "1.1.1.1");
    assert_eq!(body[0]["remainingHours"], 1.0);
    assert_eq!(body[1]["ip"], "9.9.9.9");
    assert_eq!(body[1]["remainingHours"], 720.0);

    let response = client
        .delete(format!("{}/admin/blacklist/1.1.1.1", server.url()))
        .header("authorization", &auth)
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let response = client
        .delete(format!("{}/admin/blacklist/1.1.1.1", server.url()))
        .header("authorization", &auth)
        .send()
        .await?;
    assert_eq!(response.status(), 404);

    let denials = server.hub().list_denials().await?;
    assert_eq!(denials.len(), 1);
    assert_eq!(denials[0].ip, "9.9.9.9");
    Ok(())
}

#[tokio::test]
async fn test_ban_duration_out_of_range() -> Result<(), anyhow::Error> {
    let server = TestHubServer::spawn().await?;
    let client = reqwest::Client::new();

    for hours in [0.5, 721.0] {
        let response = client
            .post(format!("{}/admin/blacklist", server.url()))
            .header("authorization", server.admin_auth_header())
            .json(&json!({"ip": "1.2.3.4", "hours": hours}))
            .send()
            .await?;
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await?;
        assert_eq!(body["error"], "Ban duration must be between 1 and 720 hours");
    }

    assert!(server.hub().list_denials().await?.is_empty());
    Ok(())
}
