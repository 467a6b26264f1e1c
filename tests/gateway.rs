//! End-to-end tests driving the gateway over real sockets: the REST
//! surface through an HTTP client and the `/ws` event stream through a
//! WebSocket client.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_test::assert_ok;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use referral_gateway::api;
use referral_gateway::app_state::AppState;
use referral_gateway::domain::{ClaimLedger, EventBus, MemberDirectory};
use referral_gateway::service::{ClaimService, NetworkService};
use referral_gateway::ws::handler::ws_handler;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Starts the gateway on an ephemeral port with in-memory stores, the
/// same wiring the binary uses minus persistence.
async fn spawn_gateway() -> SocketAddr {
    let directory = Arc::new(MemberDirectory::new());
    let ledger = Arc::new(ClaimLedger::new());
    let event_bus = EventBus::new(1024);
    let claim_service = ClaimService::new(
        Arc::clone(&directory),
        ledger,
        event_bus.clone(),
        None,
        100_000,
    );
    let network_service = Arc::new(NetworkService::new(
        directory,
        claim_service,
        event_bus.clone(),
        None,
        100_000,
    ));
    let state = AppState {
        network_service,
        event_bus,
    };

    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .with_state(state);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn str_at(value: &Value, pointer: &str) -> String {
    let Some(s) = value.pointer(pointer).and_then(Value::as_str) else {
        panic!("missing string at {pointer} in {value}");
    };
    s.to_string()
}

async fn enroll(
    client: &reqwest::Client,
    addr: SocketAddr,
    name: &str,
    sponsor_code: Option<&str>,
) -> Value {
    let body = match sponsor_code {
        Some(code) => json!({ "full_name": name, "sponsor_code": code }),
        None => json!({ "full_name": name }),
    };
    let resp = tokio_test::assert_ok!(
        client
            .post(format!("http://{addr}/api/v1/members"))
            .json(&body)
            .send()
            .await
    );
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    tokio_test::assert_ok!(resp.json::<Value>().await)
}

async fn qualify(client: &reqwest::Client, addr: SocketAddr, member_id: &str) -> Value {
    let resp = tokio_test::assert_ok!(
        client
            .post(format!("http://{addr}/api/v1/members/{member_id}/qualify"))
            .send()
            .await
    );
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    tokio_test::assert_ok!(resp.json::<Value>().await)
}

/// Reads WebSocket frames until the next text frame, parsed as JSON.
async fn next_ws_json(socket: &mut WsClient) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next()).await;
        let Ok(Some(Ok(frame))) = frame else {
            panic!("ws read failed or timed out");
        };
        if let Message::Text(text) = frame {
            let Ok(value) = serde_json::from_str(text.as_str()) else {
                panic!("ws frame was not json: {text}");
            };
            return value;
        }
    }
}

#[tokio::test]
async fn health_reports_service_version() {
    let addr = spawn_gateway().await;
    let client = reqwest::Client::new();

    let resp = tokio_test::assert_ok!(client.get(format!("http://{addr}/health")).send().await);
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: Value = tokio_test::assert_ok!(resp.json().await);
    assert_eq!(
        body.pointer("/status").and_then(Value::as_str),
        Some("healthy")
    );
    assert_eq!(
        body.pointer("/version").and_then(Value::as_str),
        Some(env!("CARGO_PKG_VERSION"))
    );
}

#[tokio::test]
async fn enrollment_to_delivered_claim_over_rest() {
    let addr = spawn_gateway().await;
    let client = reqwest::Client::new();

    let sponsor = enroll(&client, addr, "Alice Root", None).await;
    let sponsor_id = str_at(&sponsor, "/member_id");
    let sponsor_code = str_at(&sponsor, "/referral_code");
    qualify(&client, addr, &sponsor_id).await;

    // Five qualified direct recruits complete level 1 for the sponsor.
    let mut last_qualify = Value::Null;
    for i in 0..5 {
        let recruit = enroll(&client, addr, &format!("Recruit {i}"), Some(&sponsor_code)).await;
        let recruit_id = str_at(&recruit, "/member_id");
        last_qualify = qualify(&client, addr, &recruit_id).await;
    }

    let created = last_qualify
        .pointer("/claims_created")
        .and_then(Value::as_array)
        .map(Vec::len);
    assert_eq!(created, Some(1));
    assert_eq!(
        last_qualify
            .pointer("/claims_created/0/level")
            .and_then(Value::as_u64),
        Some(1)
    );
    assert_eq!(
        str_at(&last_qualify, "/claims_created/0/member_id"),
        sponsor_id
    );

    // The sponsor's dashboard reflects the completed level.
    let resp = tokio_test::assert_ok!(
        client
            .get(format!("http://{addr}/api/v1/network/dashboard/{sponsor_id}"))
            .send()
            .await
    );
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let dashboard: Value = tokio_test::assert_ok!(resp.json().await);
    assert_eq!(
        dashboard.pointer("/levels/0/count").and_then(Value::as_u64),
        Some(5)
    );
    assert_eq!(
        dashboard
            .pointer("/levels/0/is_completed")
            .and_then(Value::as_bool),
        Some(true)
    );
    assert_eq!(
        dashboard.pointer("/total_team_size").and_then(Value::as_u64),
        Some(5)
    );

    // Admin list shows exactly the one pending claim.
    let resp = tokio_test::assert_ok!(
        client
            .get(format!("http://{addr}/api/v1/admin/claims?status=pending"))
            .send()
            .await
    );
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let listing: Value = tokio_test::assert_ok!(resp.json().await);
    assert_eq!(
        listing.pointer("/data").and_then(Value::as_array).map(Vec::len),
        Some(1)
    );
    let claim_id = str_at(&listing, "/data/0/claim_id");

    // A page number near u32::MAX yields an empty page, not a failure.
    let resp = tokio_test::assert_ok!(
        client
            .get(format!(
                "http://{addr}/api/v1/admin/claims?page=4294967295&per_page=100"
            ))
            .send()
            .await
    );
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let far_page: Value = tokio_test::assert_ok!(resp.json().await);
    assert_eq!(
        far_page.pointer("/data").and_then(Value::as_array).map(Vec::len),
        Some(0)
    );

    // Approve, deliver, then verify a repeat approval is refused.
    let resp = tokio_test::assert_ok!(
        client
            .put(format!("http://{addr}/api/v1/admin/claims"))
            .json(&json!({ "claim_id": claim_id, "status": "approved", "note": "verified" }))
            .send()
            .await
    );
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let approved: Value = tokio_test::assert_ok!(resp.json().await);
    assert_eq!(
        approved.pointer("/status").and_then(Value::as_str),
        Some("approved")
    );
    assert_eq!(
        approved.pointer("/note").and_then(Value::as_str),
        Some("verified")
    );

    let resp = tokio_test::assert_ok!(
        client
            .put(format!("http://{addr}/api/v1/admin/claims"))
            .json(&json!({ "claim_id": claim_id, "status": "delivered" }))
            .send()
            .await
    );
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let delivered: Value = tokio_test::assert_ok!(resp.json().await);
    assert_eq!(
        delivered.pointer("/status").and_then(Value::as_str),
        Some("delivered")
    );

    let resp = tokio_test::assert_ok!(
        client
            .put(format!("http://{addr}/api/v1/admin/claims"))
            .json(&json!({ "claim_id": claim_id, "status": "approved" }))
            .send()
            .await
    );
    assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);
    let conflict: Value = tokio_test::assert_ok!(resp.json().await);
    assert_eq!(
        conflict.pointer("/error/code").and_then(Value::as_u64),
        Some(2501)
    );
}

#[tokio::test]
async fn ws_wildcard_subscriber_sees_claim_created() {
    let addr = spawn_gateway().await;
    let client = reqwest::Client::new();

    let Ok((mut socket, _)) = connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws connect failed");
    };

    let subscribe = json!({
        "id": "sub-1",
        "type": "command",
        "timestamp": chrono::Utc::now(),
        "payload": { "command": "subscribe", "member_ids": ["*"] },
    });
    tokio_test::assert_ok!(socket.send(Message::text(subscribe.to_string())).await);

    let ack = next_ws_json(&mut socket).await;
    assert_eq!(ack.pointer("/type").and_then(Value::as_str), Some("response"));
    assert_eq!(
        ack.pointer("/payload/wildcard").and_then(Value::as_bool),
        Some(true)
    );

    // Complete level 1 for a sponsor while the socket is listening.
    let sponsor = enroll(&client, addr, "Streaming Sponsor", None).await;
    let sponsor_id = str_at(&sponsor, "/member_id");
    let sponsor_code = str_at(&sponsor, "/referral_code");
    qualify(&client, addr, &sponsor_id).await;
    for i in 0..5 {
        let recruit = enroll(&client, addr, &format!("Viewer {i}"), Some(&sponsor_code)).await;
        let recruit_id = str_at(&recruit, "/member_id");
        qualify(&client, addr, &recruit_id).await;
    }

    let mut claim_event = None;
    for _ in 0..50 {
        let frame = next_ws_json(&mut socket).await;
        if frame.pointer("/type").and_then(Value::as_str) == Some("event")
            && frame.pointer("/payload/event_type").and_then(Value::as_str)
                == Some("claim_created")
        {
            claim_event = Some(frame);
            break;
        }
    }

    let Some(frame) = claim_event else {
        panic!("no claim_created event arrived on the socket");
    };
    assert_eq!(
        frame.pointer("/payload/level").and_then(Value::as_u64),
        Some(1)
    );
    assert_eq!(str_at(&frame, "/payload/member_id"), sponsor_id);
}
