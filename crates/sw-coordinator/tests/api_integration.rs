//! Coordinator API integration tests
//!
//! Each test binds a real listener, drives the API with an HTTP client,
//! and (where relevant) attaches relay sockets.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use sw_coordinator::CoordinatorState;
use sw_core::config::CoordinatorConfig;
use sw_protocol::{
    CapabilitySet, CommandAck, CommandId, CommandOutcome, Envelope, HeartbeatRequest,
    HeartbeatResponse, Presentation, PresentationId, Slide, StatusSnapshot, TransitionType,
};

/// A coordinator bound to an ephemeral port
struct TestServer {
    state: Arc<CoordinatorState>,
    base_url: String,
    ws_url: String,
}

impl TestServer {
    async fn start() -> Self {
        let state = CoordinatorState::shared(CoordinatorConfig::default());
        let router = sw_coordinator::api::router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server");
        });

        Self {
            state,
            base_url: format!("http://{}", addr),
            ws_url: format!("ws://{}/ws", addr),
        }
    }

    fn seed_presentation(&self, id: u64) {
        self.state.presentations.upsert(Presentation {
            id: PresentationId::new(id),
            name: format!("deck {}", id),
            description: None,
            slides: vec![Slide {
                id: 1,
                image_reference: format!("slides/{}-1.png", id),
                duration_seconds: 5,
                transition_type: TransitionType::Cut,
            }],
        });
    }
}

fn heartbeat(device_id: &str) -> HeartbeatRequest {
    HeartbeatRequest {
        device_id: device_id.to_string(),
        display_name: Some(format!("{} lobby", device_id)),
        capabilities: CapabilitySet::default(),
        snapshot: StatusSnapshot::idle("0.1.0", 30),
    }
}

#[tokio::test]
async fn test_heartbeat_auto_provisions_and_drains_in_order() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // First contact provisions the device.
    let response: HeartbeatResponse = client
        .post(format!("{}/api/heartbeat", server.base_url))
        .json(&heartbeat("kiosk-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(response.success);
    assert!(response.commands.is_empty());

    // Two commands enqueued before the next heartbeat arrive in creation
    // order within a single cycle.
    for kind in ["next_slide", "restart"] {
        let status = client
            .post(format!("{}/api/devices/kiosk-1/commands", server.base_url))
            .json(&serde_json::json!({ "kind": kind }))
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, 200);
    }

    let response: HeartbeatResponse = client
        .post(format!("{}/api/heartbeat", server.base_url))
        .json(&heartbeat("kiosk-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response.commands.len(), 2);
    assert!(response.commands[0].created_at <= response.commands[1].created_at);
    assert!(response.commands[0].id.as_u64() < response.commands[1].id.as_u64());

    // One acknowledgment each; the queue then stops redelivering.
    for command in &response.commands {
        let status = client
            .post(format!("{}/api/commands/ack", server.base_url))
            .json(&CommandAck {
                command_id: command.id,
                status: CommandOutcome::Executed,
                result: None,
            })
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, 200);
    }

    let response: HeartbeatResponse = client
        .post(format!("{}/api/heartbeat", server.base_url))
        .json(&heartbeat("kiosk-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(response.commands.is_empty());
}

#[tokio::test]
async fn test_ack_is_idempotent_over_http() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/heartbeat", server.base_url))
        .json(&heartbeat("kiosk-2"))
        .send()
        .await
        .unwrap();

    let enqueue: serde_json::Value = client
        .post(format!("{}/api/devices/kiosk-2/commands", server.base_url))
        .json(&serde_json::json!({ "kind": "pause" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let command_id = CommandId::new(enqueue["command"]["id"].as_u64().unwrap());

    for outcome in [CommandOutcome::Failed, CommandOutcome::Executed] {
        let status = client
            .post(format!("{}/api/commands/ack", server.base_url))
            .json(&CommandAck { command_id, status: outcome, result: None })
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, 200);
    }

    // First writer wins.
    let record = server.state.commands.get(command_id).unwrap();
    assert_eq!(record.status, sw_coordinator::store::CommandStatus::Failed);
}

#[tokio::test]
async fn test_ack_unknown_command_is_404() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let status = client
        .post(format!("{}/api/commands/ack", server.base_url))
        .json(&CommandAck {
            command_id: CommandId::new(424242),
            status: CommandOutcome::Executed,
            result: None,
        })
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_enqueue_validation() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/heartbeat", server.base_url))
        .json(&heartbeat("kiosk-3"))
        .send()
        .await
        .unwrap();

    // Unknown kind rejected before acceptance.
    let status = client
        .post(format!("{}/api/devices/kiosk-3/commands", server.base_url))
        .json(&serde_json::json!({ "kind": "format_disk" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 400);

    // Parameters checked too.
    let status = client
        .post(format!("{}/api/devices/kiosk-3/commands", server.base_url))
        .json(&serde_json::json!({ "kind": "goto_slide" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 400);

    // Unknown device is 404.
    let status = client
        .post(format!("{}/api/devices/ghost/commands", server.base_url))
        .json(&serde_json::json!({ "kind": "play" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_assignment_probe_and_default() {
    let server = TestServer::start().await;
    server.seed_presentation(7);
    let client = reqwest::Client::new();

    // Absence is an explicit null, not an error.
    let probe: serde_json::Value = client
        .get(format!("{}/api/devices/kiosk-4/assignment", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(probe["assigned_presentation"].is_null());

    let status = client
        .put(format!("{}/api/devices/kiosk-4/assignment", server.base_url))
        .json(&serde_json::json!({ "presentation_id": 7 }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 200);

    let probe: serde_json::Value = client
        .get(format!("{}/api/devices/kiosk-4/assignment", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(probe["assigned_presentation"]["presentation_id"], 7);

    // Fleet default requires a known presentation.
    let status = client
        .put(format!("{}/api/default-presentation", server.base_url))
        .json(&serde_json::json!({ "presentation_id": 99 }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 404);

    client
        .put(format!("{}/api/default-presentation", server.base_url))
        .json(&serde_json::json!({ "presentation_id": 7 }))
        .send()
        .await
        .unwrap();

    let default: serde_json::Value = client
        .get(format!("{}/api/default-presentation", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(default["default_presentation"]["id"], 7);
}

#[tokio::test]
async fn test_presentation_fetch() {
    let server = TestServer::start().await;
    server.seed_presentation(11);
    let client = reqwest::Client::new();

    let fetched: serde_json::Value = client
        .get(format!("{}/api/presentations/11", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["presentation"]["id"], 11);
    assert_eq!(fetched["presentation"]["slides"].as_array().unwrap().len(), 1);

    let status = client
        .get(format!("{}/api/presentations/404", server.base_url))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_relay_pushes_enqueued_command_to_live_device() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/heartbeat", server.base_url))
        .json(&heartbeat("kiosk-5"))
        .send()
        .await
        .unwrap();

    // Admin first, so it observes the device arriving.
    let (mut admin, _) = tokio_tungstenite::connect_async(&server.ws_url).await.unwrap();
    admin
        .send(WsMessage::Text(Envelope::RegisterAdmin.to_text().unwrap()))
        .await
        .unwrap();
    let frame = admin.next().await.unwrap().unwrap();
    assert_eq!(
        Envelope::from_text(frame.to_text().unwrap()).unwrap(),
        Envelope::RegistrationSuccess
    );

    let (mut device, _) = tokio_tungstenite::connect_async(&server.ws_url).await.unwrap();
    device
        .send(WsMessage::Text(
            Envelope::RegisterDevice { device_id: "kiosk-5".into() }.to_text().unwrap(),
        ))
        .await
        .unwrap();
    let frame = device.next().await.unwrap().unwrap();
    assert_eq!(
        Envelope::from_text(frame.to_text().unwrap()).unwrap(),
        Envelope::RegistrationSuccess
    );

    let frame = admin.next().await.unwrap().unwrap();
    assert_eq!(
        Envelope::from_text(frame.to_text().unwrap()).unwrap(),
        Envelope::DeviceConnected { device_id: "kiosk-5".into() }
    );

    // Enqueue over HTTP; the live socket gets the same command pushed.
    let enqueue: serde_json::Value = client
        .post(format!("{}/api/devices/kiosk-5/commands", server.base_url))
        .json(&serde_json::json!({ "kind": "restart" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(enqueue["pushed"], true);

    let frame = device.next().await.unwrap().unwrap();
    match Envelope::from_text(frame.to_text().unwrap()).unwrap() {
        Envelope::Command { id: Some(id), kind, .. } => {
            assert_eq!(id.as_u64(), enqueue["command"]["id"].as_u64().unwrap());
            assert_eq!(kind, sw_protocol::CommandKind::Restart);
        }
        other => panic!("Expected command envelope, got {:?}", other),
    }

    // Device drop reaches the admin.
    device.close(None).await.unwrap();
    loop {
        let frame = admin.next().await.unwrap().unwrap();
        if let Ok(envelope) = Envelope::from_text(frame.to_text().unwrap()) {
            if envelope == (Envelope::DeviceDisconnected { device_id: "kiosk-5".into() }) {
                break;
            }
        }
    }
}
