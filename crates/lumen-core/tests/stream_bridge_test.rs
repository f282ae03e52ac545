// End-to-end: full query over HTTP plus pushed updates over the stream,
// served by one local authority on a single port.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use lumen_core::{
    ConnectionState, Controller, ControllerConfig, LightKey, ReconnectConfig, StreamEvent,
};

// ── Fake authority ──────────────────────────────────────────────────

const LIGHTS: &str = r#"{"groups":[1],"lights":[
    {"group_id":1,"light_id":1,"name":"Lamp","on":true,"brightness":100},
    {"group_id":1,"light_id":2,"name":"Desk","on":false,"brightness":20}
]}"#;

/// Serve `GET /api/lights` with `LIGHTS` and `/messages` with `frames`.
async fn serve_authority(listener: TcpListener, frames: Vec<&'static str>) {
    loop {
        let Ok((tcp, _)) = listener.accept().await else {
            return;
        };
        if is_stream_request(&tcp).await {
            let frames = frames.clone();
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
                for frame in frames {
                    ws.send(Message::text(frame)).await.unwrap();
                }
                // Hold the stream open until the client closes it.
                while let Some(Ok(_)) = ws.next().await {}
            });
        } else {
            tokio::spawn(respond_with_lights(tcp));
        }
    }
}

async fn is_stream_request(tcp: &TcpStream) -> bool {
    let mut buf = [0u8; 32];
    for _ in 0..50 {
        let n = tcp.peek(&mut buf).await.unwrap();
        if n >= 13 {
            return buf.starts_with(b"GET /messages");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn respond_with_lights(mut tcp: TcpStream) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = tcp.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        request.extend_from_slice(&chunk[..n]);
    }
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        LIGHTS.len(),
        LIGHTS
    );
    tcp.write_all(response.as_bytes()).await.unwrap();
    let _ = tcp.shutdown().await;
}

async fn start(frames: Vec<&'static str>) -> ControllerConfig {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_authority(listener, frames));
    ControllerConfig::new(Url::parse(&format!("http://{addr}")).unwrap())
}

/// An authority whose update stream never upgrades: every request gets `LIGHTS`.
async fn start_without_stream() -> ControllerConfig {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            tokio::spawn(respond_with_lights(tcp));
        }
    });
    ControllerConfig::new(Url::parse(&format!("http://{addr}")).unwrap())
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pushed_update_reaches_registry() {
    let cfg = start(vec![
        "not an update",
        r#"{"groupID":9,"lightID":9,"stateRequest":{"on":true}}"#,
        r#"{"groupID":1,"lightID":1,"stateRequest":{"on":false,"bri":null}}"#,
    ])
    .await;

    let controller = Controller::new(cfg);
    let mut events = controller.stream_events();
    controller.connect().await.unwrap();

    let mut lights = controller.lights();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snap = lights.latest();
            if !snap[0].on {
                break snap;
            }
            lights.changed().await.unwrap();
        }
    })
    .await
    .expect("update never applied");

    // Only the pushed field changed; order and the other light are untouched.
    assert_eq!(snapshot[0].name, "Lamp");
    assert_eq!(snapshot[0].brightness, 100);
    assert_eq!(snapshot[1].name, "Desk");
    assert!(!snapshot[1].on);

    assert_eq!(controller.registry().unknown_target_count(), 1);
    assert_eq!(controller.malformed_stream_payloads().await, 1);
    assert_eq!(
        *controller.connection_state().borrow(),
        ConnectionState::Connected
    );

    let first = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(first, StreamEvent::Opened { .. }), "got {first:?}");

    controller.disconnect().await;
    assert_eq!(
        *controller.connection_state().borrow(),
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn test_command_outcome_arrives_through_stream_only() {
    let cfg = start(vec![r#"{"groupID":1,"lightID":2,"stateRequest":{"bri":254}}"#]).await;

    let controller = Controller::new(cfg);
    controller.connect().await.unwrap();

    let mut lights = controller.lights();
    let desk = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(desk) = controller.registry().get(&LightKey::new(1, 2)) {
                if desk.brightness == 254 {
                    break desk;
                }
            }
            lights.changed().await.unwrap();
        }
    })
    .await
    .expect("update never applied");

    assert!(!desk.on);
    controller.disconnect().await;
}

#[tokio::test]
async fn test_exhausted_reconnects_mark_connection_failed() {
    let mut cfg = start_without_stream().await;
    cfg.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
        max_retries: Some(1),
    };

    let controller = Controller::new(cfg);
    let mut events = controller.stream_events();
    controller.connect().await.unwrap();

    let mut state = controller.connection_state();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ConnectionState::Failed),
    )
    .await
    .expect("state never left Reconnecting")
    .unwrap();

    // Both handshakes were reported as lost sessions before giving up.
    let mut lost = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, StreamEvent::Closed { normal: false, .. }) {
            lost += 1;
        }
    }
    assert_eq!(lost, 2);
    assert_eq!(controller.lights_snapshot().len(), 2);

    controller.disconnect().await;
}
