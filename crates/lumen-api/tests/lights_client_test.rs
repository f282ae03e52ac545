// Integration tests for `LightsClient` using wiremock.
#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lumen_api::{Error, Ident, LightsClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, LightsClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let client = LightsClient::with_client(reqwest::Client::new(), base);
    (server, client)
}

// ── Query ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_lights_preserves_order() {
    let (server, client) = setup().await;

    let body = json!({
        "groups": ["g1", 2],
        "lights": [
            { "group_id": "g1", "light_id": "b", "name": "Beta", "on": true, "brightness": 10 },
            { "group_id": 2, "light_id": 1, "name": "Alpha", "on": false, "brightness": 254 },
        ]
    });

    Mock::given(method("GET"))
        .and(path("/api/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client.list_lights().await.unwrap();

    assert_eq!(resp.lights.len(), 2);
    assert_eq!(resp.lights[0].name, "Beta");
    assert_eq!(resp.lights[1].group_id, Ident::Numeric(2));
    assert_eq!(resp.lights[1].brightness, 254);
    assert_eq!(resp.groups, vec![Ident::from("g1"), Ident::Numeric(2)]);
}

#[tokio::test]
async fn test_list_lights_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"lights\": [{\"name\": 3}]}"))
        .mount(&server)
        .await;

    let err = client.list_lights().await.unwrap_err();
    assert!(
        matches!(err, Error::Deserialization { .. }),
        "expected Deserialization, got {err:?}"
    );
}

#[tokio::test]
async fn test_list_lights_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/lights"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database locked"))
        .mount(&server)
        .await;

    let err = client.list_lights().await.unwrap_err();
    match err {
        Error::Http { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database locked");
        }
        other => panic!("expected Http, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_authority_is_transport_error() {
    // Bind then drop so the port is closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = Url::parse(&format!("http://{addr}")).unwrap();
    let client = LightsClient::with_client(reqwest::Client::new(), base);

    let err = client.list_lights().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    assert!(err.is_transient());
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_power_sends_only_on() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/lights/1/1"))
        .and(body_json(json!({ "on": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "group_id": 1, "light_id": 1, "name": "Lamp", "on": true, "brightness": 100
        })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_power(&Ident::Numeric(1), &Ident::Numeric(1), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_brightness_sends_only_bri() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/lights/kitchen/ceiling"))
        .and(body_json(json!({ "bri": 128 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_brightness(&Ident::from("kitchen"), &Ident::from("ceiling"), 128)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_power_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/lights/1/99"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client
        .set_power(&Ident::Numeric(1), &Ident::Numeric(99), false)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    match err {
        Error::Http { message, .. } => assert_eq!(message, "Not Found"),
        other => panic!("expected Http, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_light_with_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/lights"))
        .and(body_json(json!({ "name": "Desk" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let created = client.create_light("Desk").await.unwrap();
    assert!(created.is_none());
}

#[tokio::test]
async fn test_create_light_echoes_entity() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/lights"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "group_id": 1, "light_id": 3, "name": "Desk", "on": false, "brightness": 100
        })))
        .mount(&server)
        .await;

    let created = client.create_light("Desk").await.unwrap().unwrap();
    assert_eq!(created.light_id, Ident::Numeric(3));
    assert_eq!(created.name, "Desk");
}

#[tokio::test]
async fn test_create_light_group_full() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/lights"))
        .respond_with(ResponseTemplate::new(400).set_body_string("no group with space available"))
        .mount(&server)
        .await;

    let err = client.create_light("Overflow").await.unwrap_err();
    match &err {
        Error::Http { status, message } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "no group with space available");
        }
        other => panic!("expected Http, got {other:?}"),
    }
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_delete_light() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/lights/g1/l1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .delete_light(&Ident::from("g1"), &Ident::from("l1"))
        .await
        .unwrap();
}
