//! End-to-end smoke tests for the full homebusd stack.
//!
//! Each test brings up the real wiring (bus + dispatch loop, state store,
//! path-registry listener, ruuvi adapter, bridge router) and exercises the
//! HTTP layer via `tower::ServiceExt::oneshot` — no TCP port is bound.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use homebus_adapter_http_bridge::paths::PathRegistry;
use homebus_adapter_http_bridge::state::{BridgeConfig, BridgeState};
use homebus_adapter_http_bridge::{paths, router};
use homebus_app::bus::{BusConfig, EventBus};
use homebus_app::state::{MemoryState, StateReader};
use homebus_app::{logging, state_bus};
use homebus_domain::event::Event;
use homebus_domain::topic;

const STUDY_MAC: &str = "cc:64:a6:ed:f6:aa";

/// Build the fully-wired stack: every core consumer plus one ruuvi adapter.
async fn app() -> (axum::Router, EventBus, MemoryState) {
    let (bus, dispatcher) = EventBus::new(&BusConfig::default());
    tokio::spawn(dispatcher.run());
    tokio::spawn(logging::run_log_sink(bus.clone()));

    let state = MemoryState::new();
    tokio::spawn(state_bus::run(bus.clone(), state.clone()));

    let registry = PathRegistry::new();
    tokio::spawn(paths::listen(bus.clone(), registry.clone()));

    for required in [topic::LOG_NEW, topic::STATE_UPDATE, topic::HTTP_REGISTER_PATH] {
        bus.wait_until_subscriber(required, Duration::from_secs(5))
            .await
            .expect("core consumer should register");
    }

    tokio::spawn(homebus_adapter_ruuvi::run(
        bus.clone(),
        homebus_adapter_ruuvi::Config {
            path: "/ruuvi".to_string(),
            sensors: HashMap::from([(STUDY_MAC.to_string(), "study".to_string())]),
        },
    ));

    // the adapter registers its path over the bus; wait for it to land
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !registry.contains("/ruuvi") {
        assert!(
            tokio::time::Instant::now() < deadline,
            "adapter never registered its path"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let bridge = BridgeState::new(bus.clone(), registry, BridgeConfig {
        response_timeout: Duration::from_secs(2),
        max_body_bytes: 100 * 1024,
    });
    (router::build(bridge), bus, state)
}

async fn wait_for_value(state: &MemoryState, key: &str) -> String {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(value) = state.read(key) {
            return value;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "state key {key} never appeared"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn reading() -> String {
    format!(
        r#"{{
          "device": {{"address": "{STUDY_MAC}"}},
          "sensors": {{
            "temperature": 21.5,
            "humidity": 54.2,
            "pressure": 1013.25,
            "voltage": 2.977,
            "txpower": 4
          }}
        }}"#
    )
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let (app, _bus, _state) = app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Bridge round-trip through a real adapter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_materialize_sensor_reading_posted_over_http() {
    let (app, _bus, state) = app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ruuvi")
                .body(Body::from(reading()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");

    assert_eq!(wait_for_value(&state, "ruuvi.study.temp_celcius").await, "21.5");
    assert_eq!(wait_for_value(&state, "ruuvi.study.humidity").await, "54.2");
    assert_eq!(state.read_f64("ruuvi.study.voltage"), Some(2.977));
}

#[tokio::test]
async fn should_relay_adapter_rejection_of_invalid_json() {
    let (app, _bus, _state) = app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ruuvi")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"invalid JSON");
}

#[tokio::test]
async fn should_return_404_for_unregistered_path() {
    let (app, _bus, _state) = app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/thermostat")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// State retraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_remove_state_entry_on_delete_event() {
    let (_app, bus, state) = app().await;

    bus.publish(Event::key_value(topic::STATE_UPDATE, "a.b", "1"))
        .await
        .unwrap();
    assert_eq!(wait_for_value(&state, "a.b").await, "1");

    bus.publish(Event::value(topic::STATE_DELETE, "a.b"))
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while state.read("a.b").is_some() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "state key was never removed"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
