//! Integration test: HttpNamingRegistry against a local axum registry stub.
//!
//! Verifies that:
//! 1. Public name queries hit the GET paths and decode the JSON rows.
//! 2. Nickname queries carry the caller as the `caller` query parameter.
//! 3. Setters POST `{ caller, .., value }` bodies to the same paths.
//! 4. Non-2xx statuses map to `Rejected`, bad JSON to `Decode`, no listener to `Unreachable`.
//!
//! Run with: `cargo test -p naming-core --test http_registry_test`

#![cfg(feature = "http")]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use naming_core::{CallerIdentity, HttpNamingRegistry, NamingRegistry, RawNeuronName, RegistryError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Seen {
    callers: Vec<String>,
    posts: Vec<(&'static str, Value)>,
}

type Shared = Arc<Mutex<Seen>>;

async fn neuron_names() -> Json<Value> {
    Json(json!([
        { "collective_id": "sns1", "fingerprint_hex": "AA", "name": "Alice", "verified": true },
        { "collective_id": "sns1", "fingerprint_hex": "bb", "name": "Bob" }
    ]))
}

async fn neuron_nicknames(State(seen): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    seen.lock().unwrap().callers.push(q.get("caller").cloned().unwrap_or_default());
    Json(json!([{ "collective_id": "sns1", "fingerprint_hex": "bb", "nickname": "backup" }]))
}

async fn record_neuron_name(State(seen): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    seen.lock().unwrap().posts.push(("/neurons/names", body));
    StatusCode::NO_CONTENT
}

async fn principal_names() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "registry down")
}

async fn principal_nicknames() -> &'static str {
    "<html>not json</html>"
}

async fn start_registry() -> (HttpNamingRegistry, Shared) {
    let seen = Shared::default();
    let app = Router::new()
        .route("/neurons/names", get(neuron_names).post(record_neuron_name))
        .route("/neurons/nicknames", get(neuron_nicknames))
        .route("/principals/names", get(principal_names))
        .route("/principals/nicknames", get(principal_nicknames))
        .with_state(Arc::clone(&seen));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    // Trailing slash is trimmed by the client.
    let registry = HttpNamingRegistry::new(&format!("http://{}/", addr), Duration::from_secs(5));
    (registry, seen)
}

fn caller() -> CallerIdentity {
    CallerIdentity("user-1".into())
}

#[tokio::test]
async fn public_names_decode_rows() {
    let (registry, seen) = start_registry().await;
    let rows = registry.neuron_names().await.unwrap();
    assert_eq!(
        rows[0],
        RawNeuronName {
            collective_id: "sns1".into(),
            fingerprint_hex: "AA".into(),
            name: "Alice".into(),
            verified: true,
        }
    );
    assert!(!rows[1].verified);
    assert!(seen.lock().unwrap().callers.is_empty());
}

#[tokio::test]
async fn nickname_query_sends_caller() {
    let (registry, seen) = start_registry().await;
    let rows = registry.neuron_nicknames(&caller()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].nickname, "backup");
    assert_eq!(seen.lock().unwrap().callers, vec!["user-1".to_string()]);
}

#[tokio::test]
async fn setter_posts_caller_and_value() {
    let (registry, seen) = start_registry().await;
    registry.set_neuron_name(&caller(), "sns1", "aa", "Alice").await.unwrap();
    let seen = seen.lock().unwrap();
    assert_eq!(
        seen.posts,
        vec![(
            "/neurons/names",
            json!({ "caller": "user-1", "collective_id": "sns1", "fingerprint_hex": "aa", "value": "Alice" })
        )]
    );
}

#[tokio::test]
async fn server_error_is_rejected() {
    let (registry, _) = start_registry().await;
    match registry.principal_names().await {
        Err(RegistryError::Rejected(msg)) => {
            assert!(msg.contains("500"), "{}", msg);
            assert!(msg.contains("registry down"), "{}", msg);
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
    // No POST route on /principals/names: 405 is rejected too.
    assert!(matches!(
        registry.set_principal_name(&caller(), "abc-123", "Treasury").await,
        Err(RegistryError::Rejected(_))
    ));
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let (registry, _) = start_registry().await;
    assert!(matches!(
        registry.principal_nicknames(&caller()).await,
        Err(RegistryError::Decode(_))
    ));
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let registry = HttpNamingRegistry::new(&format!("http://{}", addr), Duration::from_secs(2));
    assert!(matches!(registry.neuron_names().await, Err(RegistryError::Unreachable(_))));
}
