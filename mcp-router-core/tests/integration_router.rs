//! End-to-end coverage of the registry/router stack against a real
//! (fake) stdio MCP child: cold start, duplicate add, disable/enable, and
//! calling a tool by name.

use std::path::PathBuf;
use std::sync::Arc;

use mcp_router_core::config_model::Instance;
use mcp_router_core::config_store::ConfigStore;
use mcp_router_core::registry::InstanceRegistry;
use mcp_router_core::router::Router;
use serde_json::json;

fn fake_child_instance(name: &str) -> Instance {
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fake_mcp_child.py");
    Instance::from_raw_json(
        &json!({
            "name": name,
            "command": "python3",
            "args": [fixture.to_string_lossy()],
        }),
        Some("test_provider"),
    )
    .unwrap()
}

#[tokio::test]
async fn cold_start_with_no_instances_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(InstanceRegistry::new(ConfigStore::new(dir.path())));
    registry.load_and_connect_all().await.unwrap();
    assert!(registry.names().await.is_empty());

    let router = Router::new(registry);
    assert_eq!(router.list().await, json!([]));
}

#[tokio::test]
async fn add_connect_call_and_remove_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(InstanceRegistry::new(ConfigStore::new(dir.path())));
    let router = Router::new(registry.clone());

    let added = router.add(fake_child_instance("echoer")).await;
    assert_eq!(added, "Done");

    let used = router.use_instance("echoer").await;
    assert_eq!(used, "Done");

    let result = router.call(None, "echo", json!({"text": "hello"})).await;
    assert!(result.to_string().contains("hello"), "unexpected call result: {result}");

    let removed = router.remove("echoer").await;
    assert_eq!(removed, "Done");
    assert!(registry.get("echoer").await.is_err());
}

#[tokio::test]
async fn duplicate_add_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(InstanceRegistry::new(ConfigStore::new(dir.path())));
    let router = Router::new(registry.clone());

    assert_eq!(router.add(fake_child_instance("dup")).await, "Done");
    let second = router.add(fake_child_instance("dup")).await;
    assert!(second.starts_with("Error:"), "expected rejection, got: {second}");
}

#[tokio::test]
async fn disable_then_call_is_rejected_without_disconnecting() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(InstanceRegistry::new(ConfigStore::new(dir.path())));
    let router = Router::new(registry.clone());

    router.add(fake_child_instance("toggle")).await;
    assert_eq!(router.disable("toggle").await, "Done");

    let session = registry.get("toggle").await.unwrap();
    assert!(session.is_connected().await, "disable must not force a disconnect");

    let call = router.call(Some("toggle"), "echo", json!({"text": "x"})).await;
    assert_eq!(call["code"].as_str(), Some("CONFIG_ERROR"), "unexpected call result: {call}");

    assert_eq!(router.enable("toggle").await, "Done");
    let call = router.call(Some("toggle"), "echo", json!({"text": "x"})).await;
    assert!(call.to_string().contains('x'));
}

#[tokio::test]
async fn unknown_instance_lookup_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(InstanceRegistry::new(ConfigStore::new(dir.path())));
    let router = Router::new(registry.clone());

    let result = router.call(Some("missing"), "echo", json!({})).await;
    assert_eq!(result["code"].as_str(), Some("INSTANCE_NOT_FOUND"));
}
