mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::Instant;

use common::{registry_with, ws_server, MockFactory};
use toolmesh::config::{ServerConfig, TransportKind};
use toolmesh::error::ToolmeshError;
use toolmesh::mcp::{ConnectionRegistry, ConnectionStatus, ToolAggregator, TransportFactories};
use toolmesh::types::ToolCallResult;

#[tokio::test]
async fn launching_twice_reuses_the_connection() {
    let factory = Arc::new(MockFactory::new().server("web", &["search"]));
    let registry = registry_with(factory.clone());

    let first = registry.launch_server("web", &ws_server("web")).await.unwrap();
    let second = registry.launch_server("web", &ws_server("web")).await.unwrap();

    assert_eq!(factory.connects("web"), 1);
    assert!(Arc::ptr_eq(&first.client, &second.client));
    assert_eq!(first.kind, TransportKind::Websocket);
    assert_eq!(registry.status("web").await, Some(ConnectionStatus::Connected));
}

#[tokio::test(start_paused = true)]
async fn concurrent_launches_share_one_transport() {
    let factory = Arc::new(
        MockFactory::new()
            .server("web", &["search"])
            .with_delay(Duration::from_millis(200)),
    );
    let registry = registry_with(factory.clone());

    let launches = (0..6).map(|_| {
        let registry = registry.clone();
        tokio::spawn(async move { registry.launch_server("web", &ws_server("web")).await })
    });
    let connections = futures::future::join_all(launches).await;

    for connection in connections {
        assert_eq!(connection.unwrap().unwrap().id, "web");
    }
    assert_eq!(factory.connects("web"), 1);
    assert_eq!(registry.get_all_clients().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_reconnects_raise_connection_error() {
    let factory = Arc::new(MockFactory::new().unreachable("db"));
    let registry = registry_with(factory.clone());

    let start = Instant::now();
    let err = registry
        .launch_server("db", &ws_server("db"))
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, ToolmeshError::Connection { .. }));
    assert!(err.is_fatal());
    assert_eq!(factory.connects("db"), 3);
    assert!(elapsed >= Duration::from_millis(3000) && elapsed < Duration::from_millis(3100));
    assert!(registry.get_client("db").await.is_none());
    assert_eq!(registry.status("db").await, Some(ConnectionStatus::Failed));
}

#[tokio::test]
async fn unregistered_transport_kind_is_a_configuration_error() {
    let registry = ConnectionRegistry::new(TransportFactories::new());

    let err = registry
        .launch_server("fs", &ServerConfig::stdio("fs", "node", vec!["server.js".into()]))
        .await
        .unwrap_err();

    assert!(matches!(err, ToolmeshError::Configuration(ref message) if message.contains("stdio")));
}

#[tokio::test]
async fn catalog_and_teardown_cover_every_connection() {
    let factory = Arc::new(
        MockFactory::new()
            .server("alpha", &["search"])
            .server("beta", &["status"]),
    );
    let registry = registry_with(factory.clone());
    for id in ["alpha", "beta"] {
        registry.launch_server(id, &ws_server(id)).await.unwrap();
    }

    let catalogs = registry.get_all_tools().await;
    let mut ids = catalogs
        .iter()
        .map(|catalog| catalog.server_id.as_str())
        .collect::<Vec<_>>();
    ids.sort();
    assert_eq!(ids, vec!["alpha", "beta"]);

    registry.disconnect_server("missing").await;
    registry.disconnect_all().await;

    assert!(registry.get_all_clients().await.is_empty());
    assert_eq!(factory.live("alpha").unwrap().closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(factory.live("beta").unwrap().closes.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn aggregator_routes_to_the_owning_server() {
    let factory = Arc::new(
        MockFactory::new()
            .server("alpha", &["search", "ping"])
            .server("beta", &["search", "status"]),
    );
    let registry = registry_with(factory.clone());
    let aggregator = ToolAggregator::load(
        registry.clone(),
        &[ws_server("alpha"), ws_server("beta")],
    )
    .await
    .unwrap();

    let tools = aggregator.get_all_tools().await;
    assert_eq!(tools.len(), 3);
    assert_eq!(aggregator.find_tool("search").await.as_deref(), Some("alpha"));
    assert_eq!(aggregator.find_tool("status").await.as_deref(), Some("beta"));
    assert_eq!(aggregator.find_tool("nope").await, None);

    let result = aggregator
        .execute_tool("status", json!({"verbose": true}))
        .await
        .unwrap();
    assert_eq!(result, ToolCallResult::text("beta:status"));
    assert_eq!(
        *factory.live("beta").unwrap().calls.lock().unwrap(),
        vec![("status".to_string(), json!({"verbose": true}))]
    );

    let err = aggregator.execute_tool("nope", json!({})).await.unwrap_err();
    assert!(matches!(err, ToolmeshError::ToolNotFound(ref name) if name == "nope"));
}

#[tokio::test]
async fn execute_before_catalog_fetch_resolves_lazily() {
    let factory = Arc::new(MockFactory::new().server("alpha", &["search"]));
    let registry = registry_with(factory);
    let aggregator = ToolAggregator::load(registry, &[ws_server("alpha")])
        .await
        .unwrap();

    let result = aggregator.execute_tool("search", json!({})).await.unwrap();
    assert_eq!(result.text_content().as_deref(), Some("alpha:search"));
}

#[tokio::test]
async fn aggregators_sharing_a_registry_close_independently() {
    let factory = Arc::new(
        MockFactory::new()
            .server("alpha", &["search"])
            .server("beta", &["status"]),
    );
    let registry = registry_with(factory.clone());
    let first = ToolAggregator::load(registry.clone(), &[ws_server("alpha")])
        .await
        .unwrap();
    let second = ToolAggregator::load(registry.clone(), &[ws_server("beta")])
        .await
        .unwrap();

    assert_eq!(second.get_all_tools().await.len(), 1);

    first.close().await;

    assert!(!registry.contains("alpha").await);
    assert!(registry.contains("beta").await);
    assert_eq!(
        second.execute_tool("status", json!({})).await.unwrap(),
        ToolCallResult::text("beta:status")
    );
}
