//! Shared test helpers: scripted completion provider and in-memory tool-servers.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use toolmesh::config::{ServerConfig, TransportKind};
use toolmesh::error::ToolmeshError;
use toolmesh::mcp::{
    ConnectionRegistry, McpToolSchema, ToolServerClient, TransportFactories, TransportFactory,
};
use toolmesh::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use toolmesh::types::*;
use toolmesh::util::retry::RetryPolicy;

/// A provider that replays queued responses and records every request.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ToolmeshError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a terminal text response.
    pub fn queue_response(&self, text: &str) -> &Self {
        self.push(Ok(ProviderResponse::text(text)))
    }

    /// Queue a single tool call response.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: serde_json::Value) -> &Self {
        self.push(Ok(ProviderResponse::tool_calls(vec![ToolCallRequest::new(
            id, name, args,
        )])))
    }

    /// Queue a response requesting several tools at once.
    pub fn queue_tool_calls(&self, calls: Vec<ToolCallRequest>) -> &Self {
        self.push(Ok(ProviderResponse::tool_calls(calls)))
    }

    /// Queue a failed completion.
    pub fn queue_error(&self, status: u16) -> &Self {
        self.push(Err(ToolmeshError::Api {
            status,
            message: "upstream unavailable".into(),
        }))
    }

    fn push(&self, response: Result<ProviderResponse, ToolmeshError>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ToolmeshError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ProviderResponse::text("Mock response")))
    }
}

pub fn schema(name: &str) -> McpToolSchema {
    McpToolSchema::new(
        name,
        format!("{name} tool"),
        serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } }
        }),
    )
}

/// In-memory tool-server. Calls answer `"<server>:<tool>"` unless a scripted
/// result is queued for the tool.
pub struct MockServer {
    pub id: String,
    tools: Vec<McpToolSchema>,
    scripted: Mutex<HashMap<String, VecDeque<ToolCallResult>>>,
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
    pub closes: AtomicUsize,
}

impl MockServer {
    fn new(id: &str, tools: Vec<McpToolSchema>) -> Self {
        Self {
            id: id.to_string(),
            tools,
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, tool: &str, result: ToolCallResult) {
        self.scripted
            .lock()
            .unwrap()
            .entry(tool.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolServerClient for MockServer {
    async fn list_tools(&self) -> Result<Vec<McpToolSchema>, ToolmeshError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, ToolmeshError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(VecDeque::pop_front);
        Ok(scripted.unwrap_or_else(|| ToolCallResult::text(format!("{}:{name}", self.id))))
    }

    async fn close(&self) -> Result<(), ToolmeshError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory serving [`MockServer`]s by server id.
#[derive(Default)]
pub struct MockFactory {
    catalogs: HashMap<String, Vec<McpToolSchema>>,
    unreachable: HashSet<String>,
    connect_delay: Option<Duration>,
    connects: Mutex<HashMap<String, usize>>,
    servers: Mutex<HashMap<String, Arc<MockServer>>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server(mut self, id: &str, tools: &[&str]) -> Self {
        self.catalogs
            .insert(id.to_string(), tools.iter().map(|name| schema(name)).collect());
        self
    }

    /// Every connection attempt for `id` fails.
    pub fn unreachable(mut self, id: &str) -> Self {
        self.unreachable.insert(id.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn connects(&self, id: &str) -> usize {
        self.connects.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn live(&self, id: &str) -> Option<Arc<MockServer>> {
        self.servers.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl TransportFactory for MockFactory {
    async fn connect(
        &self,
        server_id: &str,
        _config: &ServerConfig,
    ) -> Result<Arc<dyn ToolServerClient>, ToolmeshError> {
        *self
            .connects
            .lock()
            .unwrap()
            .entry(server_id.to_string())
            .or_default() += 1;

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable.contains(server_id) {
            return Err(ToolmeshError::Transport(format!(
                "{server_id}: connection refused"
            )));
        }

        let server = Arc::new(MockServer::new(
            server_id,
            self.catalogs.get(server_id).cloned().unwrap_or_default(),
        ));
        self.servers
            .lock()
            .unwrap()
            .insert(server_id.to_string(), Arc::clone(&server));
        Ok(server)
    }
}

/// Registry routing every transport kind to `factory`.
pub fn registry_with(factory: Arc<MockFactory>) -> Arc<ConnectionRegistry> {
    let mut factories = TransportFactories::new();
    for kind in [
        TransportKind::Stdio,
        TransportKind::Websocket,
        TransportKind::Sse,
        TransportKind::Http,
    ] {
        factories.register(kind, factory.clone());
    }
    Arc::new(ConnectionRegistry::new(factories).with_reconnect_policy(RetryPolicy::reconnect()))
}

pub fn ws_server(id: &str) -> ServerConfig {
    ServerConfig::websocket(id, format!("ws://localhost:9000/{id}"))
}
