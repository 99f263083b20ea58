use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ToolServerClient, TransportFactory};
use crate::config::ServerConfig;
use crate::error::ToolmeshError;
use crate::mcp::schema::McpToolSchema;
use crate::types::ToolCallResult;

pub(crate) fn tool(name: &str) -> McpToolSchema {
    McpToolSchema::new(
        name,
        format!("{name} tool"),
        serde_json::json!({"type": "object", "properties": {}}),
    )
}

/// Client answering every call with `"<server>:<tool>"`.
pub(crate) struct StaticClient {
    pub server_id: String,
    pub tools: Vec<McpToolSchema>,
    pub fail_list: AtomicBool,
    pub fail_close: AtomicBool,
    pub closes: AtomicUsize,
    pub closed: AtomicBool,
}

impl StaticClient {
    pub(crate) fn new(server_id: &str, tools: Vec<McpToolSchema>) -> Self {
        Self {
            server_id: server_id.to_string(),
            tools,
            fail_list: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            closes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ToolServerClient for StaticClient {
    async fn list_tools(&self) -> Result<Vec<McpToolSchema>, ToolmeshError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ToolmeshError::Transport("list_tools: broken pipe".into()));
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        _arguments: serde_json::Value,
    ) -> Result<ToolCallResult, ToolmeshError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ToolmeshError::Transport("session closed".into()));
        }
        Ok(ToolCallResult::text(format!("{}:{name}", self.server_id)))
    }

    async fn close(&self) -> Result<(), ToolmeshError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(ToolmeshError::Transport("close: already gone".into()));
        }
        Ok(())
    }
}

/// Factory that counts connection attempts and can fail some of them.
pub(crate) struct CountingFactory {
    connects: AtomicUsize,
    failures_left: AtomicUsize,
    connect_delay: Option<Duration>,
    default_tools: Vec<McpToolSchema>,
    catalogs: HashMap<String, Vec<McpToolSchema>>,
    broken: HashSet<String>,
    pub clients: std::sync::Mutex<Vec<Arc<StaticClient>>>,
}

impl CountingFactory {
    pub(crate) fn new(default_tools: Vec<McpToolSchema>) -> Self {
        Self {
            connects: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            connect_delay: None,
            default_tools,
            catalogs: HashMap::new(),
            broken: HashSet::new(),
            clients: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn healthy(tools: Vec<McpToolSchema>) -> Arc<Self> {
        Arc::new(Self::new(tools))
    }

    /// Fail the first `failures` attempts, whatever the server.
    pub(crate) fn failing_first(mut self, failures: usize) -> Self {
        self.failures_left = AtomicUsize::new(failures);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub(crate) fn with_catalog(mut self, server_id: &str, tools: Vec<McpToolSchema>) -> Self {
        self.catalogs.insert(server_id.to_string(), tools);
        self
    }

    /// Every attempt for `server_id` fails.
    pub(crate) fn with_broken(mut self, server_id: &str) -> Self {
        self.broken.insert(server_id.to_string());
        self
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn client(&self, server_id: &str) -> Option<Arc<StaticClient>> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .find(|client| client.server_id == server_id)
            .cloned()
    }
}

#[async_trait]
impl TransportFactory for CountingFactory {
    async fn connect(
        &self,
        server_id: &str,
        _config: &ServerConfig,
    ) -> Result<Arc<dyn ToolServerClient>, ToolmeshError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let scripted_failure = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if scripted_failure || self.broken.contains(server_id) {
            return Err(ToolmeshError::Transport(format!("{server_id}: connection refused")));
        }
        let tools = self
            .catalogs
            .get(server_id)
            .cloned()
            .unwrap_or_else(|| self.default_tools.clone());
        let client = Arc::new(StaticClient::new(server_id, tools));
        self.clients.lock().unwrap().push(Arc::clone(&client));
        Ok(client)
    }
}
