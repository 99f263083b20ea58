//! Shared store of live tool-server connections.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use strum::Display;
use tokio::sync::{Mutex, RwLock};

use super::schema::ServerTools;
use super::transport::{ToolServerClient, TransportFactories};
use crate::config::{ServerConfig, TransportKind};
use crate::error::ToolmeshError;
use crate::util::retry::RetryPolicy;

/// Lifecycle state of one server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Failed,
}

/// A live connection. Cloning shares the underlying session.
#[derive(Clone)]
pub struct ServerConnection {
    pub id: String,
    pub kind: TransportKind,
    pub client: Arc<dyn ToolServerClient>,
}

impl std::fmt::Debug for ServerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConnection")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Result of [`ConnectionRegistry::launch`].
#[derive(Debug, Clone)]
pub struct Launch {
    pub connection: ServerConnection,
    /// `false` when an existing connection was reused.
    pub opened: bool,
}

/// Keyed store of live tool-server connections.
///
/// Shared behind an `Arc` by every aggregator and agent. Launch and
/// disconnect for one server id run one at a time, so concurrent launches of
/// an unseen id open a single transport.
pub struct ConnectionRegistry {
    factories: TransportFactories,
    reconnect: RetryPolicy,
    connections: RwLock<HashMap<String, ServerConnection>>,
    statuses: RwLock<HashMap<String, ConnectionStatus>>,
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConnectionRegistry {
    pub fn new(factories: TransportFactories) -> Self {
        Self {
            factories,
            reconnect: RetryPolicy::reconnect(),
            connections: RwLock::new(HashMap::new()),
            statuses: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Registry over the rmcp-backed transports.
    #[cfg(feature = "mcp")]
    pub fn with_default_transports() -> Self {
        Self::new(TransportFactories::with_default_transports())
    }

    /// Override the connection retry policy.
    pub fn with_reconnect_policy(mut self, policy: RetryPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn reconnect_policy(&self) -> &RetryPolicy {
        &self.reconnect
    }

    async fn gate(&self, id: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        Arc::clone(gates.entry(id.to_string()).or_default())
    }

    /// Drop the gate for `id` once no launch or disconnect holds or awaits it.
    async fn release_gate(&self, id: &str, gate: Arc<Mutex<()>>) {
        let mut gates = self.gates.lock().await;
        drop(gate);
        if gates.get(id).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            gates.remove(id);
        }
    }

    async fn set_status(&self, id: &str, status: ConnectionStatus) {
        self.statuses.write().await.insert(id.to_string(), status);
    }

    /// Return the connection for `id`, opening it first if needed.
    ///
    /// Connection attempts follow the reconnect policy. When it is exhausted
    /// the status becomes `Failed`, nothing is registered, and a
    /// [`ToolmeshError::Connection`] is returned.
    pub async fn launch_server(
        &self,
        id: &str,
        config: &ServerConfig,
    ) -> Result<ServerConnection, ToolmeshError> {
        self.launch(id, config).await.map(|launch| launch.connection)
    }

    /// Like [`launch_server`](Self::launch_server), also reporting whether
    /// this call opened the connection.
    pub async fn launch(&self, id: &str, config: &ServerConfig) -> Result<Launch, ToolmeshError> {
        if let Some(connection) = self.get_client(id).await {
            return Ok(Launch {
                connection,
                opened: false,
            });
        }

        let gate = self.gate(id).await;
        let result = {
            let _guard = gate.lock().await;
            self.launch_gated(id, config).await
        };
        self.release_gate(id, gate).await;
        result
    }

    async fn launch_gated(&self, id: &str, config: &ServerConfig) -> Result<Launch, ToolmeshError> {
        if let Some(connection) = self.get_client(id).await {
            tracing::debug!(server_id = id, "Reusing connection opened concurrently");
            return Ok(Launch {
                connection,
                opened: false,
            });
        }

        config.validate()?;
        let kind = config.kind();
        let factory = self.factories.get(kind).ok_or_else(|| {
            ToolmeshError::Configuration(format!("No transport registered for '{kind}'"))
        })?;

        self.set_status(id, ConnectionStatus::Connecting).await;
        tracing::info!(server_id = id, transport = %kind, "Connecting to tool-server");

        match self.reconnect.execute(|| factory.connect(id, config)).await {
            Ok(client) => {
                let connection = ServerConnection {
                    id: id.to_string(),
                    kind,
                    client,
                };
                self.connections
                    .write()
                    .await
                    .insert(id.to_string(), connection.clone());
                self.set_status(id, ConnectionStatus::Connected).await;
                tracing::info!(server_id = id, transport = %kind, "Connected to tool-server");
                Ok(Launch {
                    connection,
                    opened: true,
                })
            }
            Err(e) => {
                self.set_status(id, ConnectionStatus::Failed).await;
                tracing::error!(server_id = id, error = %e, "Failed to connect to tool-server");
                Err(match e {
                    ToolmeshError::Connection { .. } => e,
                    other => ToolmeshError::connection(id, other.to_string()),
                })
            }
        }
    }

    pub async fn get_client(&self, id: &str) -> Option<ServerConnection> {
        self.connections.read().await.get(id).cloned()
    }

    /// Snapshot of every live connection, ordered by id.
    pub async fn get_all_clients(&self) -> Vec<ServerConnection> {
        let mut clients = self
            .connections
            .read()
            .await
            .values()
            .cloned()
            .collect::<Vec<_>>();
        clients.sort_by(|left, right| left.id.cmp(&right.id));
        clients
    }

    pub async fn status(&self, id: &str) -> Option<ConnectionStatus> {
        self.statuses.read().await.get(id).copied()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.connections.read().await.contains_key(id)
    }

    /// Close and remove one connection. Unknown ids and close failures are
    /// logged, never returned.
    ///
    /// A launch in flight for `id` is awaited first. For an id with no
    /// connection only a `Failed` status is cleared.
    pub async fn disconnect_server(&self, id: &str) {
        if !self.contains(id).await && self.status(id).await != Some(ConnectionStatus::Connecting) {
            let mut statuses = self.statuses.write().await;
            if statuses.get(id) == Some(&ConnectionStatus::Failed) {
                statuses.remove(id);
            }
            tracing::info!(server_id = id, "No connection to disconnect");
            return;
        }

        let gate = self.gate(id).await;
        {
            let _guard = gate.lock().await;
            self.statuses.write().await.remove(id);
            let removed = self.connections.write().await.remove(id);
            match removed {
                None => tracing::info!(server_id = id, "No connection to disconnect"),
                Some(connection) => match connection.client.close().await {
                    Ok(()) => tracing::info!(server_id = id, "Disconnected from tool-server"),
                    Err(e) => tracing::error!(
                        server_id = id,
                        error = %e,
                        "Failed to close tool-server connection"
                    ),
                },
            }
        }
        self.release_gate(id, gate).await;
    }

    /// Close every connection concurrently, including ones whose launch is
    /// still in flight. The registry is empty afterward.
    pub async fn disconnect_all(&self) {
        loop {
            let ids = self.tracked_ids().await;
            if ids.is_empty() {
                break;
            }
            join_all(ids.iter().map(|id| self.disconnect_server(id))).await;
        }
    }

    /// Ids with a live connection or a launch in progress.
    async fn tracked_ids(&self) -> Vec<String> {
        let mut ids = self
            .connections
            .read()
            .await
            .keys()
            .cloned()
            .collect::<HashSet<_>>();
        ids.extend(
            self.statuses
                .read()
                .await
                .iter()
                .filter(|(_, status)| **status == ConnectionStatus::Connecting)
                .map(|(id, _)| id.clone()),
        );
        ids.into_iter().collect()
    }

    #[cfg(test)]
    async fn gate_count(&self) -> usize {
        self.gates.lock().await.len()
    }

    /// Fetch every connection's catalog concurrently, ordered by server id.
    ///
    /// A connection whose catalog cannot be listed contributes no tools.
    pub async fn get_all_tools(&self) -> Vec<ServerTools> {
        let clients = self.get_all_clients().await;
        join_all(clients.into_iter().map(|connection| async move {
            let tools = match connection.client.list_tools().await {
                Ok(tools) => tools,
                Err(e) => {
                    tracing::warn!(
                        server_id = %connection.id,
                        error = %e,
                        "Failed to list tools; treating catalog as empty"
                    );
                    Vec::new()
                }
            };
            ServerTools {
                server_id: connection.id,
                tools,
            }
        }))
        .await
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("factories", &self.factories)
            .field("reconnect", &self.reconnect)
            .finish_non_exhaustive()
    }
}
