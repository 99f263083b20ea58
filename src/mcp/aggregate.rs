//! Multi-server tool aggregation with first-registered-wins routing.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;

use super::registry::ConnectionRegistry;
use crate::config::ServerConfig;
use crate::error::ToolmeshError;
use crate::tools::ToolDescriptor;
use crate::types::ToolCallResult;

/// Merges the catalogs of a set of tool-servers into one namespace.
///
/// Servers keep their configuration order. When two servers expose the same
/// tool name the earlier one owns it and later duplicates are dropped.
pub struct ToolAggregator {
    registry: Arc<ConnectionRegistry>,
    server_ids: Vec<String>,
    routes: RwLock<HashMap<String, String>>,
}

impl ToolAggregator {
    /// Launch every configured server through `registry`.
    ///
    /// If any launch fails, connections this call opened are disconnected
    /// again and the first failure (in configuration order) is returned.
    /// Connections reused from the registry are left alone.
    pub async fn load(
        registry: Arc<ConnectionRegistry>,
        configs: &[ServerConfig],
    ) -> Result<Self, ToolmeshError> {
        let results = join_all(
            configs
                .iter()
                .map(|config| registry.launch(&config.name, config)),
        )
        .await;

        let mut first_error = None;
        let mut opened = Vec::new();
        for (config, result) in configs.iter().zip(results) {
            match result {
                Ok(launch) if launch.opened => opened.push(&config.name),
                Ok(_) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            tracing::error!(error = %e, "Tool aggregator failed to load; rolling back");
            join_all(opened.iter().map(|id| registry.disconnect_server(id))).await;
            return Err(e);
        }

        tracing::info!(servers = configs.len(), "Tool aggregator loaded");
        Ok(Self {
            registry,
            server_ids: configs.iter().map(|config| config.name.clone()).collect(),
            routes: RwLock::new(HashMap::new()),
        })
    }

    /// Server ids in configuration order.
    pub fn server_ids(&self) -> &[String] {
        &self.server_ids
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Fetch and merge the catalogs of this aggregator's servers.
    ///
    /// Rebuilds the routing index on every call.
    pub async fn get_all_tools(&self) -> Vec<ToolDescriptor> {
        let mut catalogs = self
            .registry
            .get_all_tools()
            .await
            .into_iter()
            .map(|catalog| (catalog.server_id, catalog.tools))
            .collect::<HashMap<_, _>>();

        let mut descriptors = Vec::new();
        let mut routes = HashMap::new();
        for server_id in &self.server_ids {
            let Some(tools) = catalogs.remove(server_id) else {
                continue;
            };
            for tool in tools {
                if let Some(owner) = routes.get(&tool.name) {
                    tracing::warn!(
                        tool = %tool.name,
                        owner = %owner,
                        dropped = %server_id,
                        "Duplicate tool name; keeping first registered server"
                    );
                    continue;
                }
                routes.insert(tool.name.clone(), server_id.clone());
                descriptors.push(tool.to_descriptor(server_id));
            }
        }

        *self.routes.write().await = routes;
        descriptors
    }

    /// Owning server of `name`, as of the last catalog fetch.
    pub async fn find_tool(&self, name: &str) -> Option<String> {
        self.routes.read().await.get(name).cloned()
    }

    /// Route a call to the server owning `name`.
    ///
    /// Unknown names refresh the catalog once before failing with
    /// [`ToolmeshError::ToolNotFound`].
    pub async fn execute_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, ToolmeshError> {
        let owner = match self.find_tool(name).await {
            Some(owner) => owner,
            None => {
                self.get_all_tools().await;
                self.find_tool(name)
                    .await
                    .ok_or_else(|| ToolmeshError::ToolNotFound(name.to_string()))?
            }
        };

        let connection = self.registry.get_client(&owner).await.ok_or_else(|| {
            ToolmeshError::connection(&owner, "no live connection for tool-server")
        })?;

        tracing::debug!(tool = name, server_id = %owner, "Routing tool call");
        connection.client.call_tool(name, arguments).await
    }

    /// Disconnect this aggregator's servers. Other registry entries stay.
    pub async fn close(&self) {
        join_all(
            self.server_ids
                .iter()
                .map(|id| self.registry.disconnect_server(id)),
        )
        .await;
        self.routes.write().await.clear();
    }
}

impl std::fmt::Debug for ToolAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolAggregator")
            .field("server_ids", &self.server_ids)
            .finish_non_exhaustive()
    }
}
