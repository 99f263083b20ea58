use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::ClientInfo;
use rmcp::service::ServiceExt;
use rmcp::transport::TokioChildProcess;
use tokio::process::Command;

use super::{ToolServerClient, TransportFactory};
use crate::config::{ServerConfig, TransportConfig};
use crate::error::ToolmeshError;
use crate::mcp::client::RmcpClient;

/// Spawns the server as a child process and speaks JSON-RPC over its stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioTransportFactory;

pub(super) fn build_command(server_id: &str, config: &ServerConfig) -> Result<Command, ToolmeshError> {
    let TransportConfig::Stdio { command, args, env } = &config.transport else {
        return Err(ToolmeshError::Configuration(format!(
            "Tool-server '{server_id}' is not a stdio server"
        )));
    };

    let mut cmd = Command::new(command);
    cmd.args(args);
    for (key, value) in env {
        cmd.env(key, value);
    }
    Ok(cmd)
}

#[async_trait]
impl TransportFactory for StdioTransportFactory {
    async fn connect(
        &self,
        server_id: &str,
        config: &ServerConfig,
    ) -> Result<Arc<dyn ToolServerClient>, ToolmeshError> {
        let command = build_command(server_id, config)?;
        tracing::debug!(server_id, command = ?command.as_std(), "Spawning stdio tool-server");

        let transport = TokioChildProcess::new(command).map_err(|e| {
            ToolmeshError::connection(server_id, format!("failed to spawn process: {e}"))
        })?;

        let result = ClientInfo::default().into_dyn().serve(transport).await;
        let client = RmcpClient::from_running_service_result(server_id, result)?;
        Ok(Arc::new(client))
    }
}
