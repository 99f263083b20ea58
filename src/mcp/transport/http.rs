use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::model::ClientInfo;
use rmcp::service::ServiceExt;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;

use super::{ToolServerClient, TransportFactory};
use crate::config::{ServerConfig, TransportConfig};
use crate::error::ToolmeshError;
use crate::mcp::client::RmcpClient;

/// Connects `http` servers through the streamable HTTP client.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamableHttpTransportFactory;

pub(super) fn header_map(
    server_id: &str,
    headers: &BTreeMap<String, String>,
) -> Result<HeaderMap, ToolmeshError> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            ToolmeshError::Configuration(format!(
                "Tool-server '{server_id}': invalid header name '{key}': {e}"
            ))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ToolmeshError::Configuration(format!(
                "Tool-server '{server_id}': invalid header value for '{key}': {e}"
            ))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl TransportFactory for StreamableHttpTransportFactory {
    async fn connect(
        &self,
        server_id: &str,
        config: &ServerConfig,
    ) -> Result<Arc<dyn ToolServerClient>, ToolmeshError> {
        let (url, headers) = match &config.transport {
            TransportConfig::Http { url, headers } => (url, headers),
            _ => {
                return Err(ToolmeshError::Configuration(format!(
                    "Tool-server '{server_id}' is not an http server"
                )))
            }
        };

        let http = reqwest::Client::builder()
            .default_headers(header_map(server_id, headers)?)
            .build()
            .map_err(|e| ToolmeshError::connection(server_id, format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(server_id, url = %url, "Opening streamable HTTP session");
        let transport = StreamableHttpClientTransport::with_client(
            http,
            StreamableHttpClientTransportConfig::with_uri(url.clone()),
        );

        let result = ClientInfo::default().into_dyn().serve(transport).await;
        let client = RmcpClient::from_running_service_result(server_id, result)?;
        Ok(Arc::new(client))
    }
}
