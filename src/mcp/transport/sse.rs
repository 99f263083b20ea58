//! Legacy HTTP+SSE transport.
//!
//! A long-lived `GET` event stream carries server messages. The server
//! announces a message endpoint in its first `endpoint` event and the client
//! `POST`s every JSON-RPC message there.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use reqwest_eventsource::{retry::Never, Error as EventSourceError, Event, EventSource};
use rmcp::model::ClientInfo;
use rmcp::service::{RoleClient, RxJsonRpcMessage, ServiceExt, TxJsonRpcMessage};
use rmcp::transport::Transport;
use thiserror::Error;

use super::http::header_map;
use super::{ToolServerClient, TransportFactory};
use crate::config::{ServerConfig, TransportConfig};
use crate::error::ToolmeshError;
use crate::mcp::client::RmcpClient;

const ENDPOINT_EVENT: &str = "endpoint";
const MESSAGE_EVENT: &str = "message";

#[derive(Debug, Error)]
pub enum SseTransportError {
    #[error("SSE request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SSE stream failed: {0}")]
    Stream(String),

    #[error("SSE stream closed before the server announced its message endpoint")]
    NoEndpoint,

    #[error("Invalid SSE endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },
}

/// JSON-RPC over a server-sent event stream plus `POST`ed requests.
pub struct SseTransport {
    http: reqwest::Client,
    endpoint: Url,
    events: EventSource,
}

impl SseTransport {
    /// Open the event stream at `url` and wait for the endpoint announcement.
    pub async fn connect(http: reqwest::Client, url: &str) -> Result<Self, SseTransportError> {
        let base = Url::parse(url).map_err(|e| SseTransportError::InvalidEndpoint {
            endpoint: url.to_string(),
            message: e.to_string(),
        })?;

        let mut events = EventSource::new(http.get(base.clone())).map_err(|_| {
            SseTransportError::Stream("event stream request cannot be cloned".into())
        })?;
        events.set_retry_policy(Box::new(Never));

        while let Some(event) = events.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(message)) if message.event == ENDPOINT_EVENT => {
                    let endpoint = resolve_endpoint(&base, &message.data)?;
                    tracing::debug!(endpoint = %endpoint, "SSE message endpoint announced");
                    return Ok(Self {
                        http,
                        endpoint,
                        events,
                    });
                }
                Ok(Event::Message(message)) => {
                    tracing::debug!(event = %message.event, "Ignoring SSE event before endpoint");
                }
                Err(EventSourceError::StreamEnded) => break,
                Err(e) => {
                    events.close();
                    return Err(SseTransportError::Stream(e.to_string()));
                }
            }
        }

        events.close();
        Err(SseTransportError::NoEndpoint)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Resolve the announced endpoint (absolute or relative) against the stream URL.
fn resolve_endpoint(base: &Url, data: &str) -> Result<Url, SseTransportError> {
    let data = data.trim();
    base.join(data)
        .map_err(|e| SseTransportError::InvalidEndpoint {
            endpoint: data.to_string(),
            message: e.to_string(),
        })
}

impl Transport<RoleClient> for SseTransport {
    type Error = SseTransportError;

    fn send(
        &mut self,
        item: TxJsonRpcMessage<RoleClient>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        async move {
            http.post(endpoint)
                .json(&item)
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        }
    }

    fn receive(&mut self) -> impl Future<Output = Option<RxJsonRpcMessage<RoleClient>>> + Send {
        async move {
            loop {
                match self.events.next().await? {
                    Ok(Event::Message(message)) if message.event == MESSAGE_EVENT => {
                        match serde_json::from_str::<RxJsonRpcMessage<RoleClient>>(&message.data) {
                            Ok(message) => return Some(message),
                            Err(e) => {
                                tracing::warn!(error = %e, "Dropping unparseable SSE message");
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(EventSourceError::StreamEnded) => {
                        tracing::info!(endpoint = %self.endpoint, "SSE stream ended");
                        return None;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "SSE stream failed");
                        self.events.close();
                        return None;
                    }
                }
            }
        }
    }

    fn close(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.events.close();
        std::future::ready(Ok(()))
    }
}

/// Connects `sse` servers over the legacy HTTP+SSE protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct SseTransportFactory;

#[async_trait]
impl TransportFactory for SseTransportFactory {
    async fn connect(
        &self,
        server_id: &str,
        config: &ServerConfig,
    ) -> Result<Arc<dyn ToolServerClient>, ToolmeshError> {
        let TransportConfig::Sse { url, headers } = &config.transport else {
            return Err(ToolmeshError::Configuration(format!(
                "Tool-server '{server_id}' is not an sse server"
            )));
        };

        let http = reqwest::Client::builder()
            .default_headers(header_map(server_id, headers)?)
            .build()
            .map_err(|e| ToolmeshError::connection(server_id, format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(server_id, url = %url, "Opening SSE session");
        let transport = SseTransport::connect(http, url)
            .await
            .map_err(|e| ToolmeshError::connection(server_id, format!("SSE connect failed: {e}")))?;

        let result = ClientInfo::default().into_dyn().serve(transport).await;
        let client = RmcpClient::from_running_service_result(server_id, result)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost:8080/sse").unwrap()
    }

    #[test]
    fn relative_endpoint_keeps_host_and_query() {
        let endpoint = resolve_endpoint(&base(), "/messages?sessionId=abc\n").unwrap();
        assert_eq!(endpoint.as_str(), "http://localhost:8080/messages?sessionId=abc");
    }

    #[test]
    fn absolute_endpoint_replaces_base() {
        let endpoint = resolve_endpoint(&base(), "https://rpc.example.com/messages").unwrap();
        assert_eq!(endpoint.as_str(), "https://rpc.example.com/messages");
    }

    #[tokio::test]
    async fn invalid_stream_url_is_rejected() {
        let err = match SseTransport::connect(reqwest::Client::new(), "not a url").await {
            Ok(_) => panic!("invalid url should be rejected"),
            Err(err) => err,
        };
        assert!(matches!(err, SseTransportError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn non_sse_config_is_rejected() {
        let config = ServerConfig::http("api", "https://example.com/mcp");
        let err = match SseTransportFactory.connect("api", &config).await {
            Ok(_) => panic!("http config should be rejected"),
            Err(err) => err,
        };
        assert!(matches!(err, ToolmeshError::Configuration(_)));
    }
}
