use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use rmcp::model::ClientInfo;
use rmcp::service::{RoleClient, RxJsonRpcMessage, ServiceExt, TxJsonRpcMessage};
use rmcp::transport::Transport;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

use super::{ToolServerClient, TransportFactory};
use crate::config::{ServerConfig, TransportConfig};
use crate::error::ToolmeshError;
use crate::mcp::client::RmcpClient;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// JSON-RPC over WebSocket text frames, one message per frame.
pub struct WebSocketTransport {
    sink: Arc<Mutex<SplitSink<WsStream, Message>>>,
    stream: SplitStream<WsStream>,
}

impl WebSocketTransport {
    pub async fn connect(url: &str) -> Result<Self, WsError> {
        let (socket, _response) = connect_async(url).await?;
        let (sink, stream) = socket.split();
        Ok(Self {
            sink: Arc::new(Mutex::new(sink)),
            stream,
        })
    }
}

impl Transport<RoleClient> for WebSocketTransport {
    type Error = WsError;

    fn send(
        &mut self,
        item: TxJsonRpcMessage<RoleClient>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let sink = Arc::clone(&self.sink);
        async move {
            let payload = serde_json::to_string(&item)
                .map_err(|e| WsError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
            sink.lock().await.send(Message::Text(payload)).await
        }
    }

    fn receive(&mut self) -> impl Future<Output = Option<RxJsonRpcMessage<RoleClient>>> + Send {
        async move {
            loop {
                match self.stream.next().await? {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<RxJsonRpcMessage<RoleClient>>(&text) {
                            Ok(message) => return Some(message),
                            Err(e) => {
                                tracing::warn!(error = %e, "Dropping unparseable WebSocket frame");
                            }
                        }
                    }
                    Ok(Message::Close(_)) => return None,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "WebSocket read failed");
                        return None;
                    }
                }
            }
        }
    }

    fn close(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let sink = Arc::clone(&self.sink);
        async move {
            match sink.lock().await.close().await {
                Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
                Err(e) => Err(e),
            }
        }
    }
}

/// Connects `websocket` (alias `ws`) servers.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransportFactory;

#[async_trait]
impl TransportFactory for WebSocketTransportFactory {
    async fn connect(
        &self,
        server_id: &str,
        config: &ServerConfig,
    ) -> Result<Arc<dyn ToolServerClient>, ToolmeshError> {
        let TransportConfig::Websocket { url } = &config.transport else {
            return Err(ToolmeshError::Configuration(format!(
                "Tool-server '{server_id}' is not a websocket server"
            )));
        };

        tracing::debug!(server_id, "Opening WebSocket session");
        let transport = WebSocketTransport::connect(url)
            .await
            .map_err(|e| ToolmeshError::connection(server_id, format!("WebSocket connect failed: {e}")))?;

        let result = ClientInfo::default().into_dyn().serve(transport).await;
        let client = RmcpClient::from_running_service_result(server_id, result)?;
        Ok(Arc::new(client))
    }
}
