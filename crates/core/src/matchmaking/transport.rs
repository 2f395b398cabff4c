//! Matchmaking socket transport.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::MatchmakingError;

/// Opens authorized sockets to a matchmaking service.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        authorization: &str,
    ) -> Result<Box<dyn FrameStream>, MatchmakingError>;
}

/// Inbound text frames of an open socket.
#[async_trait]
pub trait FrameStream: Send {
    /// Next frame, or `None` once the peer closed the stream.
    async fn next_frame(&mut self) -> Option<Result<String, MatchmakingError>>;

    /// Close the socket. Safe to call more than once.
    async fn close(&mut self);
}

/// WebSocket connector built on `tokio-tungstenite`.
#[derive(Debug, Default, Clone)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SocketConnector for WsConnector {
    async fn connect(
        &self,
        url: &str,
        authorization: &str,
    ) -> Result<Box<dyn FrameStream>, MatchmakingError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| MatchmakingError::transport(format!("invalid socket url: {}", e)))?;
        let value = HeaderValue::from_str(authorization)
            .map_err(|e| MatchmakingError::transport(format!("invalid authorization: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, value);

        let (ws, response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| MatchmakingError::transport(e.to_string()))?;
        debug!(status = response.status().as_u16(), "Matchmaking socket connected");

        Ok(Box::new(WsFrameStream { ws, closed: false }))
    }
}

struct WsFrameStream {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl FrameStream for WsFrameStream {
    async fn next_frame(&mut self) -> Option<Result<String, MatchmakingError>> {
        if self.closed {
            return None;
        }
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text.as_str().to_string())),
                Some(Ok(Message::Binary(data))) => {
                    return Some(Ok(String::from_utf8_lossy(&data).into_owned()))
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(frame = ?frame, "Matchmaking socket closed by peer");
                    self.closed = true;
                    return None;
                }
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => return Some(Err(MatchmakingError::transport(e.to_string()))),
                None => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.ws.close(None).await {
            debug!(error = %e, "Socket close failed");
        }
    }
}
