//! WebSocket transport for the event feed

use super::{FeedConnection, FeedTransport};
use anyhow::Result;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

/// Production transport: dials the backend over WebSocket
pub struct WsTransport;

#[async_trait]
impl FeedTransport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedConnection>> {
        let (stream, _) = connect_async(url).await?;
        debug!(url = %url, "websocket connected");
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedConnection for WsConnection {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(error) => return Some(Err(error.into())),
                },
                Ok(Message::Ping(payload)) => {
                    // Protocol-level keepalive from the peer; answer and keep
                    // reading.
                    if let Err(error) = self.stream.send(Message::Pong(payload)).await {
                        return Some(Err(error.into()));
                    }
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Close(_)) => return None,
                Err(error) => return Some(Err(error.into())),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
