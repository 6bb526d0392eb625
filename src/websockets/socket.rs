use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::stream::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::messages::{ControlMessage, ControlReply};
use crate::event::TopicKey;
use crate::schema::WireFormat;
use crate::subscriber::{ChannelReceiver, Subscriber, TopicIndex};

/// A single data frame, independent of the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Wraps an encoded event: JSON goes out as text, MessagePack as binary
    pub fn from_encoded(format: WireFormat, bytes: &Bytes) -> Option<Self> {
        match format {
            WireFormat::Json => std::str::from_utf8(bytes)
                .ok()
                .map(|text| Frame::Text(text.to_string())),
            WireFormat::MessagePack => Some(Frame::Binary(bytes.to_vec())),
        }
    }
}

/// Simple WebSocket abstraction - all we care about is send/receive
#[async_trait]
pub trait SocketWrapper: Send {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), SocketError>;

    /// Next data frame from the client (None if connection closed)
    async fn receive_frame(&mut self) -> Result<Option<Frame>, SocketError>;

    async fn close(&mut self) -> Result<(), SocketError>;
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), SocketError> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data),
        };
        self.send(message)
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_frame(&mut self) -> Result<Option<Frame>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(Frame::Text(text))),
                Some(Ok(Message::Binary(data))) => return Ok(Some(Frame::Binary(data))),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // axum answers pings itself
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// One subscriber's live connection
///
/// Pumps the subscriber's outbound queue to the socket and applies control
/// frames coming back until either side goes away. The subscriber is always
/// disconnected from the index when the connection ends.
pub struct Connection {
    subscriber: Arc<Subscriber>,
    socket: Box<dyn SocketWrapper>,
    outbound: ChannelReceiver,
    index: TopicIndex,
}

impl Connection {
    pub fn new(
        subscriber: Arc<Subscriber>,
        socket: Box<dyn SocketWrapper>,
        outbound: ChannelReceiver,
        index: TopicIndex,
    ) -> Self {
        Self {
            subscriber,
            socket,
            outbound,
            index,
        }
    }

    pub fn subscriber(&self) -> &Arc<Subscriber> {
        &self.subscriber
    }

    /// Run the connection - handles both sending and receiving until disconnect
    pub async fn run(mut self) -> Result<(), SocketError> {
        let result = self.pump().await;

        self.index.disconnect(&self.subscriber);
        if let Err(e) = self.socket.close().await {
            debug!(
                subscriber = %self.subscriber.id(),
                error = %e,
                "Socket close failed"
            );
        }
        result
    }

    async fn pump(&mut self) -> Result<(), SocketError> {
        let format = self.subscriber.format();

        loop {
            tokio::select! {
                // Encoded events waiting in the subscriber's queue
                frame = self.outbound.recv() => {
                    match frame {
                        Some(bytes) => match Frame::from_encoded(format, &bytes) {
                            Some(frame) => self.socket.send_frame(frame).await?,
                            None => error!(
                                subscriber = %self.subscriber.id(),
                                "Dropping frame that is not valid UTF-8"
                            ),
                        },
                        None => {
                            info!(
                                subscriber = %self.subscriber.id(),
                                reason = ?self.outbound.close_reason(),
                                "Outbound channel closed"
                            );
                            break;
                        }
                    }
                }

                // Control frames from the client
                frame = self.socket.receive_frame() => {
                    match frame {
                        Ok(Some(frame)) => self.handle_control(frame).await?,
                        Ok(None) => break,
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        Ok(())
    }

    async fn handle_control(&mut self, frame: Frame) -> Result<(), SocketError> {
        let reply = match ControlMessage::decode(&frame) {
            Ok(ControlMessage::Subscribe { topic }) => self.subscribe(topic),
            Ok(ControlMessage::Unsubscribe { topic }) => {
                self.index.unsubscribe(&topic, &self.subscriber);
                ControlReply::Unsubscribed { topic }
            }
            Ok(ControlMessage::Ping) => ControlReply::Pong,
            Err(e) => {
                warn!(subscriber = %self.subscriber.id(), error = %e, "Bad control frame");
                ControlReply::error(e.to_string())
            }
        };

        match reply.encode(self.subscriber.format()) {
            Ok(frame) => self.socket.send_frame(frame).await,
            Err(e) => {
                error!(subscriber = %self.subscriber.id(), error = %e, "Failed to encode reply");
                Ok(())
            }
        }
    }

    fn subscribe(&self, topic: String) -> ControlReply {
        let key = TopicKey::new(topic);
        if key.is_empty() {
            return ControlReply::error("topic must not be empty");
        }

        match self.index.subscribe(&key, &self.subscriber) {
            Ok(_) => {
                debug!(subscriber = %self.subscriber.id(), topic = %key, "Client subscribed");
                ControlReply::Subscribed {
                    topic: key.to_string(),
                }
            }
            Err(e) => ControlReply::error(e.to_string()),
        }
    }
}
