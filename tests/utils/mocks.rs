#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use eventcast::websockets::{ControlMessage, Frame, SocketError, SocketWrapper};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Server side of an in-memory socket pair
pub struct MockSocket {
    inbound: mpsc::UnboundedReceiver<Frame>,
    sent: mpsc::UnboundedSender<Frame>,
    closed: Arc<AtomicBool>,
}

/// Client side of an in-memory socket pair
pub struct MockClient {
    inbound: Option<mpsc::UnboundedSender<Frame>>,
    sent: mpsc::UnboundedReceiver<Frame>,
    closed: Arc<AtomicBool>,
}

pub fn mock_socket() -> (MockSocket, MockClient) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));

    (
        MockSocket {
            inbound: inbound_rx,
            sent: sent_tx,
            closed: Arc::clone(&closed),
        },
        MockClient {
            inbound: Some(inbound_tx),
            sent: sent_rx,
            closed,
        },
    )
}

#[async_trait]
impl SocketWrapper for MockSocket {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), SocketError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SocketError::ConnectionClosed);
        }
        self.sent
            .send(frame)
            .map_err(|_| SocketError::ConnectionClosed)
    }

    async fn receive_frame(&mut self) -> Result<Option<Frame>, SocketError> {
        Ok(self.inbound.recv().await)
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(SocketError::ConnectionClosed);
        }
        Ok(())
    }
}

impl MockClient {
    pub fn send(&self, frame: Frame) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(frame);
        }
    }

    pub fn send_control(&self, message: &ControlMessage) {
        self.send(Frame::Text(serde_json::to_string(message).unwrap()));
    }

    pub fn subscribe(&self, topic: &str) {
        self.send_control(&ControlMessage::Subscribe {
            topic: topic.to_string(),
        });
    }

    pub fn unsubscribe(&self, topic: &str) {
        self.send_control(&ControlMessage::Unsubscribe {
            topic: topic.to_string(),
        });
    }

    /// Next frame the server sent, waiting up to a second
    pub async fn next_frame(&mut self) -> Option<Frame> {
        tokio::time::timeout(Duration::from_secs(1), self.sent.recv())
            .await
            .ok()
            .flatten()
    }

    /// True if nothing arrives within a short grace period
    pub async fn is_silent(&mut self) -> bool {
        tokio::time::timeout(Duration::from_millis(50), self.sent.recv())
            .await
            .is_err()
    }

    /// Closes the client's half; the server sees end of stream
    pub fn hang_up(&mut self) {
        self.inbound.take();
    }

    /// Tears the connection down from the client side, so the server's own
    /// close fails
    pub fn drop_connection(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.hang_up();
    }

    pub fn was_closed_by_server(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
