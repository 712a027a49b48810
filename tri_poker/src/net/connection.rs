//! Opaque per-participant message channels.
//!
//! The host only ever sees a [`Connection`]: a stream of inbound text lines
//! and a sender for outbound [`ServerMessage`]s. Whatever sits on the other
//! side, a TCP socket or a test, holds the matching [`Remote`].

use tokio::sync::mpsc;

use super::messages::ServerMessage;
use crate::game::entities::Username;

/// Inbound lines waiting to be read by a handler.
pub const INBOUND_BUFFER: usize = 32;

/// Host-side sender of outbound messages. Dropping every clone closes the
/// participant's channel.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// Host-side receiver of inbound lines. `None` from `recv` means the
/// participant disconnected.
pub type Inbox = mpsc::Receiver<String>;

/// The host's end of a participant channel.
#[derive(Debug)]
pub struct Connection {
    pub inbound: Inbox,
    pub outbound: Outbox,
}

/// The participant's end of a channel.
#[derive(Debug)]
pub struct Remote {
    pub to_host: mpsc::Sender<String>,
    pub from_host: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Connection {
    /// Create a connected host/participant pair.
    pub fn pair() -> (Connection, Remote) {
        let (to_host, inbound) = mpsc::channel(INBOUND_BUFFER);
        let (outbound, from_host) = mpsc::unbounded_channel();
        (
            Connection { inbound, outbound },
            Remote { to_host, from_host },
        )
    }
}

impl Remote {
    /// Send one line to the host. Returns `false` once the host side is gone.
    pub async fn send_line(&self, line: &str) -> bool {
        self.to_host.send(line.to_string()).await.is_ok()
    }

    /// Next message from the host, or `None` after the host closed the
    /// channel.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.from_host.recv().await
    }

    /// Drain everything the host has sent so far without waiting.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.from_host.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

/// A connection that has sent its username and is waiting to be seated.
#[derive(Debug)]
pub struct PendingJoin {
    pub username: Username,
    pub connection: Connection,
}

impl PendingJoin {
    pub fn new(username: Username, connection: Connection) -> Self {
        Self {
            username,
            connection,
        }
    }
}
