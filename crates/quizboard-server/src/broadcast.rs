use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::mpsc;

use quizboard_core::net::messages::ServerMessage;
use quizboard_core::net::protocol::encode_server_message;
use quizboard_core::player::ConnectionId;

/// Per-connection sender for outbound WebSocket binary messages.
/// Bounded by `limits.player_message_buffer`; `Bytes` keeps fan-out zero-copy.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Live connections attached to one room. Owned by the room actor, so no
/// locking is needed.
#[derive(Debug, Default)]
pub struct Members {
    room: String,
    senders: HashMap<ConnectionId, PlayerSender>,
}

impl Members {
    pub fn new(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            senders: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection: ConnectionId, sender: PlayerSender) {
        self.senders.insert(connection, sender);
    }

    pub fn remove(&mut self, connection: ConnectionId) -> Option<PlayerSender> {
        self.senders.remove(&connection)
    }

    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.senders.contains_key(&connection)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Send to a single connection.
    pub fn send_to(&self, connection: ConnectionId, msg: &ServerMessage) {
        let Some(sender) = self.senders.get(&connection) else {
            return;
        };
        if let Some(bytes) = self.encode(msg) {
            self.push(connection, sender, bytes);
        }
    }

    /// Send to every connection in the room.
    pub fn broadcast(&self, msg: &ServerMessage) {
        let Some(bytes) = self.encode(msg) else {
            return;
        };
        for (&id, sender) in &self.senders {
            self.push(id, sender, bytes.clone());
        }
    }

    /// Send to every connection except `exclude`.
    pub fn broadcast_except(&self, exclude: ConnectionId, msg: &ServerMessage) {
        let Some(bytes) = self.encode(msg) else {
            return;
        };
        for (&id, sender) in &self.senders {
            if id != exclude {
                self.push(id, sender, bytes.clone());
            }
        }
    }

    fn encode(&self, msg: &ServerMessage) -> Option<Bytes> {
        match encode_server_message(msg) {
            Ok(data) => Some(Bytes::from(data)),
            Err(e) => {
                tracing::error!(room = %self.room, error = %e, "Failed to encode server message");
                None
            },
        }
    }

    fn push(&self, id: ConnectionId, sender: &PlayerSender, bytes: Bytes) {
        if let Err(e) = sender.try_send(bytes) {
            tracing::debug!(
                player_id = id, room = %self.room, error = %e,
                "Skipping broadcast to slow client"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizboard_core::net::messages::RemovedFromRoomMsg;
    use quizboard_core::net::protocol::decode_server_message;

    fn notice() -> ServerMessage {
        ServerMessage::RemovedFromRoom(RemovedFromRoomMsg {
            code: "ABC123".to_string(),
        })
    }

    #[test]
    fn broadcast_reaches_everyone() {
        let mut members = Members::new("ABC123");
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        members.insert(1, tx1);
        members.insert(2, tx2);

        members.broadcast(&notice());
        for rx in [&mut rx1, &mut rx2] {
            let data = rx.try_recv().unwrap();
            assert_eq!(decode_server_message(&data).unwrap(), notice());
        }
    }

    #[test]
    fn broadcast_except_skips_one() {
        let mut members = Members::new("ABC123");
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        members.insert(1, tx1);
        members.insert(2, tx2);

        members.broadcast_except(1, &notice());
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn send_to_targets_one_connection() {
        let mut members = Members::new("ABC123");
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        members.insert(1, tx1);
        members.insert(2, tx2);

        members.send_to(2, &notice());
        members.send_to(99, &notice());
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn full_channel_drops_without_blocking() {
        let mut members = Members::new("ABC123");
        let (tx, mut rx) = mpsc::channel(1);
        members.insert(1, tx);

        members.broadcast(&notice());
        members.broadcast(&notice());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn remove_detaches_connection() {
        let mut members = Members::new("ABC123");
        let (tx, _rx) = mpsc::channel(1);
        members.insert(7, tx);
        assert!(members.contains(7));
        assert!(members.remove(7).is_some());
        assert!(members.is_empty());
    }
}
