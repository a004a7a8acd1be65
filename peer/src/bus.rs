//! In-process broadcast fabric standing in for the group-messaging
//! transport: reliable, delivered to every attached peer including the
//! sender, FIFO per sender, fire-and-forget.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use minemesh_common::protocol::Envelope;

/// The peer registry. Frames are JSON-serialized envelopes, so anything a
/// peer receives went through the same serialize/parse path a real
/// transport would use.
#[derive(Debug, Default)]
pub struct LocalBus {
    peers: DashMap<Uuid, mpsc::UnboundedSender<String>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a peer and returns its attachment id plus frame inbox.
    pub fn attach(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.peers.insert(id, sender);
        debug!("Peer {} attached, total connections: {}", id, self.peers.len());
        (id, receiver)
    }

    pub fn detach(&self, id: &Uuid) {
        if self.peers.remove(id).is_some() {
            debug!(
                "Peer {} detached, remaining connections: {}",
                id,
                self.peers.len()
            );
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Serializes a named call and delivers it to every attached peer,
    /// including the sender. Fire-and-forget: closed inboxes are skipped.
    pub fn broadcast(&self, envelope: &Envelope) {
        let frame = match serde_json::to_string(envelope) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to serialize broadcast: {}", e);
                return;
            }
        };
        for entry in self.peers.iter() {
            let _ = entry.value().send(frame.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minemesh_common::protocol::PeerMessage;

    #[test]
    fn broadcast_reaches_every_peer_including_the_sender() {
        let bus = LocalBus::new();
        let (_id_a, mut inbox_a) = bus.attach();
        let (_id_b, mut inbox_b) = bus.attach();

        bus.broadcast(&Envelope {
            sender: 0,
            message: PeerMessage::StartTheGame,
        });

        let frame_a = inbox_a.try_recv().unwrap();
        let frame_b = inbox_b.try_recv().unwrap();
        assert_eq!(frame_a, frame_b);
        let parsed: Envelope = serde_json::from_str(&frame_a).unwrap();
        assert_eq!(parsed.message, PeerMessage::StartTheGame);
    }

    #[test]
    fn detached_peers_stop_receiving() {
        let bus = LocalBus::new();
        let (id, mut inbox) = bus.attach();
        bus.detach(&id);
        assert_eq!(bus.peer_count(), 0);

        bus.broadcast(&Envelope {
            sender: 0,
            message: PeerMessage::ClearGrid,
        });
        assert!(inbox.try_recv().is_err());
    }
}
