//! Broadcast relay between connected clients
//!
//! The relay fans a locally originated change out to every other client on
//! the module topic. Messages are serialized with postcard inside a versioned
//! wire envelope.
//!
//! ## Message Flow
//!
//! ```text
//! Gamemaster                      Player
//!   |                               |
//!   |  (writes mirror)              |
//!   |--- ValueChanged {left} ------>|  render
//!   |                               |
//!   |  (flips visibility)           |
//!   |--- VisibilityChanged -------->|  re-read flag, apply
//! ```
//!
//! Receiving an event never publishes one. The store replication delivers
//! the same change independently, so applying an event is idempotent.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{FearError, FearResult};
use crate::types::{ClientId, MODULE_ID};

/// Default capacity for the hub's broadcast channel
const HUB_CHANNEL_CAPACITY: usize = 256;

/// Topic every tracker client joins
pub fn module_topic() -> String {
    format!("module.{}", MODULE_ID)
}

/// Events exchanged between clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayEvent {
    /// The gamemaster wrote a new inactive count
    ValueChanged { left_side_count: u32 },
    /// The gamemaster flipped the world visibility flag
    VisibilityChanged,
}

/// Wrapper for versioned messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireMessage {
    /// Protocol version 1
    V1(RelayEvent),
}

impl WireMessage {
    pub fn new(event: RelayEvent) -> Self {
        WireMessage::V1(event)
    }

    /// Encode wire message to bytes using postcard
    pub fn encode(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Decode wire message from bytes using postcard
    pub fn decode(data: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(data)
    }

    pub fn into_inner(self) -> RelayEvent {
        match self {
            WireMessage::V1(event) => event,
        }
    }
}

/// A message as carried by a broadcast channel
#[derive(Debug, Clone)]
pub struct Packet {
    pub from: ClientId,
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Topic-scoped publish/subscribe transport
pub trait BroadcastChannel: Send + Sync + 'static {
    /// The client publishing through this handle
    fn local_id(&self) -> ClientId;

    /// Topic this handle publishes to
    fn topic(&self) -> &str;

    /// Send a payload to every other client on the topic
    fn publish(&self, payload: Vec<u8>) -> impl Future<Output = FearResult<()>> + Send;

    /// Raw packets for every client; filtering happens in [`RelayReceiver`]
    fn subscribe(&self) -> broadcast::Receiver<Packet>;
}

/// In-process broadcast hub shared by every client of one table
#[derive(Clone)]
pub struct LocalHub {
    tx: broadcast::Sender<Packet>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::with_capacity(HUB_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Join the hub on the module topic
    pub fn join(&self, client_id: ClientId) -> HubPort {
        self.join_topic(client_id, module_topic())
    }

    pub fn join_topic(&self, client_id: ClientId, topic: impl Into<String>) -> HubPort {
        HubPort {
            tx: self.tx.clone(),
            client_id,
            topic: topic.into(),
        }
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One client's handle on a [`LocalHub`]
#[derive(Clone)]
pub struct HubPort {
    tx: broadcast::Sender<Packet>,
    client_id: ClientId,
    topic: String,
}

impl BroadcastChannel for HubPort {
    fn local_id(&self) -> ClientId {
        self.client_id
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    async fn publish(&self, payload: Vec<u8>) -> FearResult<()> {
        debug!(topic = %self.topic, len = payload.len(), "Broadcasting message");
        // No receivers just means no other client is connected.
        let _ = self.tx.send(Packet {
            from: self.client_id,
            topic: self.topic.clone(),
            payload,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Packet> {
        self.tx.subscribe()
    }
}

/// Publishes and receives [`RelayEvent`]s over a channel
pub struct Relay<C> {
    channel: C,
}

impl<C: BroadcastChannel> Relay<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Send an event to every other client
    pub async fn publish(&self, event: RelayEvent) -> FearResult<()> {
        let bytes = WireMessage::new(event)
            .encode()
            .map_err(|e| FearError::Broadcast(format!("Failed to encode event: {}", e)))?;
        self.channel.publish(bytes).await
    }

    /// Receiver for events from other clients on this topic
    pub fn receiver(&self) -> RelayReceiver {
        RelayReceiver {
            rx: self.channel.subscribe(),
            local_id: self.channel.local_id(),
            topic: self.channel.topic().to_string(),
        }
    }
}

/// Receives events published by other clients
pub struct RelayReceiver {
    rx: broadcast::Receiver<Packet>,
    local_id: ClientId,
    topic: String,
}

impl RelayReceiver {
    fn accept(&self, packet: Packet) -> Option<RelayEvent> {
        if packet.from == self.local_id || packet.topic != self.topic {
            return None;
        }
        match WireMessage::decode(&packet.payload) {
            Ok(wire) => Some(wire.into_inner()),
            Err(e) => {
                warn!(from = %packet.from, error = %e, "Dropping undecodable relay message");
                None
            }
        }
    }

    /// Next pending event without waiting
    pub fn try_recv(&mut self) -> Option<RelayEvent> {
        use broadcast::error::TryRecvError;

        loop {
            match self.rx.try_recv() {
                Ok(packet) => {
                    if let Some(event) = self.accept(packet) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Relay receiver lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next event. Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        use broadcast::error::RecvError;

        loop {
            match self.rx.recv().await {
                Ok(packet) => {
                    if let Some(event) = self.accept(packet) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Relay receiver lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_message_decodes_what_it_encodes() {
        let event = RelayEvent::ValueChanged { left_side_count: 11 };
        let bytes = WireMessage::new(event.clone()).encode().unwrap();
        assert_eq!(WireMessage::decode(&bytes).unwrap().into_inner(), event);
    }

    #[test]
    fn test_garbage_does_not_decode() {
        assert!(WireMessage::decode(&[0xff, 0xff, 0xff]).is_err());
    }

    #[tokio::test]
    async fn test_sender_does_not_receive_own_events() {
        let hub = LocalHub::new();
        let gm = Relay::new(hub.join(ClientId::new()));
        let player = Relay::new(hub.join(ClientId::new()));

        let mut gm_rx = gm.receiver();
        let mut player_rx = player.receiver();

        gm.publish(RelayEvent::VisibilityChanged).await.unwrap();

        assert_eq!(player_rx.try_recv(), Some(RelayEvent::VisibilityChanged));
        assert_eq!(gm_rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_other_topics_are_ignored() {
        let hub = LocalHub::new();
        let other = Relay::new(hub.join_topic(ClientId::new(), "module.other"));
        let player = Relay::new(hub.join(ClientId::new()));
        let mut player_rx = player.receiver();

        other
            .publish(RelayEvent::ValueChanged { left_side_count: 1 })
            .await
            .unwrap();
        assert_eq!(player_rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_undecodable_packets_are_skipped() {
        let hub = LocalHub::new();
        let rogue = hub.join(ClientId::new());
        let gm = Relay::new(hub.join(ClientId::new()));
        let player = Relay::new(hub.join(ClientId::new()));
        let mut player_rx = player.receiver();

        rogue.publish(vec![0xff, 0xff]).await.unwrap();
        gm.publish(RelayEvent::ValueChanged { left_side_count: 4 })
            .await
            .unwrap();

        assert_eq!(
            player_rx.recv().await,
            Some(RelayEvent::ValueChanged { left_side_count: 4 })
        );
    }
}
