//! Synchronization layer
//!
//! Keeps the game system's fear value, this module's mirror and every
//! client's rendering consistent.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  SyncEngine (per client)                                        │
//! │  ├── sync_mirror_from_authority: system value → leftSideCount   │
//! │  ├── sync_authority_from_mirror: leftSideCount → system value   │
//! │  ├── modify_count: gamemaster button presses                    │
//! │  └── SingleFlight: one pass of each kind at a time              │
//! │                                                                 │
//! │  Relay (per client)                                             │
//! │  ├── publish: fan a locally originated change out to peers      │
//! │  └── RelayReceiver: events from other clients only              │
//! │                                                                 │
//! │  TrackerEvent: typed classification of store notifications      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod engine;
pub mod events;
pub mod flight;
pub mod relay;

pub use engine::{SyncEngine, SyncOutcome, TrackerState};
pub use events::{NoticeLevel, SessionEvent, TrackerEvent};
pub use flight::{Pass, SingleFlight};
pub use relay::{
    module_topic, BroadcastChannel, HubPort, LocalHub, Packet, Relay, RelayEvent, RelayReceiver,
    WireMessage,
};
