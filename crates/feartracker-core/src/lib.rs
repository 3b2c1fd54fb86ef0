//! Fear Tracker Core Library
//!
//! Keeps a tabletop game's shared "Fear" counter and a pip-bar overlay in
//! step across every connected client.
//!
//! ## Overview
//!
//! The game system owns the authoritative fear value. The tracker keeps its
//! own mirror of it, stored as the number of *inactive* pips, and renders
//! the bar from that mirror. Changes flow both ways: a new authoritative
//! value is pulled into the mirror, and a tracker button press is pushed
//! back to the game system. Only the gamemaster ever writes; players render
//! what the store and the broadcast relay deliver.
//!
//! ## Core Principles
//!
//! - **Store is the arbiter**: every path re-reads the persisted value
//! - **Compare before write**: equal values are never rewritten, which is
//!   what ends the store-change ping-pong
//! - **Fail safe**: a failed write is logged and leaves state as it was
//!
//! ## Quick Start
//!
//! ```ignore
//! use feartracker_core::{
//!     ClientId, LocalHub, MemoryStore, MemorySurface, Role, TrackerConfig, TrackerSession,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let world = MemoryStore::new();
//!     let hub = LocalHub::new();
//!
//!     let gm = TrackerSession::new(
//!         Role::Gamemaster,
//!         world.clone(),
//!         MemoryStore::new(),
//!         hub.join(ClientId::new()),
//!         MemorySurface::new(),
//!         TrackerConfig::default(),
//!     );
//!     gm.start().await;
//!
//!     gm.add_fear(1).await;
//!     gm.pump().await;
//!     println!("{:?}", gm.snapshot());
//! }
//! ```

pub mod bounds;
pub mod config;
pub mod error;
pub mod render;
pub mod session;
pub mod settings;
pub mod store;
pub mod sync;
pub mod system_bar;
pub mod theme;
pub mod timer;
pub mod types;
pub mod value;

// Re-exports
pub use bounds::{max_from_config, resolve_max, DEFAULT_MAX_FEAR, MAX_FEAR_LIMIT};
pub use config::TrackerConfig;
pub use error::{FearError, FearResult};
pub use render::{layout, MemorySurface, PipSlot, Projector, RenderAction, Surface};
pub use session::TrackerSession;
pub use settings::{register_module_settings, register_system_settings};
pub use store::{MemoryStore, RedbStore, SettingChange, SettingsStore};
pub use sync::{
    BroadcastChannel, HubPort, LocalHub, NoticeLevel, RelayEvent, SessionEvent, SyncEngine,
    SyncOutcome, TrackerEvent, TrackerState,
};
pub use value::{AuthoritativeValue, ValueAdapter};
pub use types::*;
