//! Settings stores
//!
//! The settings store is the system of record for every value the tracker
//! shows. Two implementations share the [`SettingsStore`] seam:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  SettingsStore                                                  │
//! │  ├── register / is_registered (defaults live in the registry)   │
//! │  ├── get (synchronous snapshot)                                 │
//! │  ├── set (asynchronous, may suspend the caller)                 │
//! │  └── subscribe (change notifications for every write)           │
//! │                                                                 │
//! │  MemoryStore: shared in-memory store, one clone per client      │
//! │  RedbStore:   redb-backed store for the CLI data directory      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every clone of a store sees every write, and every subscriber receives a
//! [`SettingChange`] for every write, including the writer itself. That is
//! the replication path the synchronization engine relies on.

mod memory;
mod persistent;

use std::future::Future;

use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::FearResult;
use crate::types::SettingKey;

pub use memory::MemoryStore;
pub use persistent::RedbStore;

/// Default capacity for change notification channels
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Notification delivered after a setting was written
#[derive(Debug, Clone, PartialEq)]
pub struct SettingChange {
    /// The setting that changed
    pub key: SettingKey,
    /// The value now stored
    pub value: Value,
}

/// Key-value settings store with change notifications
pub trait SettingsStore: Clone + Send + Sync + 'static {
    /// Register a setting with its default. Registering twice keeps the
    /// stored value.
    fn register(&self, key: &SettingKey, default: Value);

    /// Whether the setting has been registered
    fn is_registered(&self, key: &SettingKey) -> bool;

    /// Current value, or the registered default. `None` when unregistered.
    fn get(&self, key: &SettingKey) -> Option<Value>;

    /// Persist a value and notify subscribers
    fn set(&self, key: &SettingKey, value: Value) -> impl Future<Output = FearResult<()>> + Send;

    /// Snapshot of every registered or stored setting
    fn entries(&self) -> Vec<(SettingKey, Value)>;

    /// Receive a notification for every subsequent write
    fn subscribe(&self) -> broadcast::Receiver<SettingChange>;
}
