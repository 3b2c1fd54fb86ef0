//! Shared in-memory settings store

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::{SettingChange, SettingsStore, CHANGE_CHANNEL_CAPACITY};
use crate::error::{FearError, FearResult};
use crate::types::SettingKey;

#[derive(Default)]
struct MemoryState {
    defaults: HashMap<SettingKey, Value>,
    values: HashMap<SettingKey, Value>,
    writes: HashMap<SettingKey, usize>,
    rejected: HashSet<SettingKey>,
}

struct MemoryInner {
    state: RwLock<MemoryState>,
    change_tx: broadcast::Sender<SettingChange>,
}

/// In-memory store shared by cloning
///
/// Each clone plays the part of one connected client's view of the same
/// replicated settings. Writes yield to the scheduler before they land, so
/// other handlers can interleave with a caller that is mid-write.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(CHANGE_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (change_tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(MemoryInner {
                state: RwLock::new(MemoryState::default()),
                change_tx,
            }),
        }
    }

    /// Number of successful writes to a key since creation
    pub fn write_count(&self, key: &SettingKey) -> usize {
        self.inner.state.read().writes.get(key).copied().unwrap_or(0)
    }

    /// Number of successful writes across all keys
    pub fn total_writes(&self) -> usize {
        self.inner.state.read().writes.values().sum()
    }

    /// Make every write to `key` fail until called again with `false`
    pub fn reject_writes(&self, key: &SettingKey, reject: bool) {
        let mut state = self.inner.state.write();
        if reject {
            state.rejected.insert(key.clone());
        } else {
            state.rejected.remove(key);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemoryStore {
    fn register(&self, key: &SettingKey, default: Value) {
        let mut state = self.inner.state.write();
        state.defaults.entry(key.clone()).or_insert(default);
    }

    fn is_registered(&self, key: &SettingKey) -> bool {
        self.inner.state.read().defaults.contains_key(key)
    }

    fn get(&self, key: &SettingKey) -> Option<Value> {
        let state = self.inner.state.read();
        state
            .values
            .get(key)
            .or_else(|| state.defaults.get(key))
            .cloned()
    }

    async fn set(&self, key: &SettingKey, value: Value) -> FearResult<()> {
        tokio::task::yield_now().await;

        {
            let mut state = self.inner.state.write();
            if !state.defaults.contains_key(key) {
                return Err(FearError::UnregisteredSetting(key.to_string()));
            }
            if state.rejected.contains(key) {
                return Err(FearError::WriteRejected(key.to_string()));
            }
            state.values.insert(key.clone(), value.clone());
            *state.writes.entry(key.clone()).or_insert(0) += 1;
        }

        debug!(%key, %value, "Setting written");
        let _ = self.inner.change_tx.send(SettingChange {
            key: key.clone(),
            value,
        });
        Ok(())
    }

    fn entries(&self) -> Vec<(SettingKey, Value)> {
        let state = self.inner.state.read();
        let mut keys: Vec<&SettingKey> = state.defaults.keys().chain(state.values.keys()).collect();
        keys.sort();
        keys.dedup();
        keys.into_iter()
            .filter_map(|key| {
                state
                    .values
                    .get(key)
                    .or_else(|| state.defaults.get(key))
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<SettingChange> {
        self.inner.change_tx.subscribe()
    }
}
