//! Persistent settings store using redb.
//!
//! Values are stored as JSON under their `namespace.key` string. Defaults
//! are kept in memory by the registry and are never written to disk, so a
//! setting that was never changed keeps following its registered default.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{SettingChange, SettingsStore, CHANGE_CHANNEL_CAPACITY};
use crate::error::{FearError, FearResult};
use crate::types::SettingKey;

const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

/// Settings store backed by a redb database file
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    defaults: Arc<RwLock<HashMap<SettingKey, Value>>>,
    change_tx: broadcast::Sender<SettingChange>,
}

impl RedbStore {
    /// Open or create the store at the given path.
    ///
    /// This will:
    /// - Create the parent directory if it doesn't exist
    /// - Initialize the database file
    /// - Create the settings table
    pub fn new(path: impl AsRef<Path>) -> FearResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SETTINGS_TABLE)?;
        }
        write_txn.commit()?;

        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            db: Arc::new(db),
            defaults: Arc::new(RwLock::new(HashMap::new())),
            change_tx,
        })
    }

    fn load(&self, key: &SettingKey) -> FearResult<Option<Value>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;
        let name = key.to_string();

        match table.get(name.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    fn load_all(&self) -> FearResult<BTreeMap<SettingKey, Value>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;

        let mut stored = BTreeMap::new();
        for entry in table.iter()? {
            let (name, value) = entry?;
            let Some(key) = SettingKey::parse(name.value()) else {
                continue;
            };
            stored.insert(key, serde_json::from_slice(value.value())?);
        }
        Ok(stored)
    }

    /// Write and commit on the blocking pool
    async fn save(&self, key: &SettingKey, value: &Value) -> FearResult<()> {
        let data = serde_json::to_vec(value)?;
        let name = key.to_string();
        let db = Arc::clone(&self.db);

        tokio::task::spawn_blocking(move || commit_setting(&db, &name, &data))
            .await
            .map_err(|e| FearError::Storage(format!("Write task for {} failed: {}", key, e)))?
    }
}

fn commit_setting(db: &Database, name: &str, data: &[u8]) -> FearResult<()> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(SETTINGS_TABLE)?;
        table.insert(name, data)?;
    }
    write_txn.commit()?;
    Ok(())
}

impl SettingsStore for RedbStore {
    fn register(&self, key: &SettingKey, default: Value) {
        self.defaults.write().entry(key.clone()).or_insert(default);
    }

    fn is_registered(&self, key: &SettingKey) -> bool {
        self.defaults.read().contains_key(key)
    }

    fn get(&self, key: &SettingKey) -> Option<Value> {
        let default = self.defaults.read().get(key).cloned()?;
        match self.load(key) {
            Ok(Some(value)) => Some(value),
            Ok(None) => Some(default),
            Err(e) => {
                warn!(%key, error = %e, "Failed to read setting, using default");
                Some(default)
            }
        }
    }

    async fn set(&self, key: &SettingKey, value: Value) -> FearResult<()> {
        if !self.is_registered(key) {
            return Err(FearError::UnregisteredSetting(key.to_string()));
        }

        self.save(key, &value).await?;
        debug!(%key, %value, "Setting persisted");

        let _ = self.change_tx.send(SettingChange {
            key: key.clone(),
            value,
        });
        Ok(())
    }

    fn entries(&self) -> Vec<(SettingKey, Value)> {
        let mut merged: BTreeMap<SettingKey, Value> = self
            .defaults
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        match self.load_all() {
            Ok(stored) => merged.extend(stored),
            Err(e) => warn!(error = %e, "Failed to list stored settings"),
        }
        merged.into_iter().collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<SettingChange> {
        self.change_tx.subscribe()
    }
}
