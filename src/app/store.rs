//! Relay records over the [`StoragePort`].
//!
//! The whole relay collection is one JSON object under
//! `relaybox/relays`, keyed by relay id:
//!
//! ```text
//! { "1": { "relay": 1, "name": "Pump", "pin": 7, "state": "off" }, ... }
//! ```
//!
//! Every mutation is a read-modify-write of that object under one lock, so
//! two relays confirming at the same moment cannot lose each other's
//! update.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::ports::{StorageError, StoragePort};
use super::state::RelayState;
use crate::error::RelayError;

pub const NAMESPACE: &str = "relaybox";
pub const RELAYS_KEY: &str = "relays";

/// Longest relay name accepted, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// One persisted relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub relay: u8,
    pub name: String,
    pub pin: u8,
    /// Last confirmed hardware state.
    pub state: RelayState,
}

impl RelayRecord {
    pub fn new(relay: u8, name: impl Into<String>, pin: u8) -> Self {
        Self {
            relay,
            name: name.into(),
            pin,
            state: RelayState::Off,
        }
    }
}

type Collection = BTreeMap<String, RelayRecord>;

/// Typed access to the relay collection.
pub struct RelayStore<S: StoragePort> {
    storage: Mutex<S>,
}

impl<S: StoragePort> RelayStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: Mutex::new(storage),
        }
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(storage: &S) -> Result<Collection, StorageError> {
        match storage.read(NAMESPACE, RELAYS_KEY) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Corrupted(e.to_string())),
            Err(StorageError::NotFound) => Ok(Collection::new()),
            Err(e) => Err(e),
        }
    }

    fn save(storage: &mut S, collection: &Collection) -> Result<(), StorageError> {
        let bytes =
            serde_json::to_vec(collection).map_err(|e| StorageError::Corrupted(e.to_string()))?;
        storage.write(NAMESPACE, RELAYS_KEY, &bytes)
    }

    /// Every record, ordered by relay id.
    pub fn get_all(&self) -> Result<Vec<RelayRecord>, StorageError> {
        let storage = self.lock();
        let mut records: Vec<_> = Self::load(&storage)?.into_values().collect();
        records.sort_by_key(|r| r.relay);
        Ok(records)
    }

    pub fn get_one(&self, relay: i64) -> Result<RelayRecord, RelayError> {
        let storage = self.lock();
        Self::load(&storage)?
            .remove(&relay.to_string())
            .ok_or(RelayError::UnknownRelay(relay))
    }

    /// Record a confirmed state.  Only the controller calls this.
    pub fn set_state(&self, relay: u8, state: RelayState) -> Result<RelayRecord, RelayError> {
        self.update(relay, |r| r.state = state)
    }

    pub fn rename(&self, relay: u8, name: &str) -> Result<RelayRecord, RelayError> {
        self.update(relay, |r| r.name = name.to_owned())
    }

    fn update(
        &self,
        relay: u8,
        apply: impl FnOnce(&mut RelayRecord),
    ) -> Result<RelayRecord, RelayError> {
        let mut storage = self.lock();
        let mut collection = Self::load(&storage)?;
        let record = collection
            .get_mut(&relay.to_string())
            .ok_or(RelayError::UnknownRelay(i64::from(relay)))?;
        apply(record);
        let updated = record.clone();
        Self::save(&mut storage, &collection)?;
        debug!("store: relay {} -> {:?}", relay, updated);
        Ok(updated)
    }

    /// Create the collection on first run.  A non-empty collection is left
    /// untouched, so this is safe on every start.  Returns how many records
    /// were created.
    pub fn seed(
        &self,
        records: impl IntoIterator<Item = RelayRecord>,
    ) -> Result<usize, StorageError> {
        let mut storage = self.lock();
        if !Self::load(&storage)?.is_empty() {
            debug!("store: relay collection present, seeding skipped");
            return Ok(0);
        }
        let collection: Collection = records
            .into_iter()
            .map(|r| (r.relay.to_string(), r))
            .collect();
        if collection.is_empty() {
            return Ok(0);
        }
        Self::save(&mut storage, &collection)?;
        info!("store: seeded {} relay records", collection.len());
        Ok(collection.len())
    }
}
