//! In-memory keystore store.
//!
//! Implements `KeystoreStore` over a flat key-value map. Every record lives
//! under its own `(RecordKind, AccountId)` key and is stored bincode-encoded,
//! so the layout matches what a persistent backend would hold.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{AccountId, AccountRecord, KeystoreError, MasterLedger, ReplicaLedger};
use crate::ports::{KeystoreStore, WriteBatch};

/// Record kinds kept per account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Hook-owned account state.
    Account,
    /// Master ledger.
    Master,
    /// Replica ledger.
    Replica,
}

/// Storage key: one slot per record kind per account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey {
    /// Record kind.
    pub kind: RecordKind,
    /// Owning account.
    pub account: AccountId,
}

impl StorageKey {
    /// Key for `kind` of `account`.
    pub fn new(kind: RecordKind, account: AccountId) -> Self {
        Self { kind, account }
    }
}

/// In-memory implementation of `KeystoreStore`.
#[derive(Default)]
pub struct InMemoryKeystoreStore {
    records: RwLock<HashMap<StorageKey, Vec<u8>>>,
}

impl InMemoryKeystoreStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Raw encoded record, if present.
    pub fn raw(&self, key: &StorageKey) -> Option<Vec<u8>> {
        self.records.read().get(key).cloned()
    }

    fn load<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Option<T>, KeystoreError> {
        let records = self.records.read();
        records.get(&key).map(|bytes| decode(bytes)).transpose()
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, KeystoreError> {
    bincode::serialize(value).map_err(|e| KeystoreError::StorageError {
        reason: format!("encode failed: {e}"),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, KeystoreError> {
    bincode::deserialize(bytes).map_err(|e| KeystoreError::StorageError {
        reason: format!("decode failed: {e}"),
    })
}

impl KeystoreStore for InMemoryKeystoreStore {
    fn load_account(&self, account: &AccountId) -> Result<Option<AccountRecord>, KeystoreError> {
        self.load(StorageKey::new(RecordKind::Account, *account))
    }

    fn load_master(&self, account: &AccountId) -> Result<MasterLedger, KeystoreError> {
        Ok(self
            .load(StorageKey::new(RecordKind::Master, *account))?
            .unwrap_or_default())
    }

    fn load_replica(&self, account: &AccountId) -> Result<ReplicaLedger, KeystoreError> {
        Ok(self
            .load(StorageKey::new(RecordKind::Replica, *account))?
            .unwrap_or_default())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), KeystoreError> {
        // Encode everything before taking the lock so a codec failure
        // leaves the map untouched.
        let mut encoded = Vec::with_capacity(3);
        if let Some(record) = &batch.record {
            encoded.push((StorageKey::new(RecordKind::Account, batch.account), encode(record)?));
        }
        if let Some(master) = &batch.master {
            encoded.push((StorageKey::new(RecordKind::Master, batch.account), encode(master)?));
        }
        if let Some(replica) = &batch.replica {
            encoded.push((StorageKey::new(RecordKind::Replica, batch.account), encode(replica)?));
        }

        let mut records = self.records.write();
        for (key, bytes) in encoded {
            trace!(account = %key.account, kind = ?key.kind, len = bytes.len(), "[qc-18] record written");
            records.insert(key, bytes);
        }
        Ok(())
    }
}
