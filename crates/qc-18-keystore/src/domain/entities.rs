//! # Domain Entities
//!
//! Ledger records and hook-owned account state for Keystore Replication.
//!
//! Records are created once through `initialize` and afterwards only move
//! forward: nonce increments, appends, or a full reset of the mirrored list
//! to a single master-provided seed.

use std::collections::BTreeMap;

use super::errors::{Hash, KeystoreError, ZERO_HASH};
use super::value_objects::{AccountId, ChainRole, ImplementationId};
use crate::algorithms::{mirrored_index, oldest_mirrored_nonce};
use serde::{Deserialize, Serialize};

/// Master-side ledger: the authoritative config hash and nonce.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterLedger {
    /// Hash of the last accepted config.
    pub config_hash: Hash,
    /// Nonce of the last accepted config.
    pub config_nonce: u64,
}

impl MasterLedger {
    /// Current `(config_hash, config_nonce)`.
    pub fn read(&self) -> (Hash, u64) {
        (self.config_hash, self.config_nonce)
    }

    /// Check if a config hash has been stored.
    pub fn is_initialized(&self) -> bool {
        self.config_hash != ZERO_HASH
    }

    /// Store the genesis config hash.
    pub fn initialize(
        &mut self,
        account: &AccountId,
        genesis_hash: Hash,
        nonce: u64,
    ) -> Result<(), KeystoreError> {
        if self.is_initialized() {
            return Err(KeystoreError::AlreadyInitialized { account: *account });
        }
        if nonce != 0 {
            return Err(KeystoreError::NonceNotSequential {
                expected: 0,
                got: nonce,
            });
        }
        self.config_hash = genesis_hash;
        self.config_nonce = 0;
        Ok(())
    }

    /// Record an accepted config. The caller has already checked that
    /// `nonce == config_nonce + 1`.
    pub fn commit(&mut self, config_hash: Hash, nonce: u64) -> Hash {
        debug_assert_eq!(self.config_nonce.checked_add(1), Some(nonce));
        self.config_hash = config_hash;
        self.config_nonce = nonce;
        config_hash
    }
}

/// Result of reconciling the mirrored list against a proven master state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Master state already present in the mirrored list; nothing changed.
    Consistent,
    /// Mirrored list replaced by a single master-provided seed.
    Reset,
}

impl ReconcileOutcome {
    /// Whether the mirrored list was reset.
    pub fn was_reset(&self) -> bool {
        matches!(self, Self::Reset)
    }
}

/// Replica-side ledger.
///
/// Holds the latest master view plus the append-only, nonce-contiguous list
/// of config hashes the replica believes match the master's sequence. The
/// last list entry is at `current_config_nonce`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaLedger {
    master_config_hash: Hash,
    master_block_timestamp: u64,
    current_config_nonce: u64,
    mirrored_config_hashes: Vec<Hash>,
}

impl ReplicaLedger {
    /// Check if a master config hash has been stored.
    pub fn is_initialized(&self) -> bool {
        self.master_config_hash != ZERO_HASH
    }

    /// Seed the ledger with the genesis config hash.
    pub fn initialize(
        &mut self,
        account: &AccountId,
        genesis_hash: Hash,
        nonce: u64,
    ) -> Result<(), KeystoreError> {
        if self.is_initialized() {
            return Err(KeystoreError::AlreadyInitialized { account: *account });
        }
        if nonce != 0 {
            return Err(KeystoreError::NonceNotSequential {
                expected: 0,
                got: nonce,
            });
        }
        self.master_config_hash = genesis_hash;
        self.mirrored_config_hashes = vec![genesis_hash];
        self.current_config_nonce = 0;
        Ok(())
    }

    /// Hash most recently accepted as the master's view.
    pub fn master_config_hash(&self) -> Hash {
        self.master_config_hash
    }

    /// Timestamp of the master block behind the last accepted sync.
    pub fn master_block_timestamp(&self) -> u64 {
        self.master_block_timestamp
    }

    /// Nonce of the last mirrored entry.
    pub fn current_config_nonce(&self) -> u64 {
        self.current_config_nonce
    }

    /// Mirrored hashes, oldest first.
    pub fn mirrored_config_hashes(&self) -> &[Hash] {
        &self.mirrored_config_hashes
    }

    /// Hash at the tip of the mirrored list.
    pub fn current_config_hash(&self) -> Option<Hash> {
        self.mirrored_config_hashes.last().copied()
    }

    /// Nonce of the oldest mirrored entry.
    pub fn oldest_mirrored_nonce(&self) -> Option<u64> {
        oldest_mirrored_nonce(self.mirrored_config_hashes.len(), self.current_config_nonce)
    }

    /// Mirrored hash at `nonce`, if that nonce is still in the list.
    pub fn mirrored_config_hash(&self, nonce: u64) -> Option<Hash> {
        mirrored_index(
            self.mirrored_config_hashes.len(),
            self.current_config_nonce,
            nonce,
        )
        .map(|i| self.mirrored_config_hashes[i])
    }

    /// Append a locally accepted config hash. The caller has already checked
    /// that `nonce == current_config_nonce + 1`.
    pub fn append_mirrored(&mut self, config_hash: Hash, nonce: u64) {
        debug_assert_eq!(self.current_config_nonce.checked_add(1), Some(nonce));
        self.mirrored_config_hashes.push(config_hash);
        self.current_config_nonce = nonce;
    }

    /// Check the mirrored list against a proven master `(hash, nonce)`.
    ///
    /// A master nonce above the tip, or a different hash at the same nonce,
    /// replaces the whole list with the master's entry: one divergent entry
    /// taints every later local entry. A matching entry leaves the list
    /// untouched. A master nonce older than the oldest mirrored entry cannot
    /// be located and fails without mutating anything.
    pub fn reconcile(
        &mut self,
        master_config_hash: Hash,
        master_config_nonce: u64,
    ) -> Result<ReconcileOutcome, KeystoreError> {
        let current = self.current_config_nonce;
        if master_config_nonce > current {
            self.reset_mirrored(master_config_hash, master_config_nonce);
            return Ok(ReconcileOutcome::Reset);
        }

        let position = mirrored_index(self.mirrored_config_hashes.len(), current, master_config_nonce)
            .ok_or_else(|| KeystoreError::MirroredNonceOutOfRange {
                nonce: master_config_nonce,
                oldest: self.oldest_mirrored_nonce().unwrap_or(current),
                current,
            })?;

        if self.mirrored_config_hashes[position] == master_config_hash {
            return Ok(ReconcileOutcome::Consistent);
        }

        self.reset_mirrored(master_config_hash, master_config_nonce);
        Ok(ReconcileOutcome::Reset)
    }

    /// Reconcile, then adopt `(master_config_hash, master_block_timestamp)`
    /// as the master view.
    pub fn apply_master_update(
        &mut self,
        master_config_hash: Hash,
        master_config_nonce: u64,
        master_block_timestamp: u64,
    ) -> Result<ReconcileOutcome, KeystoreError> {
        let outcome = self.reconcile(master_config_hash, master_config_nonce)?;
        self.master_config_hash = master_config_hash;
        self.master_block_timestamp = master_block_timestamp;
        Ok(outcome)
    }

    /// Advance only the master timestamp (proof without an extractable config).
    pub fn acknowledge_master_block(&mut self, master_block_timestamp: u64) {
        self.master_block_timestamp = master_block_timestamp;
    }

    fn reset_mirrored(&mut self, seed_hash: Hash, seed_nonce: u64) {
        self.mirrored_config_hashes.clear();
        self.mirrored_config_hashes.push(seed_hash);
        self.current_config_nonce = seed_nonce;
    }
}

/// The ledger active on the local chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ledger {
    /// Master chain ledger.
    Master(MasterLedger),
    /// Replica chain ledger.
    Replica(ReplicaLedger),
}

impl Ledger {
    /// Uninitialized ledger for `role`.
    pub fn empty(role: ChainRole) -> Self {
        match role {
            ChainRole::Master => Self::Master(MasterLedger::default()),
            ChainRole::Replica => Self::Replica(ReplicaLedger::default()),
        }
    }

    /// Role this ledger serves.
    pub fn role(&self) -> ChainRole {
        match self {
            Self::Master(_) => ChainRole::Master,
            Self::Replica(_) => ChainRole::Replica,
        }
    }

    /// Check if the ledger holds a config hash.
    pub fn is_initialized(&self) -> bool {
        match self {
            Self::Master(l) => l.is_initialized(),
            Self::Replica(l) => l.is_initialized(),
        }
    }

    /// Nonce of the local tip.
    pub fn current_nonce(&self) -> u64 {
        match self {
            Self::Master(l) => l.config_nonce,
            Self::Replica(l) => l.current_config_nonce,
        }
    }

    /// Hash of the local tip.
    pub fn current_config_hash(&self) -> Hash {
        match self {
            Self::Master(l) => l.config_hash,
            Self::Replica(l) => l.current_config_hash().unwrap_or(ZERO_HASH),
        }
    }

    /// Store the genesis config hash.
    pub fn initialize(
        &mut self,
        account: &AccountId,
        genesis_hash: Hash,
        nonce: u64,
    ) -> Result<(), KeystoreError> {
        match self {
            Self::Master(l) => l.initialize(account, genesis_hash, nonce),
            Self::Replica(l) => l.initialize(account, genesis_hash, nonce),
        }
    }

    /// Record a locally accepted config.
    pub fn commit(&mut self, config_hash: Hash, nonce: u64) -> Hash {
        match self {
            Self::Master(l) => l.commit(config_hash, nonce),
            Self::Replica(l) => {
                l.append_mirrored(config_hash, nonce);
                config_hash
            }
        }
    }

    /// Replica ledger, if this is one.
    pub fn as_replica_mut(&mut self) -> Option<&mut ReplicaLedger> {
        match self {
            Self::Replica(l) => Some(l),
            Self::Master(_) => None,
        }
    }
}

/// Hook-owned per-account state.
///
/// The protocol never interprets `storage`; the active hook module writes it
/// during *apply* (signer sets, policy parameters...) and reads it during
/// *authorize* and *validate*.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account identity.
    pub account: AccountId,
    /// Hook module currently active for the account.
    pub implementation: ImplementationId,
    storage: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl AccountRecord {
    /// Create a record running `implementation`.
    pub fn new(account: AccountId, implementation: ImplementationId) -> Self {
        Self {
            account,
            implementation,
            storage: BTreeMap::new(),
        }
    }

    /// Read a storage slot.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.storage.get(key).map(Vec::as_slice)
    }

    /// Write a storage slot.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.storage.insert(key.into(), value.into());
    }

    /// Clear a storage slot.
    pub fn remove(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.storage.remove(key)
    }

    /// Number of occupied slots.
    pub fn storage_len(&self) -> usize {
        self.storage.len()
    }
}
