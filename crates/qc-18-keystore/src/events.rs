//! # Event Schema
//!
//! Events published for external indexers once an operation has been
//! durably committed. A failed operation publishes nothing.

use crate::domain::{AccountId, ChainRole, Hash};
use serde::{Deserialize, Serialize};

/// Keystore events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeystoreEvent {
    /// A ledger was created from a genesis config.
    KeystoreInitialized {
        /// Account initialized.
        account: AccountId,
        /// Genesis config hash.
        config_hash: Hash,
        /// Role of the local chain.
        role: ChainRole,
    },

    /// A config update was authorized, applied and validated.
    ConfigCommitted {
        /// Account updated.
        account: AccountId,
        /// Hash of the committed config.
        config_hash: Hash,
        /// Nonce of the committed config.
        config_nonce: u64,
    },

    /// A replica accepted a master proof.
    ConfigSynced {
        /// Account synced.
        account: AccountId,
        /// Master view after the sync.
        master_config_hash: Hash,
        /// Master block timestamp after the sync.
        master_block_timestamp: u64,
    },

    /// Reconciliation replaced the mirrored history with a master seed.
    MirroredHistoryReset {
        /// Account reset.
        account: AccountId,
        /// Seed hash.
        master_config_hash: Hash,
        /// Seed nonce.
        master_config_nonce: u64,
    },
}

impl KeystoreEvent {
    /// Account the event concerns.
    pub fn account(&self) -> &AccountId {
        match self {
            Self::KeystoreInitialized { account, .. }
            | Self::ConfigCommitted { account, .. }
            | Self::ConfigSynced { account, .. }
            | Self::MirroredHistoryReset { account, .. } => account,
        }
    }

    /// Stable topic name.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::KeystoreInitialized { .. } => "keystore.initialized",
            Self::ConfigCommitted { .. } => "keystore.config_committed",
            Self::ConfigSynced { .. } => "keystore.config_synced",
            Self::MirroredHistoryReset { .. } => "keystore.mirrored_history_reset",
        }
    }
}
