//! # Domain Value Objects
//!
//! Immutable value types for Keystore Replication.

use super::errors::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identity, identical on the master and every replica.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 20]);

impl AccountId {
    /// Raw identity bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Identity of the hook module an account currently runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplementationId(pub [u8; 20]);

impl fmt::Display for ImplementationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Numeric chain identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the replication protocol the local chain plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainRole {
    /// Holds the authoritative config and nonce sequence.
    Master,
    /// Mirrors the master's config via proofs.
    Replica,
}

impl ChainRole {
    /// Resolve the role of `local` given the master chain.
    pub fn of(local: ChainId, master: ChainId) -> Self {
        if local == master {
            Self::Master
        } else {
            Self::Replica
        }
    }

    /// Check if this is the master role.
    pub fn is_master(&self) -> bool {
        matches!(self, Self::Master)
    }
}

/// A versioned account configuration.
///
/// `data` is opaque to the protocol; only the hooks interpret it. The
/// canonical identifier exchanged between chains is
/// [`config_hash`](crate::algorithms::config_hash) of this value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Position in the account's version history (genesis = 0).
    pub nonce: u64,
    /// Opaque payload (signer set, policy data, implementation pointer...).
    pub data: Vec<u8>,
}

impl AccountConfig {
    /// Create a new config.
    pub fn new(nonce: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            nonce,
            data: data.into(),
        }
    }

    /// Genesis config (nonce 0).
    pub fn genesis(data: impl Into<Vec<u8>>) -> Self {
        Self::new(0, data)
    }
}

/// Master state extracted from a keystore proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMasterState {
    /// Timestamp of the master block the proof was drawn from.
    pub master_block_timestamp: u64,
    /// Committed master config hash; `None` when the master's config is not
    /// yet included in the proven root.
    pub master_config_hash: Option<Hash>,
}

impl ExtractedMasterState {
    /// Proof carrying a committed master config hash.
    pub fn present(master_block_timestamp: u64, master_config_hash: Hash) -> Self {
        Self {
            master_block_timestamp,
            master_config_hash: Some(master_config_hash),
        }
    }

    /// Proof acknowledging a master block without an extractable config.
    pub fn absent(master_block_timestamp: u64) -> Self {
        Self {
            master_block_timestamp,
            master_config_hash: None,
        }
    }

    /// Whether the proof carries a config hash.
    pub fn is_present(&self) -> bool {
        self.master_config_hash.is_some()
    }
}
