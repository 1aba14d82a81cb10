//! # Domain Errors
//!
//! Error types for Keystore Replication.
//!
//! Every failure aborts the whole operation; nothing staged during it is
//! written and no event is published.

use super::value_objects::{AccountId, ChainId, ImplementationId};
use thiserror::Error;

/// Hash type (32-byte Keccak-256).
pub type Hash = [u8; 32];

/// All-zero hash. Ledger records holding it are uninitialized.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Keystore error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeystoreError {
    /// Ledger already holds a config hash.
    #[error("Keystore already initialized for account {account}")]
    AlreadyInitialized {
        /// Account being initialized
        account: AccountId,
    },

    /// No ledger exists for the account on this chain.
    #[error("Keystore not initialized for account {account}")]
    NotInitialized {
        /// Account addressed by the operation
        account: AccountId,
    },

    /// Submitted nonce is not exactly current + 1.
    #[error("Nonce not sequential: expected {expected}, got {got}")]
    NonceNotSequential {
        /// Nonce the ledger accepts next
        expected: u64,
        /// Nonce carried by the submitted config
        got: u64,
    },

    /// Authorize hook rejected the update.
    #[error("Config update unauthorized")]
    Unauthorized,

    /// Validate hook rejected the post-apply state.
    #[error("Invalid config")]
    InvalidConfig,

    /// Sync attempted on the master chain.
    #[error("Not a replica chain: chain {chain_id} is the master")]
    NotReplicaChain {
        /// Local chain identifier
        chain_id: ChainId,
    },

    /// Proof timestamp does not advance the stored master timestamp.
    #[error("Stale master timestamp: stored {stored}, got {got}")]
    StaleMasterTimestamp {
        /// Timestamp of the last accepted sync
        stored: u64,
        /// Timestamp carried by the proof
        got: u64,
    },

    /// Config does not hash to the expected value.
    #[error("Config mismatch: expected {}, computed {}", hex::encode(.expected), hex::encode(.computed))]
    ConfigMismatch {
        /// Hash the caller or proof claims
        expected: Hash,
        /// Hash of the supplied config
        computed: Hash,
    },

    /// Proof rejected by the extractor.
    #[error("Invalid keystore proof: {0}")]
    ProofInvalid(String),

    /// Master reported a nonce older than the oldest mirrored entry.
    #[error("Mirrored nonce out of range: {nonce} not in [{oldest}, {current}]")]
    MirroredNonceOutOfRange {
        /// Nonce reported by the master
        nonce: u64,
        /// Oldest nonce still mirrored
        oldest: u64,
        /// Replica's current nonce
        current: u64,
    },

    /// No hook module registered for the implementation.
    #[error("Unknown implementation: {0}")]
    UnknownImplementation(ImplementationId),

    /// Store or record codec failure.
    #[error("Storage error: {reason}")]
    StorageError {
        /// Underlying failure
        reason: String,
    },
}

impl KeystoreError {
    /// Short label used for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AlreadyInitialized { .. } => "already_initialized",
            Self::NotInitialized { .. } => "not_initialized",
            Self::NonceNotSequential { .. } => "nonce_not_sequential",
            Self::Unauthorized => "unauthorized",
            Self::InvalidConfig => "invalid_config",
            Self::NotReplicaChain { .. } => "not_replica_chain",
            Self::StaleMasterTimestamp { .. } => "stale_master_timestamp",
            Self::ConfigMismatch { .. } => "config_mismatch",
            Self::ProofInvalid(_) => "proof_invalid",
            Self::MirroredNonceOutOfRange { .. } => "mirrored_nonce_out_of_range",
            Self::UnknownImplementation(_) => "unknown_implementation",
            Self::StorageError { .. } => "storage_error",
        }
    }
}
