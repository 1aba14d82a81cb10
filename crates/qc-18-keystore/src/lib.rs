//! # QC-18 Keystore Replication
//!
//! Replicates per-account configuration from a master chain to replica
//! chains, with account-specific authorization and validation hooks.
//!
//! **Subsystem ID:** 18
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Keep an account's configuration (signer sets, policy parameters) coherent
//! across chains:
//! - The master chain owns the authoritative `(config_hash, nonce)` sequence
//! - Replicas mirror config hashes and accept local updates optimistically
//! - Keystore proofs reconcile replicas against the master, resetting the
//!   mirrored history on any divergence
//!
//! ## Protocol Guarantees
//!
//! | Guarantee | Enforcement |
//! |-----------|-------------|
//! | Sequential nonces | `nonce == current + 1`, checked before hooks run |
//! | Authorize before mutate | Authorize hook runs on unmodified state |
//! | Fresh validation logic | Hooks re-resolved after an upgrade |
//! | Out-of-order proofs rejected | Master timestamp strictly increases |
//! | All-or-nothing | Staged copies, one store batch, events after commit |
//!
//! ## Module Structure
//!
//! ```text
//! qc-18-keystore/
//! ├── domain/          # Ledgers, account record, errors, invariants
//! ├── algorithms/      # Config hashing, mirrored-history offsets
//! ├── ports/           # KeystoreApi, AccountHooks, ProofExtractor, KeystoreStore
//! ├── adapters/        # In-memory store, hook registry, event log
//! └── application/     # KeystoreService
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod ports;

// Re-exports
pub use adapters::{HookRegistry, InMemoryEventLog, InMemoryKeystoreStore, RecordKind, StorageKey};
pub use algorithms::{
    config_hash, mirrored_index, oldest_mirrored_nonce, verify_config, CONFIG_HASH_DOMAIN,
};
pub use application::KeystoreService;
pub use config::KeystoreConfig;
pub use domain::{
    invariant_fresh_master_timestamp, invariant_nonce_sequential, AccountConfig, AccountId,
    AccountRecord, ChainId, ChainRole, ExtractedMasterState, Hash, ImplementationId,
    KeystoreError, Ledger, MasterLedger, ReconcileOutcome, ReplicaLedger, ZERO_HASH,
};
pub use events::KeystoreEvent;
pub use ports::{
    AccountHooks, EventSink, HookCall, HookCallLog, HookContext, HookResolver, KeystoreApi,
    KeystoreStore, MockProofExtractor, ProofExtractor, ScriptedHooks, WriteBatch,
    APPLIED_DATA_SLOT, APPLIED_NONCE_SLOT,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem identifier
pub const SUBSYSTEM_ID: u8 = 18;
