//! # Inbound Ports
//!
//! API trait defining what the Keystore subsystem can do.

use crate::domain::{
    AccountConfig, AccountId, ChainRole, Hash, ImplementationId, KeystoreError, MasterLedger,
    ReplicaLedger,
};

/// Keystore API - inbound port.
///
/// Every mutating call is atomic: it either returns `Ok` with all state
/// written and events published, or returns the error with nothing changed.
pub trait KeystoreApi: Send + Sync {
    /// Create the local ledger for `account` from a nonce-0 genesis config
    /// and run the genesis config through *apply*.
    fn initialize_account(
        &self,
        account: AccountId,
        implementation: ImplementationId,
        genesis: &AccountConfig,
    ) -> Result<Hash, KeystoreError>;

    /// Authorize, commit, apply and validate the next config.
    fn set_config(
        &self,
        account: AccountId,
        config: &AccountConfig,
        auth_and_validate_proof: &[u8],
    ) -> Result<Hash, KeystoreError>;

    /// Bring a replica's view of the master up to date from a keystore proof.
    /// Returns the master view `(config_hash, block_timestamp)` after the sync.
    fn sync_config(
        &self,
        account: AccountId,
        master_config: &AccountConfig,
        keystore_proof: &[u8],
    ) -> Result<(Hash, u64), KeystoreError>;

    /// Role of the local chain.
    fn role(&self) -> ChainRole;

    /// `(config_hash, nonce)` at the local tip.
    fn current_config(&self, account: &AccountId) -> Result<(Hash, u64), KeystoreError>;

    /// Master ledger record (master chain only).
    fn master_state(&self, account: &AccountId) -> Result<MasterLedger, KeystoreError>;

    /// Replica ledger record (replica chains only).
    fn replica_state(&self, account: &AccountId) -> Result<ReplicaLedger, KeystoreError>;

    /// Mirrored hash at `nonce` on a replica, if still mirrored.
    fn mirrored_config_hash(
        &self,
        account: &AccountId,
        nonce: u64,
    ) -> Result<Option<Hash>, KeystoreError>;

    /// Hook module currently active for the account.
    fn implementation(&self, account: &AccountId) -> Result<ImplementationId, KeystoreError>;

    /// Whether the replica's master view is older than the configured
    /// maximum age at `now`. Always `false` on the master or when no maximum
    /// is configured.
    fn is_master_view_stale(&self, account: &AccountId, now: u64) -> Result<bool, KeystoreError>;
}
