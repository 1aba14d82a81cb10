//! # Outbound Ports
//!
//! Traits for external dependencies: account hook modules, proof
//! extraction, persistence and event publication.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::domain::{
    AccountConfig, AccountId, AccountRecord, ChainRole, ExtractedMasterState, ImplementationId,
    KeystoreError, MasterLedger, ReplicaLedger,
};
use crate::events::KeystoreEvent;

// =============================================================================
// Account hooks
// =============================================================================

/// View of an account handed to hook modules.
///
/// Hooks only see the staged copy of the account record; whatever they write
/// is discarded if the operation fails.
pub struct HookContext<'a> {
    role: ChainRole,
    record: &'a mut AccountRecord,
}

impl<'a> HookContext<'a> {
    /// Wrap a staged account record.
    pub fn new(role: ChainRole, record: &'a mut AccountRecord) -> Self {
        Self { role, record }
    }

    /// Account the hook runs for.
    pub fn account(&self) -> &AccountId {
        &self.record.account
    }

    /// Role of the local chain.
    pub fn role(&self) -> ChainRole {
        self.role
    }

    /// Hook module currently active for the account.
    pub fn implementation(&self) -> ImplementationId {
        self.record.implementation
    }

    /// Read an account storage slot.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.record.get(key)
    }

    /// Write an account storage slot.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.record.set(key, value);
    }

    /// Clear an account storage slot.
    pub fn remove(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.record.remove(key)
    }

    /// Swap the account's hook module. The new module takes effect for every
    /// hook dispatched after this call, including *validate* of the same
    /// operation.
    pub fn upgrade_to(&mut self, implementation: ImplementationId) {
        self.record.implementation = implementation;
    }
}

/// Account hook module - outbound port.
///
/// Supplies the account-specific semantics the replication protocol
/// delegates: who may change the config, what a config means once applied,
/// and whether the resulting state is acceptable.
pub trait AccountHooks: Send + Sync {
    /// Whether `proof` authorizes moving to `config`. Runs before any state
    /// is touched.
    fn authorize(&self, ctx: &HookContext<'_>, config: &AccountConfig, proof: &[u8]) -> bool;

    /// Apply `config` to the account. Returns `true` when the account's
    /// implementation was swapped (see [`HookContext::upgrade_to`]).
    fn apply(&self, ctx: &mut HookContext<'_>, config: &AccountConfig) -> bool;

    /// Whether the post-apply state is acceptable.
    fn validate(&self, ctx: &HookContext<'_>, config: &AccountConfig, proof: &[u8]) -> bool;
}

/// Hook resolution - outbound port.
pub trait HookResolver: Send + Sync {
    /// Hook module for `implementation`.
    fn resolve(&self, implementation: ImplementationId)
        -> Result<Arc<dyn AccountHooks>, KeystoreError>;
}

// =============================================================================
// Proof extraction
// =============================================================================

/// Keystore proof extractor - outbound port.
///
/// Turns an opaque proof against an already-finalized source of truth (a
/// verified state root, a bridged root...) into the master's config hash for
/// `account` at the proof's reference block.
pub trait ProofExtractor: Send + Sync {
    /// Extract the master state. Fails with
    /// [`KeystoreError::ProofInvalid`] when the proof does not verify.
    fn extract(
        &self,
        account: &AccountId,
        proof: &[u8],
    ) -> Result<ExtractedMasterState, KeystoreError>;
}

// =============================================================================
// Persistence
// =============================================================================

/// Records written together at the end of a successful operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    /// Account the records belong to.
    pub account: AccountId,
    /// Hook-owned account state.
    pub record: Option<AccountRecord>,
    /// Master ledger record.
    pub master: Option<MasterLedger>,
    /// Replica ledger record.
    pub replica: Option<ReplicaLedger>,
}

impl WriteBatch {
    /// Empty batch for `account`.
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            ..Default::default()
        }
    }

    /// Check if the batch writes nothing.
    pub fn is_empty(&self) -> bool {
        self.record.is_none() && self.master.is_none() && self.replica.is_none()
    }
}

/// Keystore storage - outbound port.
///
/// Each account owns three independent records (account state, master
/// ledger, replica ledger). Absent ledgers load as their uninitialized
/// default.
pub trait KeystoreStore: Send + Sync {
    /// Load hook-owned account state.
    fn load_account(&self, account: &AccountId) -> Result<Option<AccountRecord>, KeystoreError>;

    /// Load the master ledger record.
    fn load_master(&self, account: &AccountId) -> Result<MasterLedger, KeystoreError>;

    /// Load the replica ledger record.
    fn load_replica(&self, account: &AccountId) -> Result<ReplicaLedger, KeystoreError>;

    /// Write every record in `batch`, all or nothing.
    fn commit(&self, batch: WriteBatch) -> Result<(), KeystoreError>;
}

// =============================================================================
// Events
// =============================================================================

/// Event sink - outbound port.
pub trait EventSink: Send + Sync {
    /// Publish a committed event.
    fn publish(&self, event: KeystoreEvent);
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Storage slot [`ScriptedHooks`] writes the last applied config data to.
pub const APPLIED_DATA_SLOT: &[u8] = b"scripted/applied-data";

/// Storage slot [`ScriptedHooks`] writes the last applied nonce to.
pub const APPLIED_NONCE_SLOT: &[u8] = b"scripted/applied-nonce";

/// Hook invocation recorded by [`ScriptedHooks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookCall {
    /// `authorize` for nonce, by module.
    Authorize(ImplementationId, u64),
    /// `apply` for nonce, by module.
    Apply(ImplementationId, u64),
    /// `validate` for nonce, by module.
    Validate(ImplementationId, u64),
}

/// Shared log of hook invocations.
#[derive(Clone, Debug, Default)]
pub struct HookCallLog(Arc<Mutex<Vec<HookCall>>>);

impl HookCallLog {
    /// Record a call.
    pub fn record(&self, call: HookCall) {
        self.0.lock().push(call);
    }

    /// Snapshot of recorded calls.
    pub fn calls(&self) -> Vec<HookCall> {
        self.0.lock().clone()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Mock hook module with scripted answers.
///
/// `apply` writes the config's data and nonce to [`APPLIED_DATA_SLOT`] /
/// [`APPLIED_NONCE_SLOT`] and, when `upgrade_to` is set, swaps the account's
/// implementation. `validate` additionally requires the applied data slot to
/// hold the config's data.
#[derive(Clone, Debug)]
pub struct ScriptedHooks {
    /// Module identity (recorded in the call log).
    pub id: ImplementationId,
    /// Answer for `authorize`.
    pub authorize: bool,
    /// Answer for `validate`.
    pub validate: bool,
    /// Implementation to upgrade to during `apply`.
    pub upgrade_to: Option<ImplementationId>,
    /// Call log.
    pub calls: HookCallLog,
}

impl ScriptedHooks {
    /// Module that authorizes and validates everything.
    pub fn permissive(id: ImplementationId) -> Self {
        Self {
            id,
            authorize: true,
            validate: true,
            upgrade_to: None,
            calls: HookCallLog::default(),
        }
    }
}

impl AccountHooks for ScriptedHooks {
    fn authorize(&self, _ctx: &HookContext<'_>, config: &AccountConfig, _proof: &[u8]) -> bool {
        self.calls.record(HookCall::Authorize(self.id, config.nonce));
        self.authorize
    }

    fn apply(&self, ctx: &mut HookContext<'_>, config: &AccountConfig) -> bool {
        self.calls.record(HookCall::Apply(self.id, config.nonce));
        ctx.set(APPLIED_DATA_SLOT, config.data.clone());
        ctx.set(APPLIED_NONCE_SLOT, config.nonce.to_be_bytes());
        match self.upgrade_to {
            Some(next) if next != ctx.implementation() => {
                ctx.upgrade_to(next);
                true
            }
            _ => false,
        }
    }

    fn validate(&self, ctx: &HookContext<'_>, config: &AccountConfig, _proof: &[u8]) -> bool {
        self.calls.record(HookCall::Validate(self.id, config.nonce));
        self.validate && ctx.get(APPLIED_DATA_SLOT) == Some(config.data.as_slice())
    }
}

/// Mock proof extractor answering from a table of known proofs.
#[derive(Default)]
pub struct MockProofExtractor {
    proofs: RwLock<HashMap<(AccountId, Vec<u8>), ExtractedMasterState>>,
}

impl MockProofExtractor {
    /// Create an empty extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the state `proof` extracts to for `account`.
    pub fn insert(&self, account: AccountId, proof: impl Into<Vec<u8>>, state: ExtractedMasterState) {
        self.proofs.write().insert((account, proof.into()), state);
    }
}

impl ProofExtractor for MockProofExtractor {
    fn extract(
        &self,
        account: &AccountId,
        proof: &[u8],
    ) -> Result<ExtractedMasterState, KeystoreError> {
        self.proofs
            .read()
            .get(&(*account, proof.to_vec()))
            .copied()
            .ok_or_else(|| KeystoreError::ProofInvalid("unknown keystore proof".to_string()))
    }
}
