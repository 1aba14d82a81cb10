//! # Keystore Service
//!
//! Application service orchestrating config commits and master syncs.
//!
//! Every mutating operation runs against a staged copy of the account record
//! and the local ledger. Only when the whole hook sequence succeeds is the
//! copy written back in one store batch, after which the collected events are
//! published.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::algorithms::{config_hash, verify_config};
use crate::config::KeystoreConfig;
use crate::domain::{
    invariant_fresh_master_timestamp, invariant_nonce_sequential, AccountConfig, AccountId,
    AccountRecord, ChainRole, Hash, ImplementationId, KeystoreError, Ledger, MasterLedger,
    ReplicaLedger,
};
use crate::events::KeystoreEvent;
use crate::metrics;
use crate::ports::{
    AccountHooks, EventSink, HookContext, HookResolver, KeystoreApi, KeystoreStore,
    ProofExtractor, WriteBatch,
};

/// Account state loaded for one operation.
struct StagedAccount {
    account: AccountId,
    record: AccountRecord,
    ledger: Ledger,
    events: Vec<KeystoreEvent>,
}

impl StagedAccount {
    fn into_parts(self) -> (WriteBatch, Vec<KeystoreEvent>) {
        let mut batch = WriteBatch::new(self.account);
        batch.record = Some(self.record);
        match self.ledger {
            Ledger::Master(master) => batch.master = Some(master),
            Ledger::Replica(replica) => batch.replica = Some(replica),
        }
        (batch, self.events)
    }
}

/// Keystore Service - runs the replication protocol for one chain.
pub struct KeystoreService<S, P, R, E>
where
    S: KeystoreStore,
    P: ProofExtractor,
    R: HookResolver,
    E: EventSink,
{
    /// Configuration.
    config: KeystoreConfig,
    /// Role derived from the configuration.
    role: ChainRole,
    /// Ledger and account storage.
    store: Arc<S>,
    /// Keystore proof extractor.
    extractor: Arc<P>,
    /// Hook module resolution.
    hooks: Arc<R>,
    /// Event sink.
    events: Arc<E>,
    /// Serializes mutating operations.
    op_lock: Mutex<()>,
}

impl<S, P, R, E> KeystoreService<S, P, R, E>
where
    S: KeystoreStore,
    P: ProofExtractor,
    R: HookResolver,
    E: EventSink,
{
    /// Create a new keystore service.
    pub fn new(
        config: KeystoreConfig,
        store: Arc<S>,
        extractor: Arc<P>,
        hooks: Arc<R>,
        events: Arc<E>,
    ) -> Self {
        let role = config.role();
        info!(
            local_chain = config.local_chain_id.0,
            master_chain = config.master_chain_id.0,
            ?role,
            "[qc-18] keystore service created"
        );
        Self {
            config,
            role,
            store,
            extractor,
            hooks,
            events,
            op_lock: Mutex::new(()),
        }
    }

    /// Service configuration.
    pub fn config(&self) -> &KeystoreConfig {
        &self.config
    }

    fn load_ledger(&self, account: &AccountId) -> Result<Ledger, KeystoreError> {
        Ok(match self.role {
            ChainRole::Master => Ledger::Master(self.store.load_master(account)?),
            ChainRole::Replica => Ledger::Replica(self.store.load_replica(account)?),
        })
    }

    /// Load the account record and local ledger of an initialized account.
    fn stage(&self, account: AccountId) -> Result<StagedAccount, KeystoreError> {
        let ledger = self.load_ledger(&account)?;
        if !ledger.is_initialized() {
            return Err(KeystoreError::NotInitialized { account });
        }
        let record = self
            .store
            .load_account(&account)?
            .ok_or(KeystoreError::NotInitialized { account })?;
        Ok(StagedAccount {
            account,
            record,
            ledger,
            events: Vec::new(),
        })
    }

    /// Write the staged records, then publish the staged events.
    fn commit(&self, staged: StagedAccount) -> Result<(), KeystoreError> {
        let (batch, events) = staged.into_parts();
        self.store.commit(batch)?;
        for event in events {
            self.events.publish(event);
        }
        Ok(())
    }

    fn resolve(&self, record: &AccountRecord) -> Result<Arc<dyn AccountHooks>, KeystoreError> {
        debug!(implementation = %record.implementation, "[qc-18] resolving hook module");
        self.hooks.resolve(record.implementation)
    }

    fn rejected(&self, operation: &str, account: &AccountId, err: KeystoreError) -> KeystoreError {
        warn!(
            operation,
            account = %account,
            reason = err.reason(),
            error = %err,
            "[qc-18] operation rejected"
        );
        metrics::record_rejected(err.reason());
        err
    }

    fn initialize_staged(
        &self,
        account: AccountId,
        implementation: ImplementationId,
        genesis: &AccountConfig,
    ) -> Result<Hash, KeystoreError> {
        let genesis_hash = config_hash(genesis, &account);

        let mut ledger = self.load_ledger(&account)?;
        ledger.initialize(&account, genesis_hash, genesis.nonce)?;
        if self.store.load_account(&account)?.is_some() {
            return Err(KeystoreError::AlreadyInitialized { account });
        }

        let mut staged = StagedAccount {
            account,
            record: AccountRecord::new(account, implementation),
            ledger,
            events: Vec::new(),
        };

        // Seed hook state from the genesis config.
        let hooks = self.resolve(&staged.record)?;
        let upgraded = hooks.apply(&mut HookContext::new(self.role, &mut staged.record), genesis);
        debug!(upgraded, "[qc-18] genesis config applied");

        staged.events.push(KeystoreEvent::KeystoreInitialized {
            account,
            config_hash: genesis_hash,
            role: self.role,
        });
        self.commit(staged)?;

        info!(
            account = %account,
            config_hash = %hex::encode(genesis_hash),
            role = ?self.role,
            "[qc-18] keystore initialized"
        );
        Ok(genesis_hash)
    }

    fn set_config_staged(
        &self,
        account: AccountId,
        config: &AccountConfig,
        proof: &[u8],
    ) -> Result<Hash, KeystoreError> {
        let mut staged = self.stage(account)?;
        invariant_nonce_sequential(staged.ledger.current_nonce(), config.nonce)?;

        let hooks = self.resolve(&staged.record)?;
        if !hooks.authorize(&HookContext::new(self.role, &mut staged.record), config, proof) {
            return Err(KeystoreError::Unauthorized);
        }

        let committed = staged
            .ledger
            .commit(config_hash(config, &account), config.nonce);

        let upgraded = hooks.apply(&mut HookContext::new(self.role, &mut staged.record), config);

        // An upgrade swaps the module; validate must run the new one.
        let hooks = if upgraded {
            debug!(
                implementation = %staged.record.implementation,
                "[qc-18] apply triggered upgrade, re-resolving hooks"
            );
            self.resolve(&staged.record)?
        } else {
            hooks
        };

        if !hooks.validate(&HookContext::new(self.role, &mut staged.record), config, proof) {
            return Err(KeystoreError::InvalidConfig);
        }

        staged.events.push(KeystoreEvent::ConfigCommitted {
            account,
            config_hash: committed,
            config_nonce: config.nonce,
        });
        self.commit(staged)?;

        info!(
            account = %account,
            nonce = config.nonce,
            config_hash = %hex::encode(committed),
            upgraded,
            "[qc-18] config committed"
        );
        metrics::record_config_committed();
        Ok(committed)
    }

    fn sync_config_staged(
        &self,
        account: AccountId,
        master_config: &AccountConfig,
        keystore_proof: &[u8],
    ) -> Result<(Hash, u64), KeystoreError> {
        if self.role.is_master() {
            return Err(KeystoreError::NotReplicaChain {
                chain_id: self.config.local_chain_id,
            });
        }

        let mut staged = self.stage(account)?;
        let extracted = self.extractor.extract(&account, keystore_proof)?;

        let replica = staged
            .ledger
            .as_replica_mut()
            .ok_or(KeystoreError::NotReplicaChain {
                chain_id: self.config.local_chain_id,
            })?;
        invariant_fresh_master_timestamp(
            replica.master_block_timestamp(),
            extracted.master_block_timestamp,
        )?;

        let outcome = match extracted.master_config_hash {
            Some(master_hash) => {
                verify_config(master_config, &account, &master_hash)?;
                let reconciled = replica.apply_master_update(
                    master_hash,
                    master_config.nonce,
                    extracted.master_block_timestamp,
                )?;

                if reconciled.was_reset() {
                    // Local side effects may no longer match the master;
                    // rebuild them from the authoritative config.
                    let hooks = self.resolve(&staged.record)?;
                    let upgraded = hooks.apply(
                        &mut HookContext::new(self.role, &mut staged.record),
                        master_config,
                    );
                    info!(
                        account = %account,
                        nonce = master_config.nonce,
                        config_hash = %hex::encode(master_hash),
                        upgraded,
                        "[qc-18] mirrored history reset"
                    );
                    staged.events.push(KeystoreEvent::MirroredHistoryReset {
                        account,
                        master_config_hash: master_hash,
                        master_config_nonce: master_config.nonce,
                    });
                }
                Some(reconciled)
            }
            None => {
                replica.acknowledge_master_block(extracted.master_block_timestamp);
                None
            }
        };

        let synced = (replica.master_config_hash(), replica.master_block_timestamp());
        staged.events.push(KeystoreEvent::ConfigSynced {
            account,
            master_config_hash: synced.0,
            master_block_timestamp: synced.1,
        });
        self.commit(staged)?;

        info!(
            account = %account,
            master_config_hash = %hex::encode(synced.0),
            master_block_timestamp = synced.1,
            acknowledged_only = outcome.is_none(),
            "[qc-18] config synced"
        );
        match outcome {
            Some(reconciled) => {
                metrics::record_sync("config");
                if reconciled.was_reset() {
                    metrics::record_mirrored_reset();
                }
            }
            None => metrics::record_sync("acknowledged"),
        }
        Ok(synced)
    }
}

impl<S, P, R, E> KeystoreApi for KeystoreService<S, P, R, E>
where
    S: KeystoreStore,
    P: ProofExtractor,
    R: HookResolver,
    E: EventSink,
{
    #[instrument(skip_all, fields(account = %account, implementation = %implementation))]
    fn initialize_account(
        &self,
        account: AccountId,
        implementation: ImplementationId,
        genesis: &AccountConfig,
    ) -> Result<Hash, KeystoreError> {
        let _guard = self.op_lock.lock();
        self.initialize_staged(account, implementation, genesis)
            .map_err(|e| self.rejected("initialize_account", &account, e))
    }

    #[instrument(skip_all, fields(account = %account, nonce = config.nonce))]
    fn set_config(
        &self,
        account: AccountId,
        config: &AccountConfig,
        auth_and_validate_proof: &[u8],
    ) -> Result<Hash, KeystoreError> {
        let _guard = self.op_lock.lock();
        self.set_config_staged(account, config, auth_and_validate_proof)
            .map_err(|e| self.rejected("set_config", &account, e))
    }

    #[instrument(skip_all, fields(account = %account, nonce = master_config.nonce))]
    fn sync_config(
        &self,
        account: AccountId,
        master_config: &AccountConfig,
        keystore_proof: &[u8],
    ) -> Result<(Hash, u64), KeystoreError> {
        let _guard = self.op_lock.lock();
        self.sync_config_staged(account, master_config, keystore_proof)
            .map_err(|e| self.rejected("sync_config", &account, e))
    }

    fn role(&self) -> ChainRole {
        self.role
    }

    fn current_config(&self, account: &AccountId) -> Result<(Hash, u64), KeystoreError> {
        let ledger = self.load_ledger(account)?;
        if !ledger.is_initialized() {
            return Err(KeystoreError::NotInitialized { account: *account });
        }
        Ok((ledger.current_config_hash(), ledger.current_nonce()))
    }

    fn master_state(&self, account: &AccountId) -> Result<MasterLedger, KeystoreError> {
        let master = self.store.load_master(account)?;
        if !master.is_initialized() {
            return Err(KeystoreError::NotInitialized { account: *account });
        }
        Ok(master)
    }

    fn replica_state(&self, account: &AccountId) -> Result<ReplicaLedger, KeystoreError> {
        let replica = self.store.load_replica(account)?;
        if !replica.is_initialized() {
            return Err(KeystoreError::NotInitialized { account: *account });
        }
        Ok(replica)
    }

    fn mirrored_config_hash(
        &self,
        account: &AccountId,
        nonce: u64,
    ) -> Result<Option<Hash>, KeystoreError> {
        Ok(self.replica_state(account)?.mirrored_config_hash(nonce))
    }

    fn implementation(&self, account: &AccountId) -> Result<ImplementationId, KeystoreError> {
        self.store
            .load_account(account)?
            .map(|record| record.implementation)
            .ok_or(KeystoreError::NotInitialized { account: *account })
    }

    fn is_master_view_stale(&self, account: &AccountId, now: u64) -> Result<bool, KeystoreError> {
        let max_age = match (self.role, self.config.max_master_view_age_secs) {
            (ChainRole::Replica, Some(max_age)) => max_age,
            _ => return Ok(false),
        };
        let replica = self.replica_state(account)?;
        Ok(now.saturating_sub(replica.master_block_timestamp()) > max_age)
    }
}
