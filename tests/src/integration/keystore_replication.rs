//! # Keystore Replication Flows
//!
//! Drives a master keystore service and replica services sharing an account
//! identity. Replicas learn the master's state only through keystore proofs
//! drawn from sealed master blocks.
//!
//! ## Flows Tested:
//!
//! 1. **Master commits, replica syncs**: replica adopts the master sequence
//! 2. **Optimistic replica commits**: matching entries survive, divergent ones reset
//! 3. **Unsealed master state**: acknowledgment-only syncs advance time only
//! 4. **Relayer reordering**: older proofs are rejected after newer ones
//! 5. **Upgrades**: implementation swaps propagate through reset re-application
//! 6. **Racing submitters**: exactly one writer wins each nonce

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;

    use parking_lot::RwLock;
    use tracing_subscriber::EnvFilter;

    use qc_18_keystore::{
        config_hash, AccountConfig, AccountId, ChainRole, ExtractedMasterState, Hash,
        HookCall, HookRegistry, ImplementationId, InMemoryEventLog, InMemoryKeystoreStore,
        KeystoreApi, KeystoreConfig, KeystoreError, KeystoreEvent, KeystoreService,
        KeystoreStore, ProofExtractor, ScriptedHooks, APPLIED_DATA_SLOT,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const IMPL_V1: ImplementationId = ImplementationId([0x01; 20]);
    const IMPL_V2: ImplementationId = ImplementationId([0x02; 20]);

    const ACCOUNT: AccountId = AccountId([0xAC; 20]);

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Proof extractor backed by sealed master blocks.
    ///
    /// Sealing snapshots the master ledger into a block at `timestamp`; the
    /// returned proof resolves to that snapshot. A block sealed before the
    /// master's config made it into the proven root extracts as absent.
    struct MasterChainOracle {
        master_store: Arc<InMemoryKeystoreStore>,
        sealed: RwLock<HashMap<Vec<u8>, ExtractedMasterState>>,
    }

    impl MasterChainOracle {
        fn new(master_store: Arc<InMemoryKeystoreStore>) -> Self {
            Self {
                master_store,
                sealed: RwLock::new(HashMap::new()),
            }
        }

        fn proof_bytes(account: &AccountId, timestamp: u64) -> Vec<u8> {
            let mut proof = account.as_bytes().to_vec();
            proof.extend_from_slice(&timestamp.to_be_bytes());
            proof
        }

        /// Seal a master block whose proven root includes the account's config.
        fn seal(&self, account: &AccountId, timestamp: u64) -> Vec<u8> {
            let master = self
                .master_store
                .load_master(account)
                .expect("master ledger readable");
            self.insert(
                account,
                timestamp,
                ExtractedMasterState::present(timestamp, master.config_hash),
            )
        }

        /// Seal a master block whose proven root does not include the config yet.
        fn seal_unproven(&self, account: &AccountId, timestamp: u64) -> Vec<u8> {
            self.insert(account, timestamp, ExtractedMasterState::absent(timestamp))
        }

        fn insert(&self, account: &AccountId, timestamp: u64, state: ExtractedMasterState) -> Vec<u8> {
            let proof = Self::proof_bytes(account, timestamp);
            self.sealed.write().insert(proof.clone(), state);
            proof
        }
    }

    impl ProofExtractor for MasterChainOracle {
        fn extract(
            &self,
            account: &AccountId,
            proof: &[u8],
        ) -> Result<ExtractedMasterState, KeystoreError> {
            if proof.len() != 28 || &proof[..20] != account.as_bytes() {
                return Err(KeystoreError::ProofInvalid(
                    "proof not drawn for this account".to_string(),
                ));
            }
            self.sealed
                .read()
                .get(proof)
                .copied()
                .ok_or_else(|| KeystoreError::ProofInvalid("unknown master block".to_string()))
        }
    }

    type Service =
        KeystoreService<InMemoryKeystoreStore, MasterChainOracle, HookRegistry, InMemoryEventLog>;

    /// One chain running the keystore service.
    struct Chain {
        service: Service,
        store: Arc<InMemoryKeystoreStore>,
        registry: Arc<HookRegistry>,
        events: Arc<InMemoryEventLog>,
        hooks: ScriptedHooks,
    }

    impl Chain {
        fn new(local_chain_id: u64, oracle: Arc<MasterChainOracle>) -> Self {
            Self::with_store(local_chain_id, oracle, Arc::new(InMemoryKeystoreStore::new()))
        }

        fn with_store(
            local_chain_id: u64,
            oracle: Arc<MasterChainOracle>,
            store: Arc<InMemoryKeystoreStore>,
        ) -> Self {
            let registry = Arc::new(HookRegistry::new());
            let hooks = ScriptedHooks::permissive(IMPL_V1);
            registry.register(IMPL_V1, Arc::new(hooks.clone()));

            let config = KeystoreConfig {
                local_chain_id: qc_18_keystore::ChainId(local_chain_id),
                master_chain_id: qc_18_keystore::ChainId(1),
                max_master_view_age_secs: Some(600),
            };
            let events = Arc::new(InMemoryEventLog::new());
            let service =
                KeystoreService::new(config, store.clone(), oracle, registry.clone(), events.clone());
            Self {
                service,
                store,
                registry,
                events,
                hooks,
            }
        }

        fn applied_data(&self) -> Vec<u8> {
            self.store
                .load_account(&ACCOUNT)
                .expect("account readable")
                .and_then(|record| record.get(APPLIED_DATA_SLOT).map(<[u8]>::to_vec))
                .unwrap_or_default()
        }
    }

    /// Master chain (id 1) plus two replicas (ids 10, 20), all initialized
    /// with the same genesis config.
    struct Network {
        oracle: Arc<MasterChainOracle>,
        master: Chain,
        replica_a: Chain,
        replica_b: Chain,
    }

    fn network() -> Network {
        init_tracing();
        let master_store = Arc::new(InMemoryKeystoreStore::new());
        let oracle = Arc::new(MasterChainOracle::new(master_store.clone()));
        let master = Chain::with_store(1, oracle.clone(), master_store);
        let replica_a = Chain::new(10, oracle.clone());
        let replica_b = Chain::new(20, oracle.clone());

        let genesis = AccountConfig::genesis(b"signers:alice".to_vec());
        for chain in [&master, &replica_a, &replica_b] {
            chain
                .service
                .initialize_account(ACCOUNT, IMPL_V1, &genesis)
                .expect("genesis accepted");
        }

        Network {
            oracle,
            master,
            replica_a,
            replica_b,
        }
    }

    fn cfg(nonce: u64, data: &str) -> AccountConfig {
        AccountConfig::new(nonce, data.as_bytes().to_vec())
    }

    fn hash_of(config: &AccountConfig) -> Hash {
        config_hash(config, &ACCOUNT)
    }

    // =============================================================================
    // TESTS
    // =============================================================================

    #[test]
    fn test_genesis_is_identical_across_chains() {
        let net = network();
        let master = net.master.service.current_config(&ACCOUNT).unwrap();
        assert_eq!(net.replica_a.service.current_config(&ACCOUNT).unwrap(), master);
        assert_eq!(net.replica_b.service.current_config(&ACCOUNT).unwrap(), master);
        assert_eq!(net.master.service.role(), ChainRole::Master);
        assert_eq!(net.replica_a.service.role(), ChainRole::Replica);
    }

    #[test]
    fn test_replica_adopts_master_sequence() {
        let net = network();
        let c1 = cfg(1, "signers:alice,bob");
        let c2 = cfg(2, "signers:bob");
        net.master.service.set_config(ACCOUNT, &c1, b"sig").unwrap();
        net.master.service.set_config(ACCOUNT, &c2, b"sig").unwrap();
        let proof = net.oracle.seal(&ACCOUNT, 1_000);

        let synced = net.replica_a.service.sync_config(ACCOUNT, &c2, &proof).unwrap();

        assert_eq!(synced, (hash_of(&c2), 1_000));
        assert_eq!(
            net.replica_a.service.current_config(&ACCOUNT).unwrap(),
            net.master.service.current_config(&ACCOUNT).unwrap()
        );
        assert_eq!(net.replica_a.applied_data(), b"signers:bob".to_vec());
        assert!(net
            .replica_a
            .events
            .events()
            .iter()
            .any(|e| matches!(e, KeystoreEvent::MirroredHistoryReset { master_config_nonce: 2, .. })));

        // The other replica never saw the proof.
        assert_eq!(net.replica_b.service.current_config(&ACCOUNT).unwrap().1, 0);
    }

    #[test]
    fn test_optimistic_replica_commit_survives_matching_sync() {
        let net = network();
        let c1 = cfg(1, "signers:alice,bob");

        // Same update submitted on both chains.
        net.master.service.set_config(ACCOUNT, &c1, b"sig").unwrap();
        net.replica_a.service.set_config(ACCOUNT, &c1, b"sig").unwrap();
        let proof = net.oracle.seal(&ACCOUNT, 1_000);
        net.replica_a.hooks.calls.clear();

        net.replica_a.service.sync_config(ACCOUNT, &c1, &proof).unwrap();

        let replica = net.replica_a.service.replica_state(&ACCOUNT).unwrap();
        assert_eq!(replica.mirrored_config_hashes().len(), 2);
        assert_eq!(replica.master_config_hash(), hash_of(&c1));
        // Consistent sync does not re-run apply.
        assert!(net.replica_a.hooks.calls.calls().is_empty());
    }

    #[test]
    fn test_divergent_replica_commit_is_reset() {
        let net = network();
        let official = cfg(1, "signers:alice,bob");
        let rogue = cfg(1, "signers:mallory");

        net.master.service.set_config(ACCOUNT, &official, b"sig").unwrap();
        net.replica_a.service.set_config(ACCOUNT, &rogue, b"sig").unwrap();
        net.replica_a
            .service
            .set_config(ACCOUNT, &cfg(2, "signers:mallory,eve"), b"sig")
            .unwrap();
        let proof = net.oracle.seal(&ACCOUNT, 1_000);

        net.replica_a.service.sync_config(ACCOUNT, &official, &proof).unwrap();

        let replica = net.replica_a.service.replica_state(&ACCOUNT).unwrap();
        assert_eq!(replica.mirrored_config_hashes(), &[hash_of(&official)]);
        assert_eq!(replica.current_config_nonce(), 1);
        assert_eq!(net.replica_a.applied_data(), b"signers:alice,bob".to_vec());
        assert_eq!(
            net.replica_a.service.mirrored_config_hash(&ACCOUNT, 2).unwrap(),
            None
        );
    }

    #[test]
    fn test_unproven_master_block_only_acknowledges() {
        let net = network();
        net.master
            .service
            .set_config(ACCOUNT, &cfg(1, "signers:bob"), b"sig")
            .unwrap();
        let before = net.replica_a.service.replica_state(&ACCOUNT).unwrap();
        let proof = net.oracle.seal_unproven(&ACCOUNT, 500);

        let synced = net
            .replica_a
            .service
            .sync_config(ACCOUNT, &cfg(1, "signers:bob"), &proof)
            .unwrap();

        assert_eq!(synced, (before.master_config_hash(), 500));
        let after = net.replica_a.service.replica_state(&ACCOUNT).unwrap();
        assert_eq!(after.master_config_hash(), before.master_config_hash());
        assert_eq!(after.current_config_nonce(), before.current_config_nonce());
        assert_eq!(after.mirrored_config_hashes(), before.mirrored_config_hashes());
        assert_eq!(
            net.replica_a.events.last(),
            Some(KeystoreEvent::ConfigSynced {
                account: ACCOUNT,
                master_config_hash: before.master_config_hash(),
                master_block_timestamp: 500,
            })
        );
        assert!(!net
            .replica_a
            .events
            .events()
            .iter()
            .any(|e| matches!(e, KeystoreEvent::MirroredHistoryReset { .. })));
        assert!(!net.replica_a.service.is_master_view_stale(&ACCOUNT, 1_100).unwrap());
        assert!(net.replica_a.service.is_master_view_stale(&ACCOUNT, 1_101).unwrap());
    }

    #[test]
    fn test_reordered_proofs_are_rejected() {
        let net = network();
        let c1 = cfg(1, "signers:bob");
        net.master.service.set_config(ACCOUNT, &c1, b"sig").unwrap();
        let older = net.oracle.seal(&ACCOUNT, 100);
        let c2 = cfg(2, "signers:carol");
        net.master.service.set_config(ACCOUNT, &c2, b"sig").unwrap();
        let newer = net.oracle.seal(&ACCOUNT, 200);

        net.replica_a.service.sync_config(ACCOUNT, &c2, &newer).unwrap();
        let before = net.replica_a.service.replica_state(&ACCOUNT).unwrap();

        let err = net
            .replica_a
            .service
            .sync_config(ACCOUNT, &c1, &older)
            .unwrap_err();

        assert_eq!(err, KeystoreError::StaleMasterTimestamp { stored: 200, got: 100 });
        assert_eq!(net.replica_a.service.replica_state(&ACCOUNT).unwrap(), before);
    }

    #[test]
    fn test_proof_for_other_account_rejected() {
        let net = network();
        let other = AccountId([0x0B; 20]);
        let proof = net.oracle.seal_unproven(&other, 100);

        let err = net
            .replica_a
            .service
            .sync_config(ACCOUNT, &cfg(0, "x"), &proof)
            .unwrap_err();

        assert!(matches!(err, KeystoreError::ProofInvalid(_)));
    }

    #[test]
    fn test_forged_master_config_rejected() {
        let net = network();
        net.master
            .service
            .set_config(ACCOUNT, &cfg(1, "signers:bob"), b"sig")
            .unwrap();
        let proof = net.oracle.seal(&ACCOUNT, 100);

        let err = net
            .replica_a
            .service
            .sync_config(ACCOUNT, &cfg(1, "signers:mallory"), &proof)
            .unwrap_err();

        assert!(matches!(err, KeystoreError::ConfigMismatch { .. }));
        assert_eq!(net.replica_a.service.current_config(&ACCOUNT).unwrap().1, 0);
    }

    #[test]
    fn test_master_upgrade_propagates_through_reset() {
        let net = network();
        // v1 on every chain upgrades to v2 when applied.
        for chain in [&net.master, &net.replica_a] {
            chain.registry.register(
                IMPL_V1,
                Arc::new(ScriptedHooks {
                    upgrade_to: Some(IMPL_V2),
                    ..chain.hooks.clone()
                }),
            );
            chain
                .registry
                .register(IMPL_V2, Arc::new(ScriptedHooks::permissive(IMPL_V2)));
        }

        let upgrade = cfg(1, "upgrade:v2");
        net.master.service.set_config(ACCOUNT, &upgrade, b"sig").unwrap();
        assert_eq!(net.master.service.implementation(&ACCOUNT).unwrap(), IMPL_V2);

        let proof = net.oracle.seal(&ACCOUNT, 100);
        net.replica_a.hooks.calls.clear();
        net.replica_a.service.sync_config(ACCOUNT, &upgrade, &proof).unwrap();

        assert_eq!(net.replica_a.service.implementation(&ACCOUNT).unwrap(), IMPL_V2);
        assert_eq!(
            net.replica_a.hooks.calls.calls(),
            vec![HookCall::Apply(IMPL_V1, 1)]
        );
    }

    #[test]
    fn test_racing_submitters_one_winner_per_nonce() {
        let net = network();
        let service = Arc::new(net.master.service);

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let service = service.clone();
                thread::spawn(move || {
                    let config = AccountConfig::new(1, vec![i]);
                    service.set_config(ACCOUNT, &config, b"sig")
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("submitter thread"))
            .collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == KeystoreError::NonceNotSequential { expected: 2, got: 1 }));
        assert_eq!(service.current_config(&ACCOUNT).unwrap().1, 1);

        let committed = net
            .master
            .events
            .events()
            .into_iter()
            .filter(|e| matches!(e, KeystoreEvent::ConfigCommitted { .. }))
            .count();
        assert_eq!(committed, 1);
    }

    #[test]
    fn test_replicas_sync_independently() {
        let net = network();
        let c1 = cfg(1, "signers:bob");
        net.master.service.set_config(ACCOUNT, &c1, b"sig").unwrap();
        let p1 = net.oracle.seal(&ACCOUNT, 100);
        let c2 = cfg(2, "signers:carol");
        net.master.service.set_config(ACCOUNT, &c2, b"sig").unwrap();
        let p2 = net.oracle.seal(&ACCOUNT, 200);

        net.replica_a.service.sync_config(ACCOUNT, &c1, &p1).unwrap();
        net.replica_b.service.sync_config(ACCOUNT, &c2, &p2).unwrap();
        // Replica A catches up later.
        net.replica_a.service.sync_config(ACCOUNT, &c2, &p2).unwrap();

        assert_eq!(
            net.replica_a.service.current_config(&ACCOUNT).unwrap(),
            net.replica_b.service.current_config(&ACCOUNT).unwrap()
        );
        assert_eq!(
            net.replica_a.service.replica_state(&ACCOUNT).unwrap().master_block_timestamp(),
            200
        );
    }
}
