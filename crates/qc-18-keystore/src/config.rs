//! # Keystore Configuration
//!
//! Configuration for the Keystore service.

use std::env;

use serde::{Deserialize, Serialize};

use crate::domain::{ChainId, ChainRole};

/// Keystore configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreConfig {
    /// Chain this service runs on.
    pub local_chain_id: ChainId,

    /// Chain holding the authoritative configs.
    pub master_chain_id: ChainId,

    /// Age after which a replica's master view is reported stale by
    /// `is_master_view_stale`. Purely informational; syncs are not refused.
    pub max_master_view_age_secs: Option<u64>,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            local_chain_id: ChainId(1),
            master_chain_id: ChainId(1),
            max_master_view_age_secs: None,
        }
    }
}

impl KeystoreConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KS_LOCAL_CHAIN_ID`: Local chain (default: 1)
    /// - `KS_MASTER_CHAIN_ID`: Master chain (default: 1)
    /// - `KS_MAX_MASTER_VIEW_AGE_SECS`: Staleness threshold (default: unset)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from `lookup`, which maps a variable name to its
    /// value. Missing or unparsable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse_u64 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            local_chain_id: parse_u64("KS_LOCAL_CHAIN_ID")
                .map(ChainId)
                .unwrap_or(defaults.local_chain_id),
            master_chain_id: parse_u64("KS_MASTER_CHAIN_ID")
                .map(ChainId)
                .unwrap_or(defaults.master_chain_id),
            max_master_view_age_secs: parse_u64("KS_MAX_MASTER_VIEW_AGE_SECS"),
        }
    }

    /// Create a config for testing with the given role (master chain 1,
    /// replicas on chain 10).
    pub fn for_testing(role: ChainRole) -> Self {
        Self {
            local_chain_id: match role {
                ChainRole::Master => ChainId(1),
                ChainRole::Replica => ChainId(10),
            },
            master_chain_id: ChainId(1),
            max_master_view_age_secs: Some(3600),
        }
    }

    /// Role of the local chain.
    pub fn role(&self) -> ChainRole {
        ChainRole::of(self.local_chain_id, self.master_chain_id)
    }
}
