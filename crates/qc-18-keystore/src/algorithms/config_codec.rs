//! # Config Codec
//!
//! Canonical hashing and verification of account configs.
//!
//! # Encoding
//!
//! ```text
//! keccak256( DOMAIN_TAG || account (20 bytes) || nonce (u64 BE) || data )
//! ```
//!
//! The account identity is part of the preimage, so identical
//! `(nonce, data)` pairs owned by different accounts never share a hash.
//! `data` is the only variable-length field and comes last.

use sha3::{Digest, Keccak256};

use crate::domain::{AccountConfig, AccountId, Hash, KeystoreError};

/// Domain separation tag for config hashes.
pub const CONFIG_HASH_DOMAIN: &[u8] = b"qc-18-keystore/config/v1";

/// Compute the canonical hash of `config` for `account`.
pub fn config_hash(config: &AccountConfig, account: &AccountId) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(CONFIG_HASH_DOMAIN);
    hasher.update(account.as_bytes());
    hasher.update(config.nonce.to_be_bytes());
    hasher.update(&config.data);
    hasher.finalize().into()
}

/// Verify that `config` hashes to `expected` for `account`.
pub fn verify_config(
    config: &AccountConfig,
    account: &AccountId,
    expected: &Hash,
) -> Result<(), KeystoreError> {
    let computed = config_hash(config, account);
    if computed != *expected {
        return Err(KeystoreError::ConfigMismatch {
            expected: *expected,
            computed,
        });
    }
    Ok(())
}
