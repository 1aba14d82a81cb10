//! # Algorithms Module
//!
//! Pure algorithms for Keystore Replication.
//!
//! - `config_codec`: canonical config hashing and verification
//! - `mirrored_history`: nonce-to-position arithmetic over mirrored hashes

pub mod config_codec;
pub mod mirrored_history;

pub use config_codec::{config_hash, verify_config, CONFIG_HASH_DOMAIN};
pub use mirrored_history::{mirrored_index, oldest_mirrored_nonce};
