//! # Application Layer
//!
//! Service orchestrating the keystore replication protocol.

pub mod service;

pub use service::KeystoreService;
