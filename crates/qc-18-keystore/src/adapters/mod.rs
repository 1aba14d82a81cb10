//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-process implementations of the outbound ports: record storage, hook
//! module registry and event log.

mod event_log;
mod hook_registry;
mod memory_store;

pub use event_log::InMemoryEventLog;
pub use hook_registry::HookRegistry;
pub use memory_store::{InMemoryKeystoreStore, RecordKind, StorageKey};
