//! Hook registry adapter.
//!
//! Implements `HookResolver` as a mutable table keyed by implementation
//! identity. Lookups happen at the point of use, so a module registered or
//! replaced here is picked up by the next hook dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{ImplementationId, KeystoreError};
use crate::ports::{AccountHooks, HookResolver};

/// Registry of hook modules.
#[derive(Default)]
pub struct HookRegistry {
    modules: RwLock<HashMap<ImplementationId, Arc<dyn AccountHooks>>>,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the module for `implementation`.
    pub fn register(&self, implementation: ImplementationId, hooks: Arc<dyn AccountHooks>) {
        debug!(implementation = %implementation, "[qc-18] hook module registered");
        self.modules.write().insert(implementation, hooks);
    }

    /// Remove the module for `implementation`.
    pub fn unregister(&self, implementation: &ImplementationId) -> bool {
        self.modules.write().remove(implementation).is_some()
    }

    /// Check if `implementation` has a module.
    pub fn contains(&self, implementation: &ImplementationId) -> bool {
        self.modules.read().contains_key(implementation)
    }
}

impl HookResolver for HookRegistry {
    fn resolve(
        &self,
        implementation: ImplementationId,
    ) -> Result<Arc<dyn AccountHooks>, KeystoreError> {
        self.modules
            .read()
            .get(&implementation)
            .cloned()
            .ok_or(KeystoreError::UnknownImplementation(implementation))
    }
}
