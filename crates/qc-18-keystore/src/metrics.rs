//! # Keystore Metrics
//!
//! Prometheus metrics for the keystore replication protocol.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-18-keystore = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `keystore_configs_committed_total` - Counter of committed config updates
//! - `keystore_syncs_total` - Counter of accepted syncs (by outcome: config/acknowledged)
//! - `keystore_mirrored_resets_total` - Counter of mirrored history resets
//! - `keystore_operations_rejected_total` - Counter of failed operations (by reason)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_counter_vec, register_int_counter, CounterVec, IntCounter};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total config updates committed
    pub static ref CONFIGS_COMMITTED: IntCounter = register_int_counter!(
        "keystore_configs_committed_total",
        "Total number of config updates committed"
    )
    .expect("Failed to create CONFIGS_COMMITTED metric");

    /// Total syncs accepted, labeled by outcome
    pub static ref SYNCS: CounterVec = register_counter_vec!(
        "keystore_syncs_total",
        "Total number of accepted keystore syncs",
        &["outcome"]
    )
    .expect("Failed to create SYNCS metric");

    /// Total mirrored history resets
    pub static ref MIRRORED_RESETS: IntCounter = register_int_counter!(
        "keystore_mirrored_resets_total",
        "Total number of mirrored history resets"
    )
    .expect("Failed to create MIRRORED_RESETS metric");

    /// Total rejected operations, labeled by reason
    pub static ref OPERATIONS_REJECTED: CounterVec = register_counter_vec!(
        "keystore_operations_rejected_total",
        "Total number of rejected keystore operations",
        &["reason"]
    )
    .expect("Failed to create OPERATIONS_REJECTED metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a committed config
#[cfg(feature = "metrics")]
pub fn record_config_committed() {
    CONFIGS_COMMITTED.inc();
}

/// Record an accepted sync (`config` or `acknowledged`)
#[cfg(feature = "metrics")]
pub fn record_sync(outcome: &str) {
    SYNCS.with_label_values(&[outcome]).inc();
}

/// Record a mirrored history reset
#[cfg(feature = "metrics")]
pub fn record_mirrored_reset() {
    MIRRORED_RESETS.inc();
}

/// Record a rejected operation with reason
#[cfg(feature = "metrics")]
pub fn record_rejected(reason: &str) {
    OPERATIONS_REJECTED.with_label_values(&[reason]).inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

/// Record a committed config (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_config_committed() {}

/// Record an accepted sync (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_sync(_outcome: &str) {}

/// Record a mirrored history reset (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_mirrored_reset() {}

/// Record a rejected operation (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_rejected(_reason: &str) {}
