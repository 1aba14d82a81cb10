//! # Domain Invariants
//!
//! Ordering rules enforced before any state is touched.

use super::errors::KeystoreError;

/// Invariant: Sequential nonce.
///
/// A submitted config must carry exactly the next nonce. The check is what
/// makes the loser of two racing submissions fail instead of overwriting.
pub fn invariant_nonce_sequential(current_nonce: u64, submitted: u64) -> Result<(), KeystoreError> {
    let expected = current_nonce.saturating_add(1);
    if submitted != expected || current_nonce == u64::MAX {
        return Err(KeystoreError::NonceNotSequential {
            expected,
            got: submitted,
        });
    }
    Ok(())
}

/// Invariant: Fresh master timestamp.
///
/// Proofs may be relayed out of order; only a strictly newer master block is
/// accepted.
pub fn invariant_fresh_master_timestamp(stored: u64, proof: u64) -> Result<(), KeystoreError> {
    if proof <= stored {
        return Err(KeystoreError::StaleMasterTimestamp { stored, got: proof });
    }
    Ok(())
}
