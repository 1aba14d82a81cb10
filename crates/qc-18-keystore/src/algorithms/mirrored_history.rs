//! # Mirrored History Indexing
//!
//! Nonce arithmetic over a replica's mirrored config hashes.
//!
//! The mirrored list is append-only and nonce-contiguous: its last entry
//! sits at the replica's current nonce, each earlier entry one nonce lower.
//! Every lookup by nonce goes through [`mirrored_index`] so the offset
//! computation lives in exactly one place.

/// Position of `nonce` inside a mirrored list of `len` entries whose tip is
/// at `current_nonce`.
///
/// Returns `None` when the list is empty, when `nonce` is above the tip, or
/// when `nonce` is older than the oldest mirrored entry.
///
/// # Time Complexity: O(1)
pub fn mirrored_index(len: usize, current_nonce: u64, nonce: u64) -> Option<usize> {
    if len == 0 || nonce > current_nonce {
        return None;
    }
    let offset_from_tip = current_nonce - nonce;
    if offset_from_tip >= len as u64 {
        return None;
    }
    Some(len - 1 - offset_from_tip as usize)
}

/// Nonce of the oldest entry in a mirrored list of `len` entries whose tip is
/// at `current_nonce`.
pub fn oldest_mirrored_nonce(len: usize, current_nonce: u64) -> Option<u64> {
    if len == 0 {
        return None;
    }
    current_nonce.checked_sub(len as u64 - 1)
}
