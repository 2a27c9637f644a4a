//! Missing-chunk computation for resume.

use std::collections::BTreeSet;

/// Computes the ascending list of chunk indices the service has not
/// acknowledged, given its reported inventory.
///
/// Indices at or beyond `total_chunks` in the report are ignored; the local
/// plan is the authority on range.
pub fn missing_chunks(total_chunks: u32, received: &[u32]) -> Vec<u32> {
    let have: BTreeSet<u32> = received.iter().copied().collect();
    (0..total_chunks).filter(|i| !have.contains(i)).collect()
}
