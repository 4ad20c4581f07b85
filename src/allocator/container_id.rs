//! Pure range-scanning logic for container-id allocation, kept separate
//! from the I/O that gathers the "already used" set so it can be tested
//! without a hypervisor or store.

use std::collections::HashSet;

/// First id in `range` (inclusive start, exclusive end) not present in
/// `used`. Scanning is deterministic (ascending) so allocation order is
/// reproducible in tests.
pub fn next_free_container_id(range: (u32, u32), used: &HashSet<i64>) -> Option<i64> {
    (range.0..range.1).map(|id| id as i64).find(|id| !used.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_free_id_in_range() {
        let used: HashSet<i64> = [200, 201].into_iter().collect();
        assert_eq!(next_free_container_id((200, 210), &used), Some(202));
    }

    #[test]
    fn exhausted_range_yields_none() {
        let used: HashSet<i64> = (200..210).collect();
        assert_eq!(next_free_container_id((200, 210), &used), None);
    }
}
