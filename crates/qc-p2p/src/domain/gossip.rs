//! Gossip relay dedup (spec.md §4.9): a hash-based filter that caps
//! fan-out by ensuring each message is only ever relayed once per node,
//! without keeping an unbounded set of every hash ever seen.

use shared_types::Hash;

/// A fixed-size bit array bloom filter over message hashes. Since the
/// input is already a cryptographic content hash, the filter derives its
/// `k` bit positions by combining two halves of the hash (Kirsch-
/// Mitzenmacher double hashing) rather than re-hashing with `k`
/// independent functions.
#[derive(Debug, Clone)]
struct BloomFilter {
    bits: Vec<bool>,
    k: usize,
}

impl BloomFilter {
    fn new(num_bits: usize, k: usize) -> Self {
        Self { bits: vec![false; num_bits.max(1)], k: k.max(1) }
    }

    fn indices(&self, hash: &Hash) -> Vec<usize> {
        let h1 = u64::from_le_bytes(hash[0..8].try_into().expect("slice is 8 bytes"));
        let h2 = u64::from_le_bytes(hash[8..16].try_into().expect("slice is 8 bytes"));
        let m = self.bits.len() as u64;
        (0..self.k)
            .map(|i| (h1.wrapping_add((i as u64).wrapping_mul(h2)) % m) as usize)
            .collect()
    }

    fn insert(&mut self, hash: &Hash) {
        for idx in self.indices(hash) {
            self.bits[idx] = true;
        }
    }

    fn contains(&self, hash: &Hash) -> bool {
        self.indices(hash).iter().all(|&idx| self.bits[idx])
    }

    fn clear(&mut self) {
        self.bits.iter_mut().for_each(|b| *b = false);
    }
}

/// Tracks which gossip message hashes this node has already relayed.
/// Resets once `reset_after` messages have been seen, trading a small
/// chance of re-relaying a very old message for a bounded false-positive
/// rate instead of unbounded memory growth.
pub struct GossipDedup {
    filter: BloomFilter,
    seen_count: usize,
    reset_after: usize,
}

impl GossipDedup {
    #[must_use]
    pub fn new(num_bits: usize, k: usize, reset_after: usize) -> Self {
        Self { filter: BloomFilter::new(num_bits, k), seen_count: 0, reset_after: reset_after.max(1) }
    }

    /// Whether this hash should be relayed: `true` the first time it is
    /// seen, `false` on every subsequent call (modulo bloom false
    /// positives, which only ever suppress a relay, never force one).
    pub fn should_relay(&mut self, hash: &Hash) -> bool {
        if self.filter.contains(hash) {
            return false;
        }
        if self.seen_count >= self.reset_after {
            self.filter.clear();
            self.seen_count = 0;
        }
        self.filter.insert(hash);
        self.seen_count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_relays_repeat_does_not() {
        let mut dedup = GossipDedup::new(4096, 4, 10_000);
        let hash = [1u8; 32];
        assert!(dedup.should_relay(&hash));
        assert!(!dedup.should_relay(&hash));
    }

    #[test]
    fn distinct_hashes_both_relay() {
        let mut dedup = GossipDedup::new(4096, 4, 10_000);
        assert!(dedup.should_relay(&[1u8; 32]));
        assert!(dedup.should_relay(&[2u8; 32]));
    }

    #[test]
    fn resets_after_capacity_to_bound_false_positive_growth() {
        let mut dedup = GossipDedup::new(256, 2, 2);
        assert!(dedup.should_relay(&[1u8; 32]));
        assert!(dedup.should_relay(&[2u8; 32]));
        // Capacity reached; filter clears before this insert, so even an
        // already-seen-looking hash from a fresh filter relays again.
        assert!(dedup.should_relay(&[3u8; 32]));
    }
}
