//! ID generation utilities.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Custom epoch for packed IDs: 2015-01-01T00:00:00Z in milliseconds.
const EPOCH_MS: i64 = 1_420_070_400_000;

/// Number of low bits reserved for the sequence component.
const SEQUENCE_BITS: i64 = 20;

/// Process-wide sequence counter, randomly seeded at startup.
static SEQUENCE: AtomicI64 = AtomicI64::new(-1);

/// ID generator for entities.
///
/// Produces 64-bit flake-style identifiers: the millisecond timestamp since a
/// fixed epoch in the high bits, a wrapping sequence counter in the low bits.
/// IDs are therefore roughly time-sortable and unique within a process
/// without coordination.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new flake-style ID.
    #[must_use]
    pub fn next(&self) -> i64 {
        // Seed the sequence lazily so parallel processes start at different
        // offsets.
        let _ = SEQUENCE.compare_exchange(
            -1,
            i64::from(rand::random::<u16>()),
            Ordering::Relaxed,
            Ordering::Relaxed,
        );

        let millis = Utc::now().timestamp_millis() - EPOCH_MS;
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed) & ((1 << SEQUENCE_BITS) - 1);

        (millis << SEQUENCE_BITS) | sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_positive() {
        let id_gen = IdGenerator::new();

        for _ in 0..64 {
            assert!(id_gen.next() > 0);
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let id_gen = IdGenerator::new();
        let mut seen = std::collections::HashSet::new();

        for _ in 0..1024 {
            assert!(seen.insert(id_gen.next()));
        }
    }

    #[test]
    fn test_ids_are_time_ordered_across_millis() {
        let id_gen = IdGenerator::new();
        let first = id_gen.next();

        std::thread::sleep(std::time::Duration::from_millis(2));

        let second = id_gen.next();
        assert!(second > first);
    }
}
