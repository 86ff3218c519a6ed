//! Memory id generation: `YYYYMMDDHHMMSSmmmNNN`, 20 characters, lexicographically
//! sortable by creation time, with a 3-digit intra-millisecond tiebreaker.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};

use crate::constants::MEMORY_ID_LEN;

/// Generates strictly-increasing memory ids from wall-clock time plus an
/// in-process tiebreaker counter, so bursts within the same millisecond
/// still sort correctly.
#[derive(Debug, Default)]
pub struct MemoryIdGenerator {
    last_millis: std::sync::atomic::AtomicI64,
    tiebreak: AtomicU32,
}

impl MemoryIdGenerator {
    pub fn new() -> Self {
        Self {
            last_millis: std::sync::atomic::AtomicI64::new(0),
            tiebreak: AtomicU32::new(0),
        }
    }

    /// Generates the next id using the current time.
    pub fn next_id(&self) -> String {
        self.next_id_at(Utc::now())
    }

    /// Generates the next id as of `now`, useful for deterministic tests.
    pub fn next_id_at(&self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        let prev = self.last_millis.swap(millis, Ordering::AcqRel);

        let tiebreak = if prev == millis {
            self.tiebreak.fetch_add(1, Ordering::AcqRel) + 1
        } else {
            self.tiebreak.store(0, Ordering::Release);
            0
        };

        format_id(now, tiebreak % 1000)
    }
}

fn format_id(now: DateTime<Utc>, tiebreak: u32) -> String {
    format!(
        "{}{:03}{:03}",
        now.format("%Y%m%d%H%M%S"),
        now.timestamp_subsec_millis(),
        tiebreak
    )
}

/// Returns `true` if `id` conforms to the 20-character memory id format.
pub fn is_well_formed(id: &str) -> bool {
    id.len() == MEMORY_ID_LEN && id.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_id_length_and_digits() {
        let generator = MemoryIdGenerator::new();
        let id = generator.next_id();
        assert!(is_well_formed(&id), "id {id} is not well formed");
    }

    #[test]
    fn test_ids_sort_by_time() {
        let generator = MemoryIdGenerator::new();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap();

        let id1 = generator.next_id_at(t1);
        let id2 = generator.next_id_at(t2);

        assert!(id1 < id2);
    }

    #[test]
    fn test_same_millisecond_tiebreak_increments() {
        let generator = MemoryIdGenerator::new();
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let id1 = generator.next_id_at(t);
        let id2 = generator.next_id_at(t);
        let id3 = generator.next_id_at(t);

        assert!(id1 < id2);
        assert!(id2 < id3);
        assert!(id3.ends_with("001") || id3.ends_with("002"));
    }

    #[test]
    fn test_ids_never_reused_across_bursts() {
        let generator = MemoryIdGenerator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let id = generator.next_id();
            assert!(seen.insert(id), "duplicate id generated");
        }
    }
}
