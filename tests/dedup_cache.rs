//! Behavioral tests for the deduplicating cache.

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing_dedup::application::cache::{estimate_key_bytes, TIMESTAMP_BYTES};
use tracing_dedup::infrastructure::mocks::MockClock;
use tracing_dedup::{DedupCache, DedupConfig, EvictionReason, MemoryUsage};

fn cache_with(config: DedupConfig) -> (DedupCache, MockClock) {
    let clock = MockClock::new(1_614_834_367_089);
    let cache = DedupCache::with_clock(config, Arc::new(clock.clone())).unwrap();
    (cache, clock)
}

/// Memory estimate recomputed from scratch for the given candidate keys.
fn recomputed_memory(cache: &DedupCache, keys: &BTreeSet<String>) -> MemoryUsage {
    let mut usage = MemoryUsage::default();
    for key in keys {
        if let Some(history) = cache.history(key) {
            usage.cache_bytes += estimate_key_bytes(key) + history.len() as u64 * TIMESTAMP_BYTES;
        }
        if cache.first_seen(key).is_some() {
            usage.index_bytes += estimate_key_bytes(key) + TIMESTAMP_BYTES;
        }
    }
    usage
}

#[test]
fn test_least_recently_used_key_is_evicted() {
    let (cache, _clock) = cache_with(DedupConfig::default().with_capacity(3));

    for key in ["A", "B", "A", "A", "C", "D"] {
        cache.record_and_evict(key);
    }

    assert!(!cache.contains("B"));
    assert_eq!(cache.occurrences("A"), Some(3));
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_recency_protects_frequently_seen_key() {
    let (cache, _clock) = cache_with(DedupConfig::default().with_capacity(3));

    let mut summaries = Vec::new();
    for key in ["A", "B", "B", "A", "A", "A", "A", "C", "A", "D"] {
        summaries.extend(cache.record_and_evict(key));
    }

    // "A" was touched after "B" and "C", so "B" is the one pushed out
    assert!(!cache.contains("B"));
    assert_eq!(cache.occurrences("A"), Some(6));
    assert_eq!(cache.occurrences("C"), Some(1));
    assert_eq!(cache.occurrences("D"), Some(1));

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].reason, EvictionReason::CapacityEvicted);
    assert_eq!(summaries[0].key, "B");
    assert_eq!(summaries[0].occurrences(), 2);
}

#[test]
fn test_rounds_over_capacity_keep_histories_short() {
    let (cache, _clock) = cache_with(DedupConfig::default().with_threshold(3));

    let mut summaries = Vec::new();
    for _round in 0..3 {
        for i in 0..=500 {
            summaries.extend(cache.record_and_evict(&i.to_string()));
        }
    }

    assert_eq!(cache.len(), 500);
    assert!(!cache.contains("0"));
    for i in 1..=500 {
        assert_eq!(cache.occurrences(&i.to_string()), Some(1), "key {}", i);
    }
    // Nothing was ever suppressed
    assert!(summaries.is_empty());
}

#[test]
fn test_expiry_counts_from_first_occurrence() {
    let (cache, clock) = cache_with(
        DedupConfig::default()
            .with_threshold(1)
            .with_time_to_live(Duration::from_millis(1_000)),
    );

    let start = 1_614_834_367_089;
    assert!(cache.record_and_evict("X").is_empty());

    clock.advance(Duration::from_millis(1_500));
    let summaries = cache.record_and_evict("X");

    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.reason, EvictionReason::TimeExpired);
    assert_eq!(summary.key, "X");
    assert_eq!(summary.history.timestamps(), &[start, start + 1_500]);
    assert_eq!(summary.suppressed(), 1);
    assert_eq!(
        summary.format_message(),
        "Time Expiration : Evict Msg 'X'. This Message Appears 2 Time(s) In Total and Was Logged 1 Time(s) Before\n\
         Timestamps at 2021-03-04 05:06:07,089, 2021-03-04 05:06:08,589"
    );

    assert!(!cache.contains("X"));
    assert!(cache.first_seen("X").is_none());
}

#[test]
fn test_recurrence_does_not_extend_time_to_live() {
    let (cache, clock) =
        cache_with(DedupConfig::default().with_time_to_live(Duration::from_millis(1_000)));

    cache.record_and_evict("steady");
    for _ in 0..9 {
        clock.advance(Duration::from_millis(100));
        cache.record_and_evict("steady");
    }
    assert_eq!(cache.occurrences("steady"), Some(10));

    clock.advance(Duration::from_millis(100));
    let summaries = cache.record_and_evict("other");

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].occurrences(), 10);
    assert!(!cache.contains("steady"));
    assert!(cache.contains("other"));
}

#[test]
fn test_memory_sweep_halves_population() {
    // Each three-character key costs 50 bytes in the cache and 50 in the index
    let (cache, _clock) = cache_with(DedupConfig::default().with_memory_limit_bytes(1_000));

    let keys: Vec<String> = (0..10).map(|i| format!("k{:02}", i)).collect();
    for key in &keys[..9] {
        assert!(cache.record_and_evict(key).is_empty());
    }
    assert_eq!(cache.memory_usage().total(), 900);

    cache.record_and_evict(&keys[9]);

    assert_eq!(cache.len(), 5);
    for key in &keys[..5] {
        assert!(!cache.contains(key));
        assert!(cache.first_seen(key).is_none());
    }
    for key in &keys[5..] {
        assert!(cache.contains(key));
        assert!(cache.first_seen(key).is_some());
    }
    assert_eq!(cache.memory_usage().total(), 500);
    assert_eq!(cache.metrics().evictions(EvictionReason::MemoryPressure), 5);
}

#[test]
fn test_memory_sweep_summarizes_suppressed_keys() {
    let (cache, _clock) = cache_with(DedupConfig::default().with_memory_limit_bytes(1_000));

    cache.record_and_evict("k00");
    cache.record_and_evict("k00");
    let mut summaries = Vec::new();
    for i in 1..10 {
        summaries.extend(cache.record_and_evict(&format!("k{:02}", i)));
    }

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].reason, EvictionReason::MemoryPressure);
    assert_eq!(summaries[0].key, "k00");
    assert!(summaries[0]
        .format_message()
        .starts_with("Reach Memory Limit : Evict Msg 'k00'."));
}

#[test]
fn test_flush_all_reports_only_suppressed_keys() {
    let (cache, _clock) = cache_with(DedupConfig::default().with_threshold(2));

    for key in ["a", "a", "a", "b", "b", "c"] {
        cache.record_and_evict(key);
    }

    let summaries = cache.flush_all();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].reason, EvictionReason::Flush);
    assert_eq!(summaries[0].key, "a");
    assert!(summaries[0].format_message().starts_with("Program Exit : "));

    assert!(cache.is_empty());
    assert_eq!(cache.memory_usage(), MemoryUsage::default());
    assert!(cache.flush_all().is_empty());
}

#[test]
fn test_metrics_track_every_policy() {
    let (cache, clock) = cache_with(
        DedupConfig::default()
            .with_capacity(2)
            .with_time_to_live(Duration::from_secs(1)),
    );

    cache.check_and_record("a");
    cache.check_and_record("a");
    cache.check_and_record("b");
    cache.check_and_record("c"); // capacity: "a" out, summarized

    clock.advance(Duration::from_secs(1));
    cache.check_and_record("c"); // time: "b" out, then "c" out, summarized

    cache.check_and_record("d");
    cache.flush_all();

    let snapshot = cache.metrics().snapshot();
    assert_eq!(snapshot.messages_admitted, 4);
    assert_eq!(snapshot.messages_suppressed, 2);
    assert_eq!(snapshot.capacity_evictions, 1);
    assert_eq!(snapshot.time_evictions, 2);
    assert_eq!(snapshot.flushed_entries, 1);
    assert_eq!(snapshot.summaries_produced, 2);
}

#[test]
fn test_one_record_reports_reasons_in_policy_order() {
    let (cache, clock) = cache_with(
        DedupConfig::default()
            .with_capacity(3)
            .with_time_to_live(Duration::from_millis(1_000))
            .with_memory_limit_bytes(500),
    );

    for key in ["a", "a", "x", "x"] {
        cache.record_and_evict(key);
    }
    clock.advance(Duration::from_millis(600));
    for key in ["x", "b", "b"] {
        cache.record_and_evict(key);
    }
    clock.advance(Duration::from_millis(400));

    // Pushes out "a" by capacity, outlives "x", and overflows memory for "b"
    let long_key = "m".repeat(100);
    let summaries = cache.record_and_evict(&long_key);

    let evicted: Vec<(EvictionReason, &str)> = summaries
        .iter()
        .map(|summary| (summary.reason, summary.key.as_str()))
        .collect();
    assert_eq!(
        evicted,
        vec![
            (EvictionReason::CapacityEvicted, "a"),
            (EvictionReason::TimeExpired, "x"),
            (EvictionReason::MemoryPressure, "b"),
        ]
    );
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&long_key));
}

#[derive(Debug, Clone)]
enum Op {
    Record(u8),
    Advance(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..24).prop_map(Op::Record),
        1 => (0u16..400).prop_map(Op::Advance),
    ]
}

proptest! {
    #[test]
    fn prop_structures_stay_consistent(
        capacity in 1usize..8,
        threshold in 1usize..4,
        memory_limit in 200u64..3_000,
        ops in prop::collection::vec(op_strategy(), 1..200),
    ) {
        let (cache, clock) = cache_with(
            DedupConfig::default()
                .with_capacity(capacity)
                .with_threshold(threshold)
                .with_time_to_live(Duration::from_millis(1_000))
                .with_memory_limit_bytes(memory_limit),
        );

        let mut seen = BTreeSet::new();
        for op in ops {
            match op {
                Op::Record(k) => {
                    let key = format!("key-{}", k);
                    for summary in cache.record_and_evict(&key) {
                        prop_assert!(summary.occurrences() > threshold);
                        prop_assert!(!cache.contains(&summary.key) || summary.key == key);
                    }
                    seen.insert(key);
                }
                Op::Advance(ms) => clock.advance(Duration::from_millis(u64::from(ms))),
            }

            prop_assert!(cache.len() <= capacity);
            for key in &seen {
                prop_assert_eq!(cache.contains(key), cache.first_seen(key).is_some());
            }
            prop_assert_eq!(cache.memory_usage(), recomputed_memory(&cache, &seen));
        }
    }

    #[test]
    fn prop_threshold_admits_exactly_threshold(threshold in 1usize..10, repeats in 1usize..30) {
        let (cache, _clock) = cache_with(DedupConfig::default().with_threshold(threshold));

        let admitted = (0..repeats)
            .filter(|_| !cache.check_and_record("same").duplicate)
            .count();

        prop_assert_eq!(admitted, repeats.min(threshold));
    }
}
