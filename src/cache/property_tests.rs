//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the tier invariants over arbitrary operation
//! sequences.

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use crate::cache::{CacheCoordinator, CacheEntry, StrongTier};

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates cache keys in the repository's namespace shape.
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9:_-]{1,24}"
}

/// Generates cache values.
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}"
}

/// One step of a randomized workload against a tier.
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

fn entry(value: &str) -> CacheEntry<String> {
    CacheEntry::new(value.to_string(), TEST_TTL)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of operations, the strong tier never holds more
    // entries than its capacity.
    #[test]
    fn prop_capacity_invariant(ops in prop::collection::vec(cache_op_strategy(), 1..120)) {
        let capacity = 10;
        let mut tier = StrongTier::new(capacity).unwrap();

        for op in ops {
            match op {
                CacheOp::Put { key, value } => tier.put(key, entry(&value)),
                CacheOp::Get { key } => {
                    let _ = tier.get(&key);
                }
                CacheOp::Remove { key } => {
                    let _ = tier.remove(&key);
                }
            }
            prop_assert!(
                tier.len() <= capacity,
                "strong tier holds {} entries with capacity {}",
                tier.len(),
                capacity
            );
        }
    }

    // The strong tier agrees with a straightforward reference model of LRU:
    // same membership, same eviction victim, after any workload.
    #[test]
    fn prop_matches_lru_reference_model(ops in prop::collection::vec(cache_op_strategy(), 1..120)) {
        let capacity = 5;
        let mut tier = StrongTier::new(capacity).unwrap();

        // reference model: map of live keys + recency queue (front = LRU)
        let mut model: Vec<(String, String)> = Vec::new();
        let mut recency: VecDeque<String> = VecDeque::new();

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    let existed = model.iter().any(|(k, _)| k == &key);
                    if !existed && model.len() >= capacity {
                        if let Some(victim) = recency.pop_front() {
                            model.retain(|(k, _)| k != &victim);
                        }
                    }
                    model.retain(|(k, _)| k != &key);
                    model.push((key.clone(), value.clone()));
                    recency.retain(|k| k != &key);
                    recency.push_back(key.clone());

                    tier.put(key, entry(&value));
                }
                CacheOp::Get { key } => {
                    let modeled = model.iter().find(|(k, _)| k == &key).map(|(_, v)| v.clone());
                    if modeled.is_some() {
                        recency.retain(|k| k != &key);
                        recency.push_back(key.clone());
                    }

                    let actual = tier.get(&key).map(|e| (*e.value).clone());
                    prop_assert_eq!(actual, modeled, "lookup disagreed with model");
                }
                CacheOp::Remove { key } => {
                    model.retain(|(k, _)| k != &key);
                    recency.retain(|k| k != &key);
                    let _ = tier.remove(&key);
                }
            }

            prop_assert_eq!(tier.len(), model.len(), "size disagreed with model");
            // contains() does not disturb recency, so membership can be
            // checked without perturbing the next eviction decision
            for (key, _) in &model {
                prop_assert!(tier.contains(key), "model key '{}' missing from tier", key);
            }
        }
    }

    // Storing then reading any key returns exactly the stored value.
    #[test]
    fn prop_roundtrip(key in key_strategy(), value in value_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = CacheCoordinator::in_memory(16).unwrap();

            cache.put(key.clone(), value.clone(), TEST_TTL);
            let retrieved = cache.get(&key).await;

            prop_assert_eq!(retrieved.as_deref(), Some(&value), "round-trip mismatch");
            Ok(())
        })?;
    }

    // Hit/miss/eviction counters reconcile with what actually happened.
    #[test]
    fn prop_stats_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = CacheCoordinator::in_memory(8).unwrap();
            let mut expected_hits: u64 = 0;
            let mut expected_misses: u64 = 0;

            for op in ops {
                match op {
                    CacheOp::Put { key, value } => {
                        // handles dropped immediately: evicted entries are
                        // reclaimable, so weak-tier hits cannot occur here
                        cache.put(key, value, TEST_TTL);
                    }
                    CacheOp::Get { key } => match cache.get(&key).await {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    },
                    CacheOp::Remove { key } => cache.remove(&key).await,
                }
            }

            let stats = cache.stats();
            prop_assert_eq!(stats.hits(), expected_hits, "hit count mismatch");
            prop_assert_eq!(stats.misses, expected_misses, "miss count mismatch");
            Ok(())
        })?;
    }

    // Removing a key always leaves a subsequent lookup a miss, whatever
    // state the tiers were in.
    #[test]
    fn prop_remove_is_final(
        keys in prop::collection::vec(key_strategy(), 1..20),
        target_index in 0usize..20,
    ) {
        let unique: Vec<String> = keys
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        prop_assume!(!unique.is_empty());
        let target = unique[target_index % unique.len()].clone();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = CacheCoordinator::in_memory(4).unwrap();

            // hold every handle so evicted keys stay weak-tier resolvable
            let handles: Vec<_> = unique
                .iter()
                .map(|key| cache.put(key.clone(), format!("value_{}", key), TEST_TTL))
                .collect();

            cache.remove(&target).await;
            let after = cache.get(&target).await;

            prop_assert!(after.is_none(), "'{}' survived removal", target);
            drop(handles);
            Ok(())
        })?;
    }
}
