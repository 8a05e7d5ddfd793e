// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Groups a closed batch by partition key and caps each group to the
//! downstream request size.
//!
//! Arrival order is preserved inside a partition. There is no ordering
//! between partitions: callers must not rely on map iteration order.

use crate::entry::Entry;
use hashbrown::HashMap;
use ustr::Ustr;

/// A per-partition slice of a batch, never longer than `max_per_request`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubBatch<T> {
    pub partition_key: Ustr,
    pub entries: Vec<T>,
}

/// Partition key to its sub-batches, in emission order.
pub type PartitionedBatch<T> = HashMap<Ustr, Vec<SubBatch<T>>>;

/// Splits `batch` into per-partition sub-batches of at most `max_per_request`
/// payloads. A `max_per_request` of zero is treated as one.
pub fn partition<T>(batch: Vec<Entry<T>>, max_per_request: usize) -> PartitionedBatch<T> {
    let max_per_request = max_per_request.max(1);
    let mut partitions: PartitionedBatch<T> = HashMap::new();

    for Entry {
        partition_key,
        payload,
    } in batch
    {
        let sub_batches = partitions.entry(partition_key).or_default();
        match sub_batches.last_mut() {
            Some(last) if last.entries.len() < max_per_request => last.entries.push(payload),
            _ => {
                let mut entries = Vec::with_capacity(max_per_request.min(64));
                entries.push(payload);
                sub_batches.push(SubBatch {
                    partition_key,
                    entries,
                });
            }
        }
    }

    partitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ustr::ustr;

    fn entries(keys: &[&str]) -> Vec<Entry<usize>> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| Entry::new(key, i))
            .collect()
    }

    #[test]
    fn test_empty_batch_has_no_partitions() {
        let partitions = partition::<usize>(Vec::new(), 20);
        assert!(partitions.is_empty());
    }

    #[test]
    fn test_partitions_are_never_merged() {
        let partitions = partition(entries(&["a", "b", "a", "b", "a"]), 20);
        assert_eq!(partitions.len(), 2);

        let a = &partitions[&ustr("a")];
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].entries, vec![0, 2, 4]);
        assert_eq!(a[0].partition_key, ustr("a"));

        let b = &partitions[&ustr("b")];
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].entries, vec![1, 3]);
    }

    #[test]
    fn test_splits_into_contiguous_sub_batches() {
        let partitions = partition(entries(&["p1", "p1", "p1"]), 2);
        let p1 = &partitions[&ustr("p1")];
        assert_eq!(p1.len(), 2);
        assert_eq!(p1[0].entries, vec![0, 1]);
        assert_eq!(p1[1].entries, vec![2]);
    }

    #[test]
    fn test_zero_max_per_request_is_one() {
        let partitions = partition(entries(&["p1", "p1"]), 0);
        assert_eq!(partitions[&ustr("p1")].len(), 2);
    }

    proptest! {
        #[test]
        fn prop_sub_batches_respect_size_order_and_count(
            keys in proptest::collection::vec(0u8..5, 0..200),
            max_per_request in 1usize..30,
        ) {
            let batch: Vec<Entry<usize>> = keys
                .iter()
                .enumerate()
                .map(|(i, k)| Entry::new(&format!("ns{k}"), i))
                .collect();
            let total = batch.len();

            let partitions = partition(batch, max_per_request);

            let mut seen = 0;
            for (key, sub_batches) in &partitions {
                let mut flattened = Vec::new();
                for (i, sub_batch) in sub_batches.iter().enumerate() {
                    prop_assert_eq!(sub_batch.partition_key, *key);
                    prop_assert!(!sub_batch.entries.is_empty());
                    prop_assert!(sub_batch.entries.len() <= max_per_request);
                    // only the last sub-batch may be partial
                    if i + 1 < sub_batches.len() {
                        prop_assert_eq!(sub_batch.entries.len(), max_per_request);
                    }
                    flattened.extend(sub_batch.entries.iter().copied());
                }

                let expected: Vec<usize> = keys
                    .iter()
                    .enumerate()
                    .filter(|(_, k)| format!("ns{k}") == key.as_str())
                    .map(|(i, _)| i)
                    .collect();
                prop_assert_eq!(&flattened, &expected);
                seen += flattened.len();
            }
            prop_assert_eq!(seen, total);
        }
    }
}
