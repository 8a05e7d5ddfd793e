// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use ustr::{ustr, Ustr};

/// A single telemetry record tagged with the key that decides which
/// downstream call it may share.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    pub partition_key: Ustr,
    pub payload: T,
}

impl<T> Entry<T> {
    pub fn new(partition_key: &str, payload: T) -> Self {
        Entry {
            partition_key: ustr(partition_key),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_share_interned_key() {
        let a = Entry::new("aws.lambda", 1);
        let b = Entry::new("aws.lambda", 2);
        assert_eq!(a.partition_key, b.partition_key);
        assert_eq!(a.partition_key.as_str(), "aws.lambda");
    }
}
