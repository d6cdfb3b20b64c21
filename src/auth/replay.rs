//! Bounded history of consumed request timestamps.

use std::collections::{HashSet, VecDeque};

/// Insertion-ordered set of timestamps with FIFO eviction.
///
/// Not synchronized; the [`Authenticator`](super::Authenticator) keeps it
/// behind a mutex so the membership check and the insert happen as one step.
#[derive(Debug)]
pub struct ReplayHistory {
    order: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
}

impl ReplayHistory {
    /// Create an empty history holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, timestamp: &str) -> bool {
        self.seen.contains(timestamp)
    }

    /// Append `timestamp`, evicting the oldest entry when full.
    ///
    /// Recording a timestamp that is already present is a no-op.
    pub fn record(&mut self, timestamp: &str) {
        if self.seen.contains(timestamp) {
            return;
        }

        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }

        self.order.push_back(timestamp.to_string());
        self.seen.insert(timestamp.to_string());
    }

    /// Record `timestamp` unless already present.
    ///
    /// Returns `true` if it was new.
    pub fn check_and_record(&mut self, timestamp: &str) -> bool {
        if self.contains(timestamp) {
            return false;
        }
        self.record(timestamp);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_timestamp_accepted() {
        let mut history = ReplayHistory::new(20);
        assert!(history.check_and_record("100"));
        assert!(history.check_and_record("101"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut history = ReplayHistory::new(20);
        assert!(history.check_and_record("100"));
        assert!(!history.check_and_record("100"));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut history = ReplayHistory::new(3);
        for ts in ["1", "2", "3", "4"] {
            history.record(ts);
        }

        assert_eq!(history.len(), 3);
        assert!(!history.contains("1"));
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["2", "3", "4"]);

        // The evicted entry can be recorded again
        assert!(history.check_and_record("1"));
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["3", "4", "1"]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut history = ReplayHistory::new(20);
        for ts in 0..100 {
            history.record(&ts.to_string());
            assert!(history.len() <= 20);
        }
        assert_eq!(history.len(), 20);
        assert!(history.contains("99"));
        assert!(history.contains("80"));
        assert!(!history.contains("79"));
    }

    #[test]
    fn test_zero_capacity_raised() {
        let mut history = ReplayHistory::new(0);
        assert_eq!(history.capacity(), 1);
        history.record("a");
        history.record("b");
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["b"]);
    }
}
