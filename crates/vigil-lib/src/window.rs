//! Bounded in-memory collections
//!
//! Two eviction policies back every history in the pipeline:
//! - [`BoundedLog`]: keeps the N most recent entries
//! - [`TimeWindow`]: keeps entries younger than a maximum age, optionally capped
//!
//! Both evict strictly oldest-first and enforce their bound on every insert.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Capacity-bounded FIFO log
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest while at capacity
    pub fn push(&mut self, entry: T) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// The `n` most recent entries, oldest first
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    pub fn back(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries from the front while the predicate holds
    pub fn drain_front_while(&mut self, mut predicate: impl FnMut(&T) -> bool) {
        while self.entries.front().is_some_and(&mut predicate) {
            self.entries.pop_front();
        }
    }
}

impl<T: Clone> BoundedLog<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T: Serialize> Serialize for BoundedLog<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

/// Timestamped entry inside a [`TimeWindow`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stamped<T> {
    pub timestamp_ms: i64,
    pub value: T,
}

/// Max-age bounded sequence of timestamped entries
///
/// Entries must be pushed in non-decreasing timestamp order.
#[derive(Debug, Clone)]
pub struct TimeWindow<T> {
    entries: VecDeque<Stamped<T>>,
    max_age_ms: i64,
    capacity: Option<usize>,
}

impl<T> TimeWindow<T> {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            max_age_ms: max_age.as_millis() as i64,
            capacity: None,
        }
    }

    /// Additionally bound the window by entry count
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }

    /// Append an entry stamped `timestamp_ms` and evict anything that fell out
    pub fn push(&mut self, timestamp_ms: i64, value: T) {
        self.evict_expired(timestamp_ms);
        if let Some(cap) = self.capacity {
            while self.entries.len() >= cap {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(Stamped {
            timestamp_ms,
            value,
        });
    }

    /// Remove entries strictly older than `now_ms - max_age`
    pub fn evict_expired(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.max_age_ms;
        while self
            .entries
            .front()
            .is_some_and(|e| e.timestamp_ms < cutoff)
        {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms as u64)
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Stamped<T>> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Entries stamped at or after `since_ms`
    pub fn since(&self, since_ms: i64) -> impl Iterator<Item = &Stamped<T>> {
        self.entries.iter().filter(move |e| e.timestamp_ms >= since_ms)
    }

    /// The `n` most recent entries, oldest first
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &Stamped<T>> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    pub fn back(&self) -> Option<&Stamped<T>> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> TimeWindow<T> {
    pub fn to_vec(&self) -> Vec<Stamped<T>> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_log_evicts_oldest_first() {
        let mut log = BoundedLog::new(100);
        for i in 0..150 {
            log.push(i);
            assert!(log.len() <= 100);
        }

        assert_eq!(log.len(), 100);
        assert_eq!(log.iter().next(), Some(&50));
        assert_eq!(log.back(), Some(&149));
    }

    #[test]
    fn test_bounded_log_last_n() {
        let mut log = BoundedLog::new(10);
        for i in 0..5 {
            log.push(i);
        }
        let last: Vec<_> = log.last_n(3).copied().collect();
        assert_eq!(last, vec![2, 3, 4]);

        let all: Vec<_> = log.last_n(50).copied().collect();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_bounded_log_zero_capacity_holds_one() {
        let mut log = BoundedLog::new(0);
        log.push("a");
        log.push("b");
        assert_eq!(log.to_vec(), vec!["b"]);
    }

    #[test]
    fn test_time_window_evicts_by_age_on_insert() {
        let mut window = TimeWindow::new(Duration::from_secs(60));
        window.push(0, "first");
        window.push(30_000, "second");
        window.push(60_000, "third");
        // cutoff is 0, entry at 0 is not strictly older
        assert_eq!(window.len(), 3);

        window.push(60_001, "fourth");
        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().next().map(|e| e.value), Some("second"));
    }

    #[test]
    fn test_time_window_explicit_eviction() {
        let mut window = TimeWindow::new(Duration::from_secs(10));
        window.push(1_000, 1);
        window.push(2_000, 2);

        window.evict_expired(11_500);
        assert_eq!(window.len(), 1);

        window.evict_expired(100_000);
        assert!(window.is_empty());
    }

    #[test]
    fn test_time_window_capacity_bound() {
        let mut window = TimeWindow::new(Duration::from_secs(3600)).with_capacity(3);
        for i in 0..5 {
            window.push(i * 1_000, i);
        }
        let values: Vec<_> = window.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![2, 3, 4]);
    }

    #[test]
    fn test_time_window_since() {
        let mut window = TimeWindow::new(Duration::from_secs(3600));
        for i in 0..5 {
            window.push(i * 1_000, i);
        }
        assert_eq!(window.since(3_000).count(), 2);
    }
}
