//! Bounded per-channel sample history

use crate::runtime::Sample;
use std::collections::VecDeque;

/// Fixed-capacity FIFO of samples for one channel, oldest first
#[derive(Debug, Clone)]
pub struct ChannelHistory {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl ChannelHistory {
    /// `capacity` must be non-zero; the store validates it up front
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the evicted oldest sample if the history was full
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values, oldest to newest
    pub fn values(&self) -> Vec<i64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Samples, oldest to newest
    pub fn samples(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: i64) -> Sample {
        Sample::new(1, value as u64, 0, value)
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut history = ChannelHistory::new(3);
        for v in 0..3 {
            assert_eq!(history.push(sample(v)), None);
        }
        assert_eq!(history.push(sample(3)), Some(sample(0)));
        assert_eq!(history.push(sample(4)), Some(sample(1)));

        assert_eq!(history.len(), 3);
        assert_eq!(history.values(), vec![2, 3, 4]);
        assert_eq!(history.latest(), Some(&sample(4)));
    }

    #[test]
    fn test_capacity_of_one() {
        let mut history = ChannelHistory::new(1);
        history.push(sample(7));
        history.push(sample(8));
        assert_eq!(history.values(), vec![8]);
    }
}
