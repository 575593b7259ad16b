use crate::model::StateVector;
use std::collections::VecDeque;

/// Result of offering a sample to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Appended,
    /// Same timestamp as the newest sample.
    Duplicate,
    /// Older than the newest sample.
    OutOfOrder,
}

/// Time- and capacity-bounded ring of samples for one aircraft.
///
/// Timestamps are strictly increasing; samples older than `retention_s`
/// relative to the newest one are evicted first, then the oldest beyond
/// `max_capacity`.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<StateVector>,
    retention_s: f64,
    max_capacity: usize,
}

impl SampleWindow {
    pub fn with_capacity(max_capacity: usize, retention_s: f64) -> Self {
        let max_capacity = max_capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(max_capacity.min(64)),
            retention_s,
            max_capacity,
        }
    }

    pub fn push(&mut self, sample: StateVector) -> PushOutcome {
        if let Some(newest) = self.samples.back() {
            if sample.timestamp == newest.timestamp {
                return PushOutcome::Duplicate;
            }
            if sample.timestamp < newest.timestamp {
                return PushOutcome::OutOfOrder;
            }
        }
        self.samples.push_back(sample);
        self.evict();
        PushOutcome::Appended
    }

    fn evict(&mut self) {
        let Some(newest) = self.samples.back().map(|s| s.timestamp) else {
            return;
        };
        let cutoff = newest - self.retention_s;
        while self.samples.front().map_or(false, |s| s.timestamp < cutoff) {
            self.samples.pop_front();
        }
        while self.samples.len() > self.max_capacity {
            self.samples.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&StateVector> {
        self.samples.back()
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, StateVector> {
        self.samples.iter()
    }

    /// Samples at or after `since`, oldest first.
    pub fn since(&self, since: f64) -> impl Iterator<Item = &StateVector> {
        let start = self.samples.partition_point(|s| s.timestamp < since);
        self.samples.range(start..)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64) -> StateVector {
        StateVector::new("abc123", t, 45.0, 9.0)
    }

    #[test]
    fn rejects_duplicate_and_out_of_order_timestamps() {
        let mut window = SampleWindow::with_capacity(8, 600.0);
        assert_eq!(window.push(sample(10.0)), PushOutcome::Appended);
        assert_eq!(window.push(sample(10.0)), PushOutcome::Duplicate);
        assert_eq!(window.push(sample(5.0)), PushOutcome::OutOfOrder);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn evicts_by_time_then_by_capacity() {
        let mut window = SampleWindow::with_capacity(3, 100.0);
        for t in [0.0, 50.0, 120.0] {
            window.push(sample(t));
        }
        assert_eq!(window.iter().next().unwrap().timestamp, 50.0);

        for t in [130.0, 140.0, 150.0] {
            window.push(sample(t));
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().next().unwrap().timestamp, 130.0);
    }

    #[test]
    fn since_skips_older_samples() {
        let mut window = SampleWindow::with_capacity(8, 600.0);
        for t in [0.0, 10.0, 20.0, 30.0] {
            window.push(sample(t));
        }
        let recent: Vec<f64> = window.since(15.0).map(|s| s.timestamp).collect();
        assert_eq!(recent, vec![20.0, 30.0]);
    }
}
