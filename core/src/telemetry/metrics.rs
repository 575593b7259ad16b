use serde::Serialize;
use std::sync::Mutex;

/// Counters accumulated across ingestion cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub samples_accepted: u64,
    pub samples_dropped: u64,
    pub samples_outside_fence: u64,
    pub events_emitted: u64,
    pub events_suppressed: u64,
    pub sink_errors: u64,
}

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_cycle(&self, succeeded: bool) {
        self.update(|m| {
            m.cycles += 1;
            if !succeeded {
                m.failed_cycles += 1;
            }
        });
    }

    pub fn record_samples(&self, accepted: usize, dropped: usize, outside_fence: usize) {
        self.update(|m| {
            m.samples_accepted += accepted as u64;
            m.samples_dropped += dropped as u64;
            m.samples_outside_fence += outside_fence as u64;
        });
    }

    pub fn record_events(&self, emitted: usize, suppressed: usize) {
        self.update(|m| {
            m.events_emitted += emitted as u64;
            m.events_suppressed += suppressed as u64;
        });
    }

    pub fn record_sink_error(&self) {
        self.update(|m| m.sink_errors += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
