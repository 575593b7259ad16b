use crate::ingest::CycleReport;
use crate::model::{Event, StateVector};
use std::fmt;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Failure while talking to the upstream feed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport failure: {0}")]
    Http(String),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("undecodable payload: {0}")]
    Decode(String),
}

/// Common error type for the monitor core.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("rate-limit slot unavailable after {waited:?}")]
    RateLimitUnavailable { waited: Duration },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink failure: {0}")]
    Sink(String),
}

impl CoreError {
    /// Whether the next cycle may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Fetch(_) | CoreError::RateLimitUnavailable { .. } | CoreError::Io(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Wall-clock UNIX seconds.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Upstream source of state-vector snapshots.
///
/// A snapshot is the union of every query's answer; each query costs one
/// rate-limited upstream call.
pub trait Feed {
    type Query: fmt::Display + Send + Sync;

    fn queries(&self) -> Vec<Self::Query>;

    /// Current time in UNIX seconds as seen by this feed.
    fn clock(&self) -> f64 {
        unix_now()
    }

    fn fetch(
        &self,
        query: &Self::Query,
    ) -> impl Future<Output = Result<Vec<StateVector>, FetchError>> + Send;
}

/// Persistence or notification collaborator that receives emitted events.
pub trait EventSink {
    fn deliver(&mut self, events: &[Event]) -> CoreResult<()>;

    /// Called once per cycle, failed ones included, after delivery.
    fn cycle_finished(&mut self, _report: &CycleReport) {}
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn deliver(&mut self, events: &[Event]) -> CoreResult<()> {
        (**self).deliver(events)
    }

    fn cycle_finished(&mut self, report: &CycleReport) {
        (**self).cycle_finished(report)
    }
}
