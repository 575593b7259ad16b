use crate::config::CoreConfig;
use crate::detect::{AnomalyDetector, MilitaryClassifier, PatternDetector, ProximityDetector};
use crate::geo::GeoFence;
use crate::ingest::dedup::DedupWindow;
use crate::ingest::rate_limit::{secs, RateLimiter};
use crate::model::{Event, StateVector};
use crate::prelude::{CoreError, CoreResult, EventSink, Feed, FetchError};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::track::{Track, TrackStore, UpdateOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub poll_interval_s: f64,
    /// Hard limit on a single upstream call.
    pub fetch_timeout_s: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval_s: 60.0,
            fetch_timeout_s: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CycleState {
    #[default]
    Idle,
    Polling,
    Processing,
    Failed,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub started_at: f64,
    pub state: CycleState,
    pub received: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub dropped: usize,
    pub outside_fence: usize,
    pub pruned: usize,
    pub tracks: usize,
    pub events_emitted: usize,
    pub events_suppressed: usize,
    pub sink_failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub events: Vec<Event>,
}

impl CycleReport {
    pub fn failed(&self) -> bool {
        self.state == CycleState::Failed
    }

    pub fn summary(&self) -> String {
        match &self.error {
            Some(error) => format!("cycle at {:.0} failed: {}", self.started_at, error),
            None => format!(
                "cycle at {:.0}: {} received, {} accepted, {} dropped, {} outside fence, {} tracks, {} events ({} suppressed)",
                self.started_at,
                self.received,
                self.accepted,
                self.dropped,
                self.outside_fence,
                self.tracks,
                self.events_emitted,
                self.events_suppressed
            ),
        }
    }
}

/// Drives poll → process → emit cycles against a feed and a sink.
///
/// Owns all mutable detection state; cycles are serialized through `&mut self`.
pub struct IngestionLoop<F: Feed, S: EventSink> {
    feed: F,
    sink: S,
    fence: GeoFence,
    store: TrackStore,
    dedup: DedupWindow,
    limiter: RateLimiter,
    pattern: PatternDetector,
    proximity: ProximityDetector,
    anomaly: AnomalyDetector,
    military: MilitaryClassifier,
    config: IngestConfig,
    state: CycleState,
    last_report: Option<CycleReport>,
    metrics: Arc<MetricsRecorder>,
    log: LogManager,
}

impl<F: Feed, S: EventSink> IngestionLoop<F, S> {
    pub fn new(feed: F, sink: S, fence: GeoFence, config: &CoreConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            feed,
            sink,
            fence,
            store: TrackStore::new(config.track.clone()),
            dedup: DedupWindow::new(config.dedup.clone()),
            limiter: RateLimiter::new(config.rate_limit.clone()),
            pattern: PatternDetector::new(config.pattern.clone()),
            proximity: ProximityDetector::new(config.proximity.clone()),
            anomaly: AnomalyDetector::new(config.anomaly.clone()),
            military: MilitaryClassifier::new(&config.military)?,
            config: config.ingest.clone(),
            state: CycleState::Idle,
            last_report: None,
            metrics: Arc::new(MetricsRecorder::new()),
            log: LogManager::with_target("flightcore::ingest"),
        })
    }

    /// Shares an externally owned recorder, e.g. one already handed to a status view.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        Arc::clone(&self.metrics)
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    /// Cycles every `poll_interval` until `shutdown` resolves; late ticks are delayed, not bunched.
    pub async fn run_until<G: Future<Output = ()>>(&mut self, shutdown: G) {
        let period = secs(self.config.poll_interval_s).max(Duration::from_millis(10));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    self.log.record("shutdown requested, ingestion stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        let now = self.feed.clock();
        self.state = CycleState::Polling;
        let report = match self.poll().await {
            Ok(vectors) => {
                self.state = CycleState::Processing;
                let mut report = self.process_snapshot(vectors, now);
                if !report.events.is_empty() {
                    if let Err(err) = self.sink.deliver(&report.events) {
                        self.metrics.record_sink_error();
                        self.log.warn(&format!(
                            "sink rejected {} events: {}",
                            report.events.len(),
                            err
                        ));
                        report.sink_failed = true;
                    }
                }
                self.state = CycleState::Idle;
                self.metrics.record_cycle(true);
                report
            }
            Err(err) => {
                self.state = CycleState::Failed;
                self.metrics.record_cycle(false);
                let kind = if err.is_retryable() { "retryable" } else { "fatal" };
                self.log.warn(&format!("{} failure, cycle discarded: {}", kind, err));
                CycleReport {
                    started_at: now,
                    state: CycleState::Failed,
                    error: Some(err.to_string()),
                    ..CycleReport::default()
                }
            }
        };
        self.log.record(&report.summary());
        self.sink.cycle_finished(&report);
        self.last_report = Some(report.clone());
        report
    }

    /// One rate-limited, time-boxed fetch per query; any failure fails the whole poll.
    async fn poll(&self) -> CoreResult<Vec<StateVector>> {
        let timeout = secs(self.config.fetch_timeout_s);
        let mut merged = Vec::new();
        for query in self.feed.queries() {
            let limiter = self.limiter.clone();
            let waited = tokio::task::spawn_blocking(move || limiter.acquire())
                .await
                .map_err(|err| CoreError::Io(io::Error::new(io::ErrorKind::Other, err.to_string())))??;
            if !waited.is_zero() {
                self.log.detail(&format!("{}: rate limit held us for {:?}", query, waited));
            }
            let batch = tokio::time::timeout(timeout, self.feed.fetch(&query))
                .await
                .map_err(|_| FetchError::Timeout(timeout))??;
            self.log.detail(&format!("{}: {} aircraft", query, batch.len()));
            merged.extend(batch);
        }
        Ok(merged)
    }

    /// Applies one merged snapshot at cycle time `now` and returns what was emitted.
    ///
    /// Anomaly and military rules see only freshly appended samples, so
    /// replaying a snapshot leaves them silent; pattern and proximity run over
    /// the whole store and rely on the dedup window.
    pub fn process_snapshot(&mut self, vectors: Vec<StateVector>, now: f64) -> CycleReport {
        let mut report = CycleReport {
            started_at: now,
            received: vectors.len(),
            ..CycleReport::default()
        };

        let mut newest: BTreeMap<String, StateVector> = BTreeMap::new();
        for sample in vectors {
            if let Err(defect) = sample.validate() {
                self.log.detail(&format!("dropping sample {:?}: {}", sample.hex, defect));
                report.dropped += 1;
                continue;
            }
            // The military hint survives whichever copy of a hex wins.
            match newest.get_mut(&sample.hex) {
                Some(kept) if kept.timestamp >= sample.timestamp => {
                    kept.military_hint |= sample.military_hint;
                }
                Some(kept) => {
                    let hint = kept.military_hint;
                    *kept = sample;
                    kept.military_hint |= hint;
                }
                None => {
                    newest.insert(sample.hex.clone(), sample);
                }
            }
        }

        let mut candidates: Vec<Event> = Vec::new();
        for sample in newest.into_values() {
            if !self.fence.admits(&sample.position()) {
                report.outside_fence += 1;
                continue;
            }
            let reason = self.military.classify(&sample);
            match self.store.update(sample.clone()) {
                UpdateOutcome::Appended { previous } => {
                    report.accepted += 1;
                    candidates.extend(self.anomaly.detect(&sample, previous.as_ref()));
                    if let Some(reason) = reason {
                        if self.store.mark_military(&sample.hex, true) {
                            candidates.push(self.military.event(&sample, &reason));
                        }
                    }
                }
                UpdateOutcome::Duplicate | UpdateOutcome::OutOfOrder => report.duplicates += 1,
            }
        }

        let pruned = self.store.prune(now);
        if !pruned.is_empty() {
            self.log.detail(&format!("pruned stale tracks: {}", pruned.join(", ")));
        }
        report.pruned = pruned.len();

        let tracks: Vec<&Track> = self.store.snapshot().into_values().collect();
        report.tracks = tracks.len();
        candidates.extend(
            tracks
                .iter()
                .filter(|track| track.latest().map_or(false, |s| !s.is_on_ground()))
                .filter_map(|track| self.pattern.detect(track)),
        );
        candidates.extend(self.proximity.detect(&tracks, now));
        for event in &mut candidates {
            decorate(event, &self.store, &self.fence, now);
        }

        self.dedup.expire(now);
        let mut events = Vec::with_capacity(candidates.len());
        for event in candidates {
            if self.dedup.admit(&event, now) {
                self.log.record_event(&event);
                events.push(event);
            } else {
                report.events_suppressed += 1;
            }
        }
        report.events_emitted = events.len();
        self.metrics
            .record_samples(report.accepted, report.dropped, report.outside_fence);
        self.metrics
            .record_events(report.events_emitted, report.events_suppressed);
        report.events = events;
        report
    }
}

fn decorate(event: &mut Event, store: &TrackStore, fence: &GeoFence, now: f64) {
    event.detected_at = now;
    event.military |= event.hexes.iter().any(|hex| store.is_military(hex));
    event.areas = fence.areas_containing(&event.geometry.centroid);
    event.callsigns = event
        .hexes
        .iter()
        .filter_map(|hex| store.get(hex)?.latest()?.callsign.clone())
        .collect();
}
