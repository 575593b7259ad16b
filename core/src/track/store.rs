use crate::model::StateVector;
use crate::track::window::{PushOutcome, SampleWindow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Retention policy for per-aircraft windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub retention_s: f64,
    pub max_samples: usize,
    /// Aircraft silent for longer than this are dropped from the store.
    pub staleness_s: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            retention_s: 3600.0,
            max_samples: 720,
            staleness_s: 900.0,
        }
    }
}

/// Bounded recent history of one aircraft.
#[derive(Debug, Clone)]
pub struct Track {
    hex: String,
    window: SampleWindow,
    military: bool,
}

impl Track {
    pub fn new(hex: impl Into<String>, config: &TrackConfig) -> Self {
        Self {
            hex: hex.into(),
            window: SampleWindow::with_capacity(config.max_samples, config.retention_s),
            military: false,
        }
    }

    /// Builds a track by pushing samples in order; rejected samples are skipped.
    pub fn from_samples<I>(hex: impl Into<String>, samples: I, config: &TrackConfig) -> Self
    where
        I: IntoIterator<Item = StateVector>,
    {
        let mut track = Self::new(hex, config);
        for sample in samples {
            track.window.push(sample);
        }
        track
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn samples(&self) -> std::collections::vec_deque::Iter<'_, StateVector> {
        self.window.iter()
    }

    pub fn since(&self, since: f64) -> impl Iterator<Item = &StateVector> {
        self.window.since(since)
    }

    pub fn latest(&self) -> Option<&StateVector> {
        self.window.latest()
    }

    pub fn last_update(&self) -> Option<f64> {
        self.latest().map(|s| s.timestamp)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn is_military(&self) -> bool {
        self.military
    }
}

/// Outcome of [`TrackStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Appended { previous: Option<StateVector> },
    Duplicate,
    OutOfOrder,
}

/// Owner of all mutable trajectory state, keyed by hex address.
#[derive(Debug, Clone, Default)]
pub struct TrackStore {
    config: TrackConfig,
    tracks: HashMap<String, Track>,
}

impl TrackStore {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            config,
            tracks: HashMap::new(),
        }
    }

    pub fn update(&mut self, sample: StateVector) -> UpdateOutcome {
        let config = &self.config;
        let track = self
            .tracks
            .entry(sample.hex.clone())
            .or_insert_with(|| Track::new(sample.hex.clone(), config));
        let previous = track.latest().cloned();
        match track.window.push(sample) {
            PushOutcome::Appended => UpdateOutcome::Appended { previous },
            PushOutcome::Duplicate => UpdateOutcome::Duplicate,
            PushOutcome::OutOfOrder => UpdateOutcome::OutOfOrder,
        }
    }

    pub fn get(&self, hex: &str) -> Option<&Track> {
        self.tracks.get(hex)
    }

    /// All tracks keyed by hex, in address order.
    pub fn snapshot(&self) -> BTreeMap<&str, &Track> {
        self.tracks
            .iter()
            .map(|(hex, track)| (hex.as_str(), track))
            .collect()
    }

    /// Drops aircraft without a sample since `now - staleness_s`.
    pub fn prune(&mut self, now: f64) -> Vec<String> {
        let cutoff = now - self.config.staleness_s;
        let mut dropped: Vec<String> = self
            .tracks
            .iter()
            .filter(|(_, track)| track.last_update().map_or(true, |t| t < cutoff))
            .map(|(hex, _)| hex.clone())
            .collect();
        dropped.sort();
        for hex in &dropped {
            self.tracks.remove(hex);
        }
        dropped
    }

    /// Records the military flag; true only on an absent→present transition.
    pub fn mark_military(&mut self, hex: &str, military: bool) -> bool {
        match self.tracks.get_mut(hex) {
            Some(track) => {
                let transitioned = military && !track.military;
                track.military = military || track.military;
                transitioned
            }
            None => false,
        }
    }

    pub fn is_military(&self, hex: &str) -> bool {
        self.tracks.get(hex).map_or(false, Track::is_military)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(hex: &str, t: f64) -> StateVector {
        StateVector::new(hex, t, 45.0, 9.0)
    }

    #[test]
    fn update_reports_previous_sample() {
        let mut store = TrackStore::new(TrackConfig::default());
        assert_eq!(
            store.update(sample("aaa111", 0.0)),
            UpdateOutcome::Appended { previous: None }
        );
        match store.update(sample("aaa111", 10.0)) {
            UpdateOutcome::Appended { previous } => assert_eq!(previous.unwrap().timestamp, 0.0),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(store.update(sample("aaa111", 10.0)), UpdateOutcome::Duplicate);
        assert_eq!(store.get("aaa111").unwrap().len(), 2);
    }

    #[test]
    fn hard_cap_bounds_bursts() {
        let config = TrackConfig {
            max_samples: 5,
            ..TrackConfig::default()
        };
        let mut store = TrackStore::new(config);
        for i in 0..50 {
            store.update(sample("aaa111", i as f64 * 0.1));
        }
        assert_eq!(store.get("aaa111").unwrap().len(), 5);
    }

    #[test]
    fn prune_drops_silent_aircraft() {
        let config = TrackConfig {
            staleness_s: 100.0,
            ..TrackConfig::default()
        };
        let mut store = TrackStore::new(config);
        store.update(sample("old000", 0.0));
        store.update(sample("new000", 950.0));
        assert_eq!(store.prune(1000.0), vec!["old000".to_string()]);
        assert!(store.get("old000").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn military_flag_transitions_once() {
        let mut store = TrackStore::new(TrackConfig::default());
        store.update(sample("ae0001", 0.0));
        assert!(store.mark_military("ae0001", true));
        assert!(!store.mark_military("ae0001", true));
        assert!(store.is_military("ae0001"));
        assert!(!store.mark_military("unknown", true));
    }
}
