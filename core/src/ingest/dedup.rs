use crate::model::{Event, EventFamily, EventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-family cooldowns, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub pattern_cooldown_s: f64,
    pub proximity_cooldown_s: f64,
    pub anomaly_cooldown_s: f64,
    pub military_cooldown_s: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            pattern_cooldown_s: 900.0,
            proximity_cooldown_s: 600.0,
            anomaly_cooldown_s: 300.0,
            military_cooldown_s: 1800.0,
        }
    }
}

impl DedupConfig {
    pub fn cooldown(&self, family: EventFamily) -> f64 {
        match family {
            EventFamily::Pattern => self.pattern_cooldown_s,
            EventFamily::Proximity => self.proximity_cooldown_s,
            EventFamily::Anomaly => self.anomaly_cooldown_s,
            EventFamily::Military => self.military_cooldown_s,
        }
    }
}

/// Suppresses repeats of the same `(subject, subtype)` within its cooldown.
#[derive(Debug, Default)]
pub struct DedupWindow {
    config: DedupConfig,
    last_emitted: HashMap<(String, EventKind), f64>,
}

impl DedupWindow {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            last_emitted: HashMap::new(),
        }
    }

    /// Whether `event` should be emitted at `now`; records the emission if so.
    pub fn admit(&mut self, event: &Event, now: f64) -> bool {
        if event.kind.bypasses_cooldown() {
            return true;
        }
        let cooldown = self.config.cooldown(event.family());
        let key = (event.subject(), event.kind);
        match self.last_emitted.get(&key) {
            Some(&last) if now - last < cooldown => false,
            _ => {
                self.last_emitted.insert(key, now);
                true
            }
        }
    }

    /// Drops entries whose cooldown has elapsed.
    pub fn expire(&mut self, now: f64) {
        let config = &self.config;
        self.last_emitted
            .retain(|(_, kind), last| now - *last < config.cooldown(kind.family()));
    }

    pub fn len(&self) -> usize {
        self.last_emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_emitted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::GeoPoint;
    use crate::model::{AnomalyKind, EmergencyCode, Geometry, ProximityKind};

    fn event(kind: EventKind, hexes: &[&str]) -> Event {
        Event::new(
            kind,
            hexes.iter().map(|h| h.to_string()).collect(),
            0.0,
            Geometry::point(GeoPoint::new(45.0, 9.0)),
        )
    }

    #[test]
    fn repeats_are_suppressed_until_cooldown_elapses() {
        let mut window = DedupWindow::new(DedupConfig::default());
        let envelope = event(EventKind::Anomaly(AnomalyKind::Envelope), &["abc123"]);
        assert!(window.admit(&envelope, 1_000.0));
        assert!(!window.admit(&envelope, 1_299.0));
        assert!(window.admit(&envelope, 1_300.0));
    }

    #[test]
    fn subtype_and_subject_are_part_of_the_key() {
        let mut window = DedupWindow::new(DedupConfig::default());
        let cluster = event(EventKind::Proximity(ProximityKind::Cluster), &["a", "b"]);
        let pursuit = event(EventKind::Proximity(ProximityKind::Pursuit), &["a", "b"]);
        let bigger = event(EventKind::Proximity(ProximityKind::Cluster), &["a", "b", "c"]);
        assert!(window.admit(&cluster, 0.0));
        assert!(window.admit(&pursuit, 0.0));
        assert!(window.admit(&bigger, 0.0));
        assert!(!window.admit(&cluster, 10.0));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn emergencies_bypass_cooldown() {
        let mut window = DedupWindow::new(DedupConfig::default());
        let squawk = event(
            EventKind::Anomaly(AnomalyKind::Emergency(EmergencyCode::General)),
            &["abc123"],
        );
        assert!(window.admit(&squawk, 0.0));
        assert!(window.admit(&squawk, 1.0));
        assert!(window.is_empty());
    }

    #[test]
    fn expire_keeps_only_live_entries() {
        let mut window = DedupWindow::new(DedupConfig::default());
        window.admit(&event(EventKind::Anomaly(AnomalyKind::Envelope), &["a"]), 0.0);
        window.admit(&event(EventKind::Military, &["a"]), 0.0);
        window.expire(400.0);
        assert_eq!(window.len(), 1);
        window.expire(1_800.0);
        assert!(window.is_empty());
    }
}
