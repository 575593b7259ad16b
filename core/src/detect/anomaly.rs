use crate::math::geodesy::angle_diff_deg;
use crate::model::{AnomalyKind, EmergencyCode, Event, EventKind, Geometry, StateVector};
use serde::{Deserialize, Serialize};

/// Flight-envelope and rate thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub min_ground_speed_kt: f64,
    pub max_ground_speed_kt: f64,
    pub min_altitude_ft: f64,
    pub max_altitude_ft: f64,
    pub max_vertical_speed_fpm: f64,
    pub max_ground_speed_delta_kt: f64,
    pub max_track_delta_deg: f64,
    /// Consecutive samples further apart than this are not compared.
    pub sudden_change_window_s: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_ground_speed_kt: 35.0,
            max_ground_speed_kt: 650.0,
            min_altitude_ft: 500.0,
            max_altitude_ft: 60_000.0,
            max_vertical_speed_fpm: 8_000.0,
            max_ground_speed_delta_kt: 250.0,
            max_track_delta_deg: 120.0,
            sudden_change_window_s: 120.0,
        }
    }
}

/// Per-sample rule evaluation; every rule is independent.
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    pub fn detect(&self, current: &StateVector, previous: Option<&StateVector>) -> Vec<Event> {
        [
            self.emergency(current),
            self.envelope(current),
            self.vertical_speed(current, previous),
            self.sudden_change(current, previous),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn emergency(&self, current: &StateVector) -> Option<Event> {
        let code = EmergencyCode::from_squawk(current.squawk.as_deref()?)?;
        Some(
            single(current, AnomalyKind::Emergency(code))
                .with_evidence("squawk", code.squawk())
                .with_evidence("meaning", code.description()),
        )
    }

    fn envelope(&self, current: &StateVector) -> Option<Event> {
        let cfg = &self.config;
        let airborne = !current.is_on_ground();
        let mut violations: Vec<&str> = Vec::new();
        if let Some(gs) = current.ground_speed_kt {
            if gs > cfg.max_ground_speed_kt {
                violations.push("ground_speed_high");
            } else if airborne && gs < cfg.min_ground_speed_kt {
                violations.push("ground_speed_low");
            }
        }
        if let Some(alt) = current.altitude_ft {
            if alt > cfg.max_altitude_ft {
                violations.push("altitude_high");
            } else if airborne && alt > 0.0 && alt < cfg.min_altitude_ft {
                violations.push("altitude_low");
            }
        }
        if violations.is_empty() {
            return None;
        }
        let mut event = single(current, AnomalyKind::Envelope).with_evidence("violations", violations);
        if let Some(gs) = current.ground_speed_kt {
            event = event.with_evidence("ground_speed_kt", gs);
        }
        if let Some(alt) = current.altitude_ft {
            event = event.with_evidence("altitude_ft", alt);
        }
        Some(event)
    }

    fn vertical_speed(&self, current: &StateVector, previous: Option<&StateVector>) -> Option<Event> {
        let (rate, source) = match current.vertical_rate_fpm {
            Some(rate) => (rate, "reported"),
            None => {
                let previous = previous?;
                let dt = current.timestamp - previous.timestamp;
                if dt <= 0.0 {
                    return None;
                }
                let climb = current.altitude_ft? - previous.altitude_ft?;
                (climb / dt * 60.0, "derived")
            }
        };
        if rate.abs() <= self.config.max_vertical_speed_fpm {
            return None;
        }
        Some(
            single(current, AnomalyKind::VerticalSpeed)
                .with_evidence("vertical_rate_fpm", rate)
                .with_evidence("source", source),
        )
    }

    fn sudden_change(&self, current: &StateVector, previous: Option<&StateVector>) -> Option<Event> {
        let cfg = &self.config;
        let previous = previous?;
        let dt = current.timestamp - previous.timestamp;
        if dt <= 0.0 || dt > cfg.sudden_change_window_s {
            return None;
        }
        let speed_delta = current
            .ground_speed_kt
            .zip(previous.ground_speed_kt)
            .map(|(now, before)| now - before)
            .filter(|delta| delta.abs() > cfg.max_ground_speed_delta_kt);
        let track_delta = current
            .track_deg
            .zip(previous.track_deg)
            .map(|(now, before)| angle_diff_deg(now, before))
            .filter(|delta| *delta > cfg.max_track_delta_deg);
        if speed_delta.is_none() && track_delta.is_none() {
            return None;
        }
        let mut event = single(current, AnomalyKind::SuddenChange).with_evidence("dt_s", dt);
        if let Some(delta) = speed_delta {
            event = event.with_evidence("ground_speed_delta_kt", delta);
        }
        if let Some(delta) = track_delta {
            event = event.with_evidence("track_delta_deg", delta);
        }
        Some(event)
    }
}

fn single(sample: &StateVector, kind: AnomalyKind) -> Event {
    Event::new(
        EventKind::Anomaly(kind),
        vec![sample.hex.clone()],
        sample.timestamp,
        Geometry::point(sample.position()),
    )
}
