use crate::detect::{AnomalyConfig, MilitaryClassifier, MilitaryConfig, PatternConfig, ProximityConfig};
use crate::ingest::{DedupConfig, IngestConfig, RateLimitConfig};
use crate::prelude::{CoreError, CoreResult};
use crate::track::TrackConfig;
use serde::{Deserialize, Serialize};

/// Every tunable of the core, with defaults for each section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub ingest: IngestConfig,
    pub rate_limit: RateLimitConfig,
    pub track: TrackConfig,
    pub pattern: PatternConfig,
    pub proximity: ProximityConfig,
    pub anomaly: AnomalyConfig,
    pub military: MilitaryConfig,
    pub dedup: DedupConfig,
}

impl CoreConfig {
    pub fn validate(&self) -> CoreResult<()> {
        positive("ingest.poll_interval_s", self.ingest.poll_interval_s)?;
        positive("ingest.fetch_timeout_s", self.ingest.fetch_timeout_s)?;
        positive("rate_limit.min_interval_s", self.rate_limit.min_interval_s)?;
        positive("rate_limit.lock_timeout_s", self.rate_limit.lock_timeout_s)?;
        positive("rate_limit.max_wait_s", self.rate_limit.max_wait_s)?;
        positive("track.retention_s", self.track.retention_s)?;
        positive("track.staleness_s", self.track.staleness_s)?;
        if self.track.max_samples == 0 {
            return Err(invalid("track.max_samples must be at least 1"));
        }

        let circle = &self.pattern.circle;
        positive("pattern.circle.residual_tolerance", circle.residual_tolerance)?;
        ordered("pattern.circle radius", circle.min_radius_km, circle.max_radius_km)?;
        positive(
            "pattern.segmentation.leg_heading_tolerance_deg",
            self.pattern.segmentation.leg_heading_tolerance_deg,
        )?;
        positive("pattern.mesh.axis_tolerance_deg", self.pattern.mesh.axis_tolerance_deg)?;
        positive(
            "pattern.lawnmower.axis_tolerance_deg",
            self.pattern.lawnmower.axis_tolerance_deg,
        )?;
        positive("pattern.lawnmower.max_spacing_cv", self.pattern.lawnmower.max_spacing_cv)?;

        positive("proximity.cluster_distance_km", self.proximity.cluster_distance_km)?;
        positive("proximity.follow_distance_km", self.proximity.follow_distance_km)?;
        positive("proximity.max_position_age_s", self.proximity.max_position_age_s)?;

        let anomaly = &self.anomaly;
        ordered(
            "anomaly ground speed",
            anomaly.min_ground_speed_kt,
            anomaly.max_ground_speed_kt,
        )?;
        ordered("anomaly altitude", anomaly.min_altitude_ft, anomaly.max_altitude_ft)?;
        positive("anomaly.max_vertical_speed_fpm", anomaly.max_vertical_speed_fpm)?;

        let dedup = &self.dedup;
        for (name, value) in [
            ("dedup.pattern_cooldown_s", dedup.pattern_cooldown_s),
            ("dedup.proximity_cooldown_s", dedup.proximity_cooldown_s),
            ("dedup.anomaly_cooldown_s", dedup.anomaly_cooldown_s),
            ("dedup.military_cooldown_s", dedup.military_cooldown_s),
        ] {
            if !(value >= 0.0) {
                return Err(invalid(&format!("{} must not be negative", name)));
            }
        }

        MilitaryClassifier::new(&self.military).map(|_| ())
    }
}

fn invalid(message: &str) -> CoreError {
    CoreError::Configuration(message.to_string())
}

fn positive(name: &str, value: f64) -> CoreResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(&format!("{} must be positive, got {}", name, value)))
    }
}

fn ordered(name: &str, min: f64, max: f64) -> CoreResult<()> {
    if min.is_finite() && max.is_finite() && min < max {
        Ok(())
    } else {
        Err(invalid(&format!("{} bounds are inverted: {} >= {}", name, min, max)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::HexRange;

    #[test]
    fn defaults_are_valid() {
        CoreConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: CoreConfig =
            serde_json::from_str(r#"{"ingest": {"poll_interval_s": 30}, "dedup": {"anomaly_cooldown_s": 60}}"#)
                .unwrap();
        assert_eq!(config.ingest.poll_interval_s, 30.0);
        assert_eq!(config.ingest.fetch_timeout_s, 20.0);
        assert_eq!(config.dedup.anomaly_cooldown_s, 60.0);
        assert_eq!(config.dedup.pattern_cooldown_s, 900.0);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = CoreConfig::default();
        config.ingest.poll_interval_s = 0.0;
        assert!(matches!(config.validate(), Err(CoreError::Configuration(_))));

        let mut config = CoreConfig::default();
        config.anomaly.min_altitude_ft = 70_000.0;
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.military.hex_ranges.push(HexRange::new("nothex", "AE0000"));
        assert!(config.validate().is_err());
    }
}
