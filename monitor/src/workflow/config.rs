use crate::bridge::BridgeConfig;
use crate::feed::FeedConfig;
use crate::generator::ScenarioConfig;
use anyhow::Context;
use flightcore::CoreConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level YAML document for the monitor binary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub feed: FeedConfig,
    /// Replaces the live feed with the synthetic scenario.
    pub synthetic: Option<ScenarioConfig>,
    /// GeoJSON or `polygons` document; absent means no geofence.
    pub areas_file: Option<PathBuf>,
    /// JSON-lines event log.
    pub events_out: Option<PathBuf>,
    pub bridge: BridgeConfig,
    pub detection: CoreConfig,
}

impl MonitorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading monitor config {}", path_ref.display()))?;
        let config: MonitorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing monitor config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.detection
            .validate()
            .context("validating detection settings")?;
        if self.synthetic.is_none() && self.feed.tiles.is_empty() && !self.feed.military {
            anyhow::bail!("feed has no tiles and the military endpoint is disabled");
        }
        for tile in &self.feed.tiles {
            if !(-90.0..=90.0).contains(&tile.lat) || !(-180.0..=180.0).contains(&tile.lon) {
                anyhow::bail!("tile centre {},{} is out of range", tile.lat, tile.lon);
            }
            if tile.radius_nm == 0 {
                anyhow::bail!("tile at {},{} has zero radius", tile.lat, tile.lon);
            }
        }
        if let Some(scenario) = &self.synthetic {
            if !(scenario.step_s > 0.0) {
                anyhow::bail!("synthetic step must be positive, got {}", scenario.step_s);
            }
        }
        Ok(())
    }
}
