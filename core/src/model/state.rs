use crate::math::GeoPoint;
use serde::{Deserialize, Serialize};

/// Reasons a received sample is dropped before reaching a track.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SampleDefect {
    #[error("missing aircraft address")]
    EmptyHex,
    #[error("latitude {0} out of range")]
    Latitude(f64),
    #[error("longitude {0} out of range")]
    Longitude(f64),
    #[error("timestamp {0} is not a finite instant")]
    Timestamp(f64),
}

/// One timestamped aircraft report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub hex: String,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub registration: Option<String>,
    #[serde(default)]
    pub type_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// UNIX seconds.
    pub timestamp: f64,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub altitude_ft: Option<f64>,
    #[serde(default)]
    pub ground_speed_kt: Option<f64>,
    #[serde(default)]
    pub track_deg: Option<f64>,
    #[serde(default)]
    pub vertical_rate_fpm: Option<f64>,
    #[serde(default)]
    pub squawk: Option<String>,
    #[serde(default)]
    pub on_ground: Option<bool>,
    /// Upstream database or endpoint already marks the airframe as military.
    #[serde(default)]
    pub military_hint: bool,
}

impl StateVector {
    pub fn new(hex: impl Into<String>, timestamp: f64, lat: f64, lon: f64) -> Self {
        Self {
            hex: hex.into().trim().to_ascii_lowercase(),
            callsign: None,
            registration: None,
            type_code: None,
            description: None,
            timestamp,
            lat,
            lon,
            altitude_ft: None,
            ground_speed_kt: None,
            track_deg: None,
            vertical_rate_fpm: None,
            squawk: None,
            on_ground: None,
            military_hint: false,
        }
    }

    pub fn with_callsign(mut self, callsign: &str) -> Self {
        let trimmed = callsign.trim();
        self.callsign = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn with_altitude(mut self, altitude_ft: f64) -> Self {
        self.altitude_ft = Some(altitude_ft);
        self
    }

    pub fn with_ground_speed(mut self, ground_speed_kt: f64) -> Self {
        self.ground_speed_kt = Some(ground_speed_kt);
        self
    }

    pub fn with_track(mut self, track_deg: f64) -> Self {
        self.track_deg = Some(track_deg);
        self
    }

    pub fn with_vertical_rate(mut self, vertical_rate_fpm: f64) -> Self {
        self.vertical_rate_fpm = Some(vertical_rate_fpm);
        self
    }

    pub fn with_squawk(mut self, squawk: &str) -> Self {
        self.squawk = Some(squawk.trim().to_string());
        self
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    pub fn validate(&self) -> Result<(), SampleDefect> {
        if self.hex.is_empty() {
            return Err(SampleDefect::EmptyHex);
        }
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(SampleDefect::Latitude(self.lat));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(SampleDefect::Longitude(self.lon));
        }
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(SampleDefect::Timestamp(self.timestamp));
        }
        Ok(())
    }

    /// Explicit ground flag, or low and slow enough to be taxiing.
    pub fn is_on_ground(&self) -> bool {
        if self.on_ground == Some(true) {
            return true;
        }
        match self.altitude_ft {
            Some(alt) if alt <= 0.0 => true,
            Some(alt) if alt <= 100.0 => self.ground_speed_kt.map_or(true, |gs| gs < 60.0),
            _ => false,
        }
    }
}
