use flightcore::StateVector;
use serde::Deserialize;
use serde_json::Value;

/// Body of an adsb.fi v2 response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdsbResponse {
    /// Server time in milliseconds.
    #[serde(default)]
    pub now: Option<f64>,
    #[serde(default)]
    pub ac: Option<Vec<AdsbAircraft>>,
    #[serde(default)]
    pub aircraft: Option<Vec<AdsbAircraft>>,
}

impl AdsbResponse {
    pub fn into_state_vectors(self, fallback_now_s: f64, force_military: bool) -> Vec<StateVector> {
        let now_s = self.now.map_or(fallback_now_s, |ms| ms / 1000.0);
        self.ac
            .or(self.aircraft)
            .unwrap_or_default()
            .iter()
            .filter_map(|ac| ac.to_state_vector(now_s, force_military))
            .collect()
    }
}

/// One aircraft record; every field is optional upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdsbAircraft {
    #[serde(default)]
    pub hex: Option<String>,
    #[serde(default)]
    pub flight: Option<String>,
    /// Registration.
    #[serde(default)]
    pub r: Option<String>,
    /// ICAO type designator.
    #[serde(default)]
    pub t: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Feet, or the string `"ground"`.
    #[serde(default)]
    pub alt_baro: Option<Value>,
    #[serde(default)]
    pub gs: Option<f64>,
    #[serde(default)]
    pub track: Option<f64>,
    #[serde(default)]
    pub baro_rate: Option<f64>,
    #[serde(default)]
    pub geom_rate: Option<f64>,
    #[serde(default)]
    pub squawk: Option<String>,
    #[serde(default)]
    pub seen_pos: Option<f64>,
    #[serde(default)]
    pub seen: Option<f64>,
    #[serde(default, rename = "dbFlags")]
    pub db_flags: Option<Value>,
}

impl AdsbAircraft {
    /// `None` when the record carries no position.
    pub fn to_state_vector(&self, now_s: f64, force_military: bool) -> Option<StateVector> {
        let (lat, lon) = (self.lat?, self.lon?);
        let age = self.seen_pos.or(self.seen).unwrap_or(0.0);
        let mut sample = StateVector::new(self.hex.clone().unwrap_or_default(), now_s - age, lat, lon);
        if let Some(flight) = &self.flight {
            sample = sample.with_callsign(flight);
        }
        sample.registration = non_empty(&self.r);
        sample.type_code = non_empty(&self.t);
        sample.description = non_empty(&self.desc);
        match &self.alt_baro {
            Some(Value::String(text)) if text.eq_ignore_ascii_case("ground") => {
                sample.on_ground = Some(true);
                sample.altitude_ft = Some(0.0);
            }
            Some(value) => sample.altitude_ft = value.as_f64(),
            None => {}
        }
        sample.ground_speed_kt = self.gs;
        sample.track_deg = self.track;
        sample.vertical_rate_fpm = self.baro_rate.or(self.geom_rate);
        if let Some(squawk) = non_empty(&self.squawk) {
            sample = sample.with_squawk(&squawk);
        }
        sample.military_hint = force_military || self.flagged_military();
        Some(sample)
    }

    /// Bit 0 of `dbFlags` marks military airframes.
    fn flagged_military(&self) -> bool {
        match &self.db_flags {
            Some(Value::Number(n)) => n.as_u64().map_or(false, |flags| flags & 1 == 1),
            Some(Value::String(text)) => text.to_ascii_lowercase().contains("military"),
            _ => false,
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "now": 1700000000000,
        "ac": [
            {"hex": "4CA7F1", "flight": "RYR12AB ", "r": "EI-DCL", "t": "B738",
             "lat": 45.5, "lon": 9.2, "alt_baro": 36000, "gs": 450.2, "track": 91.5,
             "baro_rate": -64, "squawk": "2000", "seen_pos": 1.5, "seen": 0.2},
            {"hex": "ae1234", "lat": 44.0, "lon": 11.0, "alt_baro": "ground", "dbFlags": 1},
            {"hex": "3c6590", "flight": "DLH9"}
        ]
    }"#;

    #[test]
    fn decodes_records_with_positions() {
        let response: AdsbResponse = serde_json::from_str(BODY).unwrap();
        let vectors = response.into_state_vectors(0.0, false);
        assert_eq!(vectors.len(), 2);

        let airliner = &vectors[0];
        assert_eq!(airliner.hex, "4ca7f1");
        assert_eq!(airliner.callsign.as_deref(), Some("RYR12AB"));
        assert_eq!(airliner.timestamp, 1_700_000_000.0 - 1.5);
        assert_eq!(airliner.altitude_ft, Some(36_000.0));
        assert_eq!(airliner.vertical_rate_fpm, Some(-64.0));
        assert!(!airliner.military_hint);

        let grounded = &vectors[1];
        assert!(grounded.is_on_ground());
        assert!(grounded.military_hint);
        assert_eq!(grounded.timestamp, 1_700_000_000.0);
    }

    #[test]
    fn aircraft_key_and_forced_flag() {
        let body = r#"{"aircraft": [{"hex": "43c001", "lat": 51.0, "lon": -1.0}]}"#;
        let response: AdsbResponse = serde_json::from_str(body).unwrap();
        let vectors = response.into_state_vectors(123.0, true);
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].timestamp, 123.0);
        assert!(vectors[0].military_hint);
    }
}
