use crate::math::{BoundingBox, GeoPoint};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form evidence attached to an event.
pub type Evidence = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFamily {
    Pattern,
    Proximity,
    Anomaly,
    Military,
}

impl EventFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventFamily::Pattern => "PATTERN",
            EventFamily::Proximity => "PROXIMITY",
            EventFamily::Anomaly => "ANOMALY",
            EventFamily::Military => "MIL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Loop,
    Racetrack,
    Lawnmower,
    Mesh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProximityKind {
    Cluster,
    Pursuit,
}

/// Transponder emergency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmergencyCode {
    Hijack,
    RadioFailure,
    General,
}

impl EmergencyCode {
    pub fn from_squawk(squawk: &str) -> Option<Self> {
        match squawk.trim() {
            "7500" => Some(EmergencyCode::Hijack),
            "7600" => Some(EmergencyCode::RadioFailure),
            "7700" => Some(EmergencyCode::General),
            _ => None,
        }
    }

    pub fn squawk(&self) -> &'static str {
        match self {
            EmergencyCode::Hijack => "7500",
            EmergencyCode::RadioFailure => "7600",
            EmergencyCode::General => "7700",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            EmergencyCode::Hijack => "unlawful interference",
            EmergencyCode::RadioFailure => "radio failure",
            EmergencyCode::General => "general emergency",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    Emergency(EmergencyCode),
    Envelope,
    VerticalSpeed,
    SuddenChange,
}

/// Family and subtype of an event as one closed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Pattern(PatternKind),
    Proximity(ProximityKind),
    Anomaly(AnomalyKind),
    Military,
}

impl EventKind {
    pub const ALL: [EventKind; 13] = [
        EventKind::Pattern(PatternKind::Loop),
        EventKind::Pattern(PatternKind::Racetrack),
        EventKind::Pattern(PatternKind::Lawnmower),
        EventKind::Pattern(PatternKind::Mesh),
        EventKind::Proximity(ProximityKind::Cluster),
        EventKind::Proximity(ProximityKind::Pursuit),
        EventKind::Anomaly(AnomalyKind::Emergency(EmergencyCode::Hijack)),
        EventKind::Anomaly(AnomalyKind::Emergency(EmergencyCode::RadioFailure)),
        EventKind::Anomaly(AnomalyKind::Emergency(EmergencyCode::General)),
        EventKind::Anomaly(AnomalyKind::Envelope),
        EventKind::Anomaly(AnomalyKind::VerticalSpeed),
        EventKind::Anomaly(AnomalyKind::SuddenChange),
        EventKind::Military,
    ];

    pub fn family(&self) -> EventFamily {
        match self {
            EventKind::Pattern(_) => EventFamily::Pattern,
            EventKind::Proximity(_) => EventFamily::Proximity,
            EventKind::Anomaly(_) => EventFamily::Anomaly,
            EventKind::Military => EventFamily::Military,
        }
    }

    /// Stable subtype label used at persistence boundaries.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Pattern(PatternKind::Loop) => "LOOP",
            EventKind::Pattern(PatternKind::Racetrack) => "RACETRACK",
            EventKind::Pattern(PatternKind::Lawnmower) => "LAWNMOWER",
            EventKind::Pattern(PatternKind::Mesh) => "MESH",
            EventKind::Proximity(ProximityKind::Cluster) => "CLUSTER",
            EventKind::Proximity(ProximityKind::Pursuit) => "PURSUIT",
            EventKind::Anomaly(AnomalyKind::Emergency(EmergencyCode::Hijack)) => "SQUAWK_7500",
            EventKind::Anomaly(AnomalyKind::Emergency(EmergencyCode::RadioFailure)) => "SQUAWK_7600",
            EventKind::Anomaly(AnomalyKind::Emergency(EmergencyCode::General)) => "SQUAWK_7700",
            EventKind::Anomaly(AnomalyKind::Envelope) => "ENVELOPE",
            EventKind::Anomaly(AnomalyKind::VerticalSpeed) => "VSPEED",
            EventKind::Anomaly(AnomalyKind::SuddenChange) => "SUDDEN_CHANGE",
            EventKind::Military => "MIL",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }

    /// Emergencies are always emitted, whatever the cooldown state.
    pub fn bypasses_cooldown(&self) -> bool {
        matches!(self, EventKind::Anomaly(AnomalyKind::Emergency(_)))
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            EventKind::Anomaly(AnomalyKind::Emergency(_)) => Severity::Critical,
            EventKind::Anomaly(_) | EventKind::Proximity(ProximityKind::Pursuit) => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.family().as_str(), self.label())
    }
}

#[derive(Serialize, Deserialize)]
struct KindRepr {
    family: String,
    subtype: String,
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        KindRepr {
            family: self.family().as_str().to_string(),
            subtype: self.label().to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = KindRepr::deserialize(deserializer)?;
        let kind = EventKind::from_label(&repr.subtype)
            .ok_or_else(|| D::Error::custom(format!("unknown event subtype {}", repr.subtype)))?;
        if kind.family().as_str() != repr.family {
            return Err(D::Error::custom(format!(
                "subtype {} does not belong to family {}",
                repr.subtype, repr.family
            )));
        }
        Ok(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Spatial summary of the condition an event describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub centroid: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_km: Option<f64>,
}

impl Geometry {
    pub fn point(centroid: GeoPoint) -> Self {
        Self {
            centroid,
            bbox: None,
            radius_km: None,
        }
    }
}

/// A detected anomaly, immutable once handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub kind: EventKind,
    pub hexes: Vec<String>,
    #[serde(default)]
    pub callsigns: Vec<String>,
    /// Observation time of the newest sample involved (UNIX seconds).
    pub timestamp: f64,
    /// Cycle time at which the event was produced.
    pub detected_at: f64,
    pub severity: Severity,
    pub geometry: Geometry,
    #[serde(default)]
    pub evidence: Evidence,
    #[serde(default)]
    pub military: bool,
    #[serde(default)]
    pub areas: Vec<String>,
}

impl Event {
    pub fn new(kind: EventKind, hexes: Vec<String>, timestamp: f64, geometry: Geometry) -> Self {
        Self {
            kind,
            hexes,
            callsigns: Vec::new(),
            timestamp,
            detected_at: timestamp,
            severity: kind.default_severity(),
            geometry,
            evidence: Evidence::new(),
            military: false,
            areas: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.evidence.insert(key.to_string(), value.into());
        self
    }

    pub fn family(&self) -> EventFamily {
        self.kind.family()
    }

    /// Identity of the condition for cooldown purposes.
    pub fn subject(&self) -> String {
        self.hexes.join("+")
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {:.4},{:.4}",
            self.kind,
            self.subject(),
            self.geometry.centroid.lat,
            self.geometry.centroid.lon
        )?;
        if !self.callsigns.is_empty() {
            write!(f, " ({})", self.callsigns.join(", "))?;
        }
        if self.military {
            write!(f, " mil")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique_and_parse_back() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_label(kind.label()), Some(kind));
        }
        assert!(EventKind::from_label("TAGLIAERBA").is_none());
    }

    #[test]
    fn event_serializes_family_and_subtype() {
        let event = Event::new(
            EventKind::Anomaly(AnomalyKind::Emergency(EmergencyCode::General)),
            vec!["4ca123".into()],
            100.0,
            Geometry::point(GeoPoint::new(45.0, 9.0)),
        )
        .with_evidence("squawk", "7700");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["family"], "ANOMALY");
        assert_eq!(json["subtype"], "SQUAWK_7700");
        assert_eq!(json["severity"], "CRITICAL");
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn unknown_or_mismatched_subtype_is_rejected() {
        let good = serde_json::to_value(Event::new(
            EventKind::Military,
            vec!["ae1234".into()],
            0.0,
            Geometry::point(GeoPoint::new(0.0, 0.0)),
        ))
        .unwrap();

        let mut unknown = good.clone();
        unknown["subtype"] = "UFO".into();
        assert!(serde_json::from_value::<Event>(unknown).is_err());

        let mut mismatched = good;
        mismatched["family"] = "PATTERN".into();
        assert!(serde_json::from_value::<Event>(mismatched).is_err());
    }
}
