use crate::model::{Event, EventKind, Geometry, StateVector};
use crate::prelude::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive range of 24-bit ICAO addresses, written as hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexRange {
    pub start: String,
    pub end: String,
}

impl HexRange {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    fn parse(&self) -> CoreResult<(u32, u32)> {
        let start = parse_icao(&self.start)?;
        let end = parse_icao(&self.end)?;
        if start > end {
            return Err(CoreError::Configuration(format!(
                "hex range {}-{} is inverted",
                self.start, self.end
            )));
        }
        Ok((start, end))
    }
}

fn parse_icao(text: &str) -> CoreResult<u32> {
    let value = u32::from_str_radix(text.trim(), 16)
        .map_err(|_| CoreError::Configuration(format!("invalid ICAO address {:?}", text)))?;
    if value > 0xFF_FFFF {
        return Err(CoreError::Configuration(format!(
            "ICAO address {} exceeds 24 bits",
            text
        )));
    }
    Ok(value)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MilitaryConfig {
    pub callsign_prefixes: Vec<String>,
    pub hex_ranges: Vec<HexRange>,
}

impl Default for MilitaryConfig {
    fn default() -> Self {
        let prefixes = [
            "RCH", "REACH", "CNV", "DUKE", "NATO", "LAGR", "IAM", "ASCOT", "RRR", "GAF", "FAF",
            "BAF", "CTM", "HKY", "SPAR",
        ];
        Self {
            callsign_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            hex_ranges: vec![
                HexRange::new("ADF7C8", "AFFFFF"),
                HexRange::new("43C000", "43CFFF"),
                HexRange::new("3AA000", "3AFFFF"),
                HexRange::new("3B7000", "3BFFFF"),
                HexRange::new("3EA000", "3EBFFF"),
                HexRange::new("3F4000", "3FBFFF"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MilitaryReason {
    /// Flagged by the upstream database or the military endpoint.
    Upstream,
    Callsign(String),
    AddressRange { start: u32, end: u32 },
}

impl fmt::Display for MilitaryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MilitaryReason::Upstream => write!(f, "upstream flag"),
            MilitaryReason::Callsign(prefix) => write!(f, "callsign prefix {}", prefix),
            MilitaryReason::AddressRange { start, end } => {
                write!(f, "address block {:06x}-{:06x}", start, end)
            }
        }
    }
}

pub struct MilitaryClassifier {
    prefixes: Vec<String>,
    ranges: Vec<(u32, u32)>,
}

impl MilitaryClassifier {
    pub fn new(config: &MilitaryConfig) -> CoreResult<Self> {
        let ranges = config
            .hex_ranges
            .iter()
            .map(HexRange::parse)
            .collect::<CoreResult<Vec<_>>>()?;
        let prefixes = config
            .callsign_prefixes
            .iter()
            .map(|p| p.trim().to_ascii_uppercase())
            .filter(|p| !p.is_empty())
            .collect();
        Ok(Self { prefixes, ranges })
    }

    pub fn classify(&self, sample: &StateVector) -> Option<MilitaryReason> {
        if sample.military_hint {
            return Some(MilitaryReason::Upstream);
        }
        if let Some(callsign) = sample.callsign.as_deref() {
            let callsign = callsign.trim().to_ascii_uppercase();
            if let Some(prefix) = self.prefixes.iter().find(|p| callsign.starts_with(p.as_str())) {
                return Some(MilitaryReason::Callsign(prefix.clone()));
            }
        }
        // Non-ICAO (`~`) addresses carry no allocation block.
        let address = u32::from_str_radix(&sample.hex, 16).ok()?;
        self.ranges
            .iter()
            .find(|(start, end)| (*start..=*end).contains(&address))
            .map(|&(start, end)| MilitaryReason::AddressRange { start, end })
    }

    pub fn event(&self, sample: &StateVector, reason: &MilitaryReason) -> Event {
        let mut event = Event::new(
            EventKind::Military,
            vec![sample.hex.clone()],
            sample.timestamp,
            Geometry::point(sample.position()),
        )
        .with_evidence("reason", reason.to_string());
        if let Some(type_code) = &sample.type_code {
            event = event.with_evidence("type_code", type_code.as_str());
        }
        if let Some(description) = &sample.description {
            event = event.with_evidence("description", description.as_str());
        }
        event.military = true;
        event
    }
}
