pub mod anomaly;
pub mod legs;
pub mod military;
pub mod pattern;
pub mod proximity;

pub use anomaly::{AnomalyConfig, AnomalyDetector};
pub use legs::{segment_legs, Leg, PlanarSample, SegmentationConfig};
pub use military::{HexRange, MilitaryClassifier, MilitaryConfig, MilitaryReason};
pub use pattern::{
    CircleConfig, LawnmowerConfig, MeshConfig, PatternConfig, PatternDetector, PatternMatch,
};
pub use proximity::{ProximityConfig, ProximityDetector};
