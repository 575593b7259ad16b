pub mod event;
pub mod state;

pub use event::{
    AnomalyKind, EmergencyCode, Event, EventFamily, EventKind, Evidence, Geometry, PatternKind,
    ProximityKind, Severity,
};
pub use state::{SampleDefect, StateVector};
