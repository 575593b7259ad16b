//! Trajectory model and anomaly-detection core for the airspace monitor.
//!
//! State vectors flow through a geofence into per-aircraft sliding windows;
//! pattern, proximity, anomaly and military classifiers turn those windows
//! into de-duplicated [`Event`] records handed to an [`EventSink`].

pub mod config;
pub mod detect;
pub mod geo;
pub mod ingest;
pub mod math;
pub mod model;
pub mod prelude;
pub mod telemetry;
pub mod track;

pub use config::CoreConfig;
pub use model::{Event, EventKind, StateVector};
pub use prelude::{CoreError, CoreResult, EventSink, Feed, FetchError};
