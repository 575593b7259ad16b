pub mod area;
pub mod fence;

pub use area::{load_areas, parse_areas};
pub use fence::{contains, GeoFence, MonitoringArea};
