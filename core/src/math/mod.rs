pub mod circle;
pub mod geodesy;
pub mod matrix;
pub mod stats;

pub use circle::CircleFit;
pub use geodesy::{BoundingBox, GeoPoint, LocalFrame};
pub use matrix::MatrixHelper;
pub use stats::StatsHelper;
