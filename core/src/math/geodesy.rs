use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle (haversine) distance in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
        EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Initial great-circle bearing towards `other`, degrees clockwise from north.
    pub fn bearing_deg(&self, other: &GeoPoint) -> Option<f64> {
        if self == other {
            return None;
        }
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        Some(normalize_deg(y.atan2(x).to_degrees()))
    }

    /// Linear interpolation between two nearby points.
    pub fn lerp(&self, other: &GeoPoint, fraction: f64) -> GeoPoint {
        GeoPoint::new(
            self.lat + (other.lat - self.lat) * fraction,
            self.lon + (other.lon - self.lon) * fraction,
        )
    }
}

/// Axis-aligned lat/lon box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a GeoPoint>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BoundingBox {
            south: first.lat,
            north: first.lat,
            west: first.lon,
            east: first.lon,
        };
        for point in iter {
            bbox.south = bbox.south.min(point.lat);
            bbox.north = bbox.north.max(point.lat);
            bbox.west = bbox.west.min(point.lon);
            bbox.east = bbox.east.max(point.lon);
        }
        Some(bbox)
    }

    pub fn diagonal_km(&self) -> f64 {
        GeoPoint::new(self.south, self.west).distance_km(&GeoPoint::new(self.north, self.east))
    }
}

/// Local equirectangular projection (kilometres east/north of an origin).
///
/// Accurate enough for the tens-of-kilometres extents the pattern
/// classifiers work over.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin: GeoPoint,
    cos_lat: f64,
}

impl LocalFrame {
    pub fn new(origin: GeoPoint) -> Self {
        Self {
            origin,
            cos_lat: origin.lat.to_radians().cos(),
        }
    }

    /// Frame centred on the mean of `points`.
    pub fn centred_on(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
        let lon = points.iter().map(|p| p.lon).sum::<f64>() / n;
        Some(Self::new(GeoPoint::new(lat, lon)))
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    pub fn project(&self, point: &GeoPoint) -> (f64, f64) {
        let x = (point.lon - self.origin.lon).to_radians() * EARTH_RADIUS_KM * self.cos_lat;
        let y = (point.lat - self.origin.lat).to_radians() * EARTH_RADIUS_KM;
        (x, y)
    }

    pub fn unproject(&self, x: f64, y: f64) -> GeoPoint {
        let lat = self.origin.lat + (y / EARTH_RADIUS_KM).to_degrees();
        let lon = self.origin.lon + (x / (EARTH_RADIUS_KM * self.cos_lat)).to_degrees();
        GeoPoint::new(lat, lon)
    }
}

pub fn normalize_deg(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

/// Unsigned smallest difference between two headings, in [0, 180].
pub fn angle_diff_deg(a: f64, b: f64) -> f64 {
    let d = (a - b).abs().rem_euclid(360.0);
    if d <= 180.0 {
        d
    } else {
        360.0 - d
    }
}

/// Signed turn from heading `from` to heading `to`, in (-180, 180]; positive is clockwise.
pub fn signed_turn_deg(from: f64, to: f64) -> f64 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Difference between two undirected axes, in [0, 90].
pub fn axis_diff_deg(a: f64, b: f64) -> f64 {
    let d = (a - b).abs().rem_euclid(180.0);
    if d <= 90.0 {
        d
    } else {
        180.0 - d
    }
}

/// Compass heading of a planar displacement (x east, y north).
pub fn planar_heading_deg(dx: f64, dy: f64) -> Option<f64> {
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    Some(normalize_deg(dx.atan2(dy).to_degrees()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_one_degree_latitude() {
        let a = GeoPoint::new(45.0, 9.0);
        let b = GeoPoint::new(46.0, 9.0);
        assert!((a.distance_km(&b) - 111.19).abs() < 0.1);
    }

    #[test]
    fn bearing_points_east() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        assert!((a.bearing_deg(&b).unwrap() - 90.0).abs() < 1e-9);
        assert!(a.bearing_deg(&a).is_none());
    }

    #[test]
    fn angle_helpers_wrap() {
        assert_eq!(angle_diff_deg(350.0, 10.0), 20.0);
        assert_eq!(signed_turn_deg(350.0, 10.0), 20.0);
        assert_eq!(signed_turn_deg(10.0, 350.0), -20.0);
        assert_eq!(axis_diff_deg(0.0, 180.0), 0.0);
        assert_eq!(axis_diff_deg(10.0, 100.0), 90.0);
    }

    #[test]
    fn local_frame_round_trips_nearby_points() {
        let frame = LocalFrame::new(GeoPoint::new(45.0, 9.0));
        let point = GeoPoint::new(45.05, 9.07);
        let (x, y) = frame.project(&point);
        let back = frame.unproject(x, y);
        assert!((back.lat - point.lat).abs() < 1e-9);
        assert!((back.lon - point.lon).abs() < 1e-9);
    }
}
