use crate::math::GeoPoint;
use crate::prelude::{CoreError, CoreResult};
use log::warn;

/// Ray-casting point-in-ring test; vertex order is irrelevant and the ring
/// is treated as closed.
pub fn contains(point: &GeoPoint, ring: &[GeoPoint]) -> bool {
    let (x, y) = (point.lon, point.lat);
    let mut inside = false;
    let n = ring.len();
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if (a.lat > y) != (b.lat > y) {
            let x_cross = (b.lon - a.lon) * (y - a.lat) / (b.lat - a.lat) + a.lon;
            if x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Named polygon restricting where aircraft are monitored.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringArea {
    name: String,
    outer: Vec<GeoPoint>,
    holes: Vec<Vec<GeoPoint>>,
}

impl MonitoringArea {
    pub fn new(
        name: impl Into<String>,
        outer: Vec<GeoPoint>,
        holes: Vec<Vec<GeoPoint>>,
    ) -> CoreResult<Self> {
        let name = name.into();
        let outer = normalize_ring(&name, outer)?;
        let holes = holes
            .into_iter()
            .map(|hole| normalize_ring(&name, hole))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { name, outer, holes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[GeoPoint] {
        &self.outer
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        contains(point, &self.outer) && !self.holes.iter().any(|hole| contains(point, hole))
    }
}

/// Drops the explicit closing vertex and rejects degenerate rings.
fn normalize_ring(name: &str, mut ring: Vec<GeoPoint>) -> CoreResult<Vec<GeoPoint>> {
    if ring
        .iter()
        .any(|p| !p.lat.is_finite() || !p.lon.is_finite())
    {
        return Err(CoreError::Configuration(format!(
            "area {}: non-finite vertex",
            name
        )));
    }
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    let mut distinct: Vec<GeoPoint> = Vec::with_capacity(ring.len());
    for vertex in &ring {
        if !distinct.contains(vertex) {
            distinct.push(*vertex);
        }
    }
    if distinct.len() < 3 {
        return Err(CoreError::Configuration(format!(
            "area {}: ring needs at least 3 distinct vertices, got {}",
            name,
            distinct.len()
        )));
    }
    if shoelace_area(&ring).abs() < MIN_RING_AREA_DEG2 {
        return Err(CoreError::Configuration(format!(
            "area {}: ring encloses no area",
            name
        )));
    }
    Ok(ring)
}

/// Below this (in squared degrees) a ring is treated as collinear.
const MIN_RING_AREA_DEG2: f64 = 1e-12;

/// Signed area of an open ring in the lon/lat plane.
fn shoelace_area(ring: &[GeoPoint]) -> f64 {
    let n = ring.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (&ring[i], &ring[(i + 1) % n]);
            a.lon * b.lat - b.lon * a.lat
        })
        .sum();
    twice / 2.0
}

/// Set of monitoring areas; an empty fence admits every position.
#[derive(Debug, Clone, Default)]
pub struct GeoFence {
    areas: Vec<MonitoringArea>,
}

impl GeoFence {
    pub fn new(areas: Vec<MonitoringArea>) -> Self {
        if areas.is_empty() {
            warn!("no monitoring areas configured, geofence admits every aircraft");
        }
        Self { areas }
    }

    pub fn unrestricted() -> Self {
        Self { areas: Vec::new() }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn areas(&self) -> &[MonitoringArea] {
        &self.areas
    }

    pub fn admits(&self, point: &GeoPoint) -> bool {
        self.is_unrestricted() || self.areas.iter().any(|area| area.contains(point))
    }

    pub fn areas_containing(&self, point: &GeoPoint) -> Vec<String> {
        self.areas
            .iter()
            .filter(|area| area.contains(point))
            .map(|area| area.name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(44.0, 8.0),
            GeoPoint::new(44.0, 10.0),
            GeoPoint::new(46.0, 10.0),
            GeoPoint::new(46.0, 8.0),
        ]
    }

    #[test]
    fn contains_is_independent_of_winding() {
        let inside = GeoPoint::new(45.0, 9.0);
        let outside = GeoPoint::new(47.0, 9.0);
        let mut ring = square();
        assert!(contains(&inside, &ring));
        assert!(!contains(&outside, &ring));
        ring.reverse();
        assert!(contains(&inside, &ring));
        assert!(!contains(&outside, &ring));
    }

    #[test]
    fn explicit_closing_vertex_is_accepted() {
        let mut ring = square();
        ring.push(ring[0]);
        let area = MonitoringArea::new("north", ring, Vec::new()).unwrap();
        assert_eq!(area.vertices().len(), 4);
        assert!(area.contains(&GeoPoint::new(45.0, 9.0)));
    }

    #[test]
    fn degenerate_ring_fails_at_load() {
        let ring = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0), GeoPoint::new(0.0, 0.0)];
        let err = MonitoringArea::new("bad", ring, Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn collinear_ring_fails_at_load() {
        let ring = vec![
            GeoPoint::new(45.0, 9.0),
            GeoPoint::new(45.5, 9.5),
            GeoPoint::new(46.0, 10.0),
        ];
        let err = MonitoringArea::new("line", ring, Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(ref msg) if msg.contains("no area")));
    }

    #[test]
    fn holes_are_excluded() {
        let hole = vec![
            GeoPoint::new(44.8, 8.8),
            GeoPoint::new(44.8, 9.2),
            GeoPoint::new(45.2, 9.2),
            GeoPoint::new(45.2, 8.8),
        ];
        let area = MonitoringArea::new("donut", square(), vec![hole]).unwrap();
        assert!(!area.contains(&GeoPoint::new(45.0, 9.0)));
        assert!(area.contains(&GeoPoint::new(44.5, 8.5)));
    }

    #[test]
    fn fence_names_containing_areas() {
        let area = MonitoringArea::new("north", square(), Vec::new()).unwrap();
        let fence = GeoFence::new(vec![area]);
        assert!(fence.admits(&GeoPoint::new(45.0, 9.0)));
        assert!(!fence.admits(&GeoPoint::new(40.0, 9.0)));
        assert_eq!(fence.areas_containing(&GeoPoint::new(45.0, 9.0)), vec!["north"]);
        assert!(GeoFence::unrestricted().admits(&GeoPoint::new(-30.0, 100.0)));
    }
}
