use crate::detect::legs::{segment_legs, Leg, PlanarSample, SegmentationConfig};
use crate::math::geodesy::{angle_diff_deg, axis_diff_deg, planar_heading_deg, signed_turn_deg};
use crate::math::{BoundingBox, CircleFit, GeoPoint, LocalFrame, StatsHelper};
use crate::model::{Event, EventKind, Evidence, Geometry, PatternKind};
use crate::track::Track;
use serde::{Deserialize, Serialize};

/// Loop/circle and racetrack thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleConfig {
    pub min_samples: usize,
    /// Maximum RMS radial error as a fraction of the fitted radius.
    pub residual_tolerance: f64,
    /// Minimum absolute cumulative heading change over the window.
    pub min_turn_deg: f64,
    /// Maximum start-to-end distance relative to the fitted radius.
    pub max_closure_ratio: f64,
    pub min_radius_km: f64,
    pub max_radius_km: f64,
    pub racetrack_min_aspect: f64,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            min_samples: 12,
            residual_tolerance: 0.15,
            min_turn_deg: 300.0,
            max_closure_ratio: 0.5,
            min_radius_km: 0.3,
            max_radius_km: 60.0,
            racetrack_min_aspect: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LawnmowerConfig {
    pub min_samples: usize,
    pub min_legs: usize,
    pub axis_tolerance_deg: f64,
    /// Share of all legs that must belong to the sweep axis.
    pub min_family_coverage: f64,
    pub min_passes_per_direction: usize,
    pub min_spacing_km: f64,
    pub max_spacing_cv: f64,
    pub max_extent_km: f64,
}

impl Default for LawnmowerConfig {
    fn default() -> Self {
        Self {
            min_samples: 14,
            min_legs: 4,
            axis_tolerance_deg: 15.0,
            min_family_coverage: 0.75,
            min_passes_per_direction: 2,
            min_spacing_km: 0.2,
            max_spacing_cv: 0.5,
            max_extent_km: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub min_samples: usize,
    pub min_legs: usize,
    pub min_legs_per_family: usize,
    pub axis_tolerance_deg: f64,
    pub min_family_coverage: f64,
    /// Overlap of the two families' boxes relative to the smaller box.
    pub min_overlap: f64,
    pub max_extent_km: f64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            min_samples: 20,
            min_legs: 6,
            min_legs_per_family: 3,
            axis_tolerance_deg: 15.0,
            min_family_coverage: 0.75,
            min_overlap: 0.5,
            max_extent_km: 80.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub circle: CircleConfig,
    pub lawnmower: LawnmowerConfig,
    pub mesh: MeshConfig,
    pub segmentation: SegmentationConfig,
}

/// A positive classification; lower `score` means a tighter fit.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub kind: PatternKind,
    pub score: f64,
    pub geometry: Geometry,
    pub evidence: Evidence,
}

struct Projected {
    frame: LocalFrame,
    points: Vec<PlanarSample>,
    bbox: BoundingBox,
}

impl Projected {
    fn of(track: &Track) -> Option<Self> {
        let geo: Vec<GeoPoint> = track.samples().map(|s| s.position()).collect();
        let frame = LocalFrame::centred_on(&geo)?;
        let bbox = BoundingBox::from_points(&geo)?;
        let points = track
            .samples()
            .zip(&geo)
            .map(|(sample, point)| {
                let (x, y) = frame.project(point);
                PlanarSample {
                    x,
                    y,
                    t: sample.timestamp,
                }
            })
            .collect();
        Some(Self {
            frame,
            points,
            bbox,
        })
    }

    fn xy(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| (p.x, p.y)).collect()
    }

    fn closure_km(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) => (b.x - a.x).hypot(b.y - a.y),
            _ => 0.0,
        }
    }

    fn box_geometry(&self) -> Geometry {
        let centroid = GeoPoint::new(
            (self.bbox.south + self.bbox.north) / 2.0,
            (self.bbox.west + self.bbox.east) / 2.0,
        );
        Geometry {
            centroid,
            bbox: Some(self.bbox),
            radius_km: None,
        }
    }
}

/// Classifies one aircraft's window as a loop, racetrack, lawnmower or mesh.
///
/// Stateless: every call re-derives the classification from the full window.
pub struct PatternDetector {
    config: PatternConfig,
}

impl PatternDetector {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    pub fn min_samples(&self) -> usize {
        self.config
            .circle
            .min_samples
            .min(self.config.lawnmower.min_samples)
            .min(self.config.mesh.min_samples)
            .max(3)
    }

    /// Every subtype the window satisfies.
    pub fn candidates(&self, track: &Track) -> Vec<PatternMatch> {
        if track.len() < self.min_samples() {
            return Vec::new();
        }
        let Some(projected) = Projected::of(track) else {
            return Vec::new();
        };
        let legs = segment_legs(&projected.points, &self.config.segmentation);
        [
            self.circle_match(&projected),
            self.mesh_match(&projected, &legs),
            self.lawnmower_match(&projected, &legs),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// The tightest-fitting subtype, if any.
    pub fn classify(&self, track: &Track) -> Option<PatternMatch> {
        self.candidates(track)
            .into_iter()
            .min_by(|a, b| a.score.total_cmp(&b.score))
    }

    pub fn detect(&self, track: &Track) -> Option<Event> {
        let latest = track.latest()?;
        let matched = self.classify(track)?;
        let mut event = Event::new(
            EventKind::Pattern(matched.kind),
            vec![track.hex().to_string()],
            latest.timestamp,
            matched.geometry,
        )
        .with_evidence("score", matched.score)
        .with_evidence("samples", track.len());
        event.evidence.extend(matched.evidence);
        Some(event)
    }

    fn circle_match(&self, projected: &Projected) -> Option<PatternMatch> {
        let cfg = &self.config.circle;
        if projected.points.len() < cfg.min_samples {
            return None;
        }
        let turn = cumulative_turn_deg(&projected.points, self.config.segmentation.min_segment_km);
        if turn.abs() < cfg.min_turn_deg {
            return None;
        }
        let direction = if turn > 0.0 { "CW" } else { "CCW" };
        let xy = projected.xy();
        let closure_km = projected.closure_km();

        if let Some(fit) = CircleFit::fit(&xy)
            .filter(|fit| (cfg.min_radius_km..=cfg.max_radius_km).contains(&fit.radius))
        {
            let residual = fit.relative_residual();
            let closure_ratio = closure_km / fit.radius;
            if residual <= cfg.residual_tolerance && closure_ratio <= cfg.max_closure_ratio {
                let mut evidence = Evidence::new();
                evidence.insert("residual".into(), residual.into());
                evidence.insert("radius_km".into(), fit.radius.into());
                evidence.insert("turn_deg".into(), turn.into());
                evidence.insert("direction".into(), direction.into());
                evidence.insert("closure_ratio".into(), closure_ratio.into());
                return Some(PatternMatch {
                    kind: PatternKind::Loop,
                    score: residual / cfg.residual_tolerance,
                    geometry: Geometry {
                        centroid: projected.frame.unproject(fit.center_x, fit.center_y),
                        bbox: Some(projected.bbox),
                        radius_km: Some(fit.radius),
                    },
                    evidence,
                });
            }
        }

        let extents = PrincipalExtents::of(&xy)?;
        let half_length = extents.major_span_km / 2.0;
        if extents.aspect < cfg.racetrack_min_aspect
            || !(cfg.min_radius_km..=cfg.max_radius_km).contains(&half_length)
        {
            return None;
        }
        let closure_ratio = closure_km / half_length;
        if closure_ratio > cfg.max_closure_ratio {
            return None;
        }
        let mut evidence = Evidence::new();
        evidence.insert("aspect_ratio".into(), extents.aspect.into());
        evidence.insert("length_km".into(), extents.major_span_km.into());
        evidence.insert("turn_deg".into(), turn.into());
        evidence.insert("direction".into(), direction.into());
        evidence.insert("closure_ratio".into(), closure_ratio.into());
        Some(PatternMatch {
            kind: PatternKind::Racetrack,
            score: (closure_ratio / cfg.max_closure_ratio).min(1.0),
            geometry: projected.box_geometry(),
            evidence,
        })
    }

    fn mesh_match(&self, projected: &Projected, legs: &[Leg]) -> Option<PatternMatch> {
        let cfg = &self.config.mesh;
        if projected.points.len() < cfg.min_samples || legs.len() < cfg.min_legs {
            return None;
        }
        let tol = cfg.axis_tolerance_deg;
        let axis_a = dominant_axis(legs, tol)?;
        let axis_b = (axis_a + 90.0).rem_euclid(180.0);
        let family_a = family(legs, axis_a, tol);
        let family_b = family(legs, axis_b, tol);
        if family_a.len() < cfg.min_legs_per_family || family_b.len() < cfg.min_legs_per_family {
            return None;
        }
        let coverage = (family_a.len() + family_b.len()) as f64 / legs.len() as f64;
        if coverage < cfg.min_family_coverage {
            return None;
        }
        let extent_km = projected.bbox.diagonal_km();
        if extent_km > cfg.max_extent_km {
            return None;
        }
        let overlap = overlap_ratio(&leg_box(&family_a), &leg_box(&family_b));
        if overlap < cfg.min_overlap {
            return None;
        }

        let mean_a = StatsHelper::axial_mean_deg(&axes(&family_a)).unwrap_or(axis_a);
        let mean_b = StatsHelper::axial_mean_deg(&axes(&family_b)).unwrap_or(axis_b);
        let deviations: Vec<f64> = family_a
            .iter()
            .map(|leg| axis_diff_deg(leg.axis_deg(), mean_a))
            .chain(family_b.iter().map(|leg| axis_diff_deg(leg.axis_deg(), mean_b)))
            .collect();
        let crossing_deg = axis_diff_deg(mean_a, mean_b);
        let ortho_error = (90.0 - crossing_deg).abs();
        let score = ((StatsHelper::mean(&deviations) + ortho_error) / (2.0 * tol)).min(1.0);

        let mut evidence = Evidence::new();
        evidence.insert("legs".into(), legs.len().into());
        evidence.insert("family_a_legs".into(), family_a.len().into());
        evidence.insert("family_b_legs".into(), family_b.len().into());
        evidence.insert("axis_a_deg".into(), mean_a.into());
        evidence.insert("axis_b_deg".into(), mean_b.into());
        evidence.insert("crossing_deg".into(), crossing_deg.into());
        evidence.insert("overlap".into(), overlap.into());
        evidence.insert("extent_km".into(), extent_km.into());
        Some(PatternMatch {
            kind: PatternKind::Mesh,
            score,
            geometry: projected.box_geometry(),
            evidence,
        })
    }

    fn lawnmower_match(&self, projected: &Projected, legs: &[Leg]) -> Option<PatternMatch> {
        let cfg = &self.config.lawnmower;
        if projected.points.len() < cfg.min_samples || legs.len() < cfg.min_legs {
            return None;
        }
        let tol = cfg.axis_tolerance_deg;
        let axis = dominant_axis(legs, tol)?;
        let sweeps = family(legs, axis, tol);
        if (sweeps.len() as f64 / legs.len() as f64) < cfg.min_family_coverage {
            return None;
        }
        let crossing = family(legs, (axis + 90.0).rem_euclid(180.0), tol);
        if crossing.len() >= self.config.mesh.min_legs_per_family {
            return None;
        }
        let extent_km = projected.bbox.diagonal_km();
        if extent_km > cfg.max_extent_km {
            return None;
        }

        let mean_axis = StatsHelper::axial_mean_deg(&axes(&sweeps)).unwrap_or(axis);
        let forward: Vec<bool> = sweeps
            .iter()
            .map(|leg| angle_diff_deg(leg.heading_deg, mean_axis) <= 90.0)
            .collect();
        let passes_forward = forward.iter().filter(|f| **f).count();
        let passes_reverse = forward.len() - passes_forward;
        if passes_forward < cfg.min_passes_per_direction
            || passes_reverse < cfg.min_passes_per_direction
        {
            return None;
        }
        let alternations = forward.windows(2).filter(|w| w[0] != w[1]).count();
        if alternations + 1 < cfg.min_legs {
            return None;
        }

        let theta = mean_axis.to_radians();
        let normal = (theta.cos(), -theta.sin());
        let offsets: Vec<f64> = sweeps
            .windows(2)
            .map(|w| {
                let (a, b) = (w[0].midpoint(), w[1].midpoint());
                (b.0 - a.0) * normal.0 + (b.1 - a.1) * normal.1
            })
            .collect();
        let spacing: Vec<f64> = offsets.iter().map(|d| d.abs()).collect();
        let mean_spacing = StatsHelper::mean(&spacing);
        let spacing_cv = StatsHelper::coefficient_of_variation(&spacing);
        if mean_spacing < cfg.min_spacing_km || spacing_cv > cfg.max_spacing_cv {
            return None;
        }
        let drift: f64 = offsets.iter().sum();
        let consistent = offsets
            .iter()
            .filter(|d| d.signum() == drift.signum())
            .count();
        if (consistent as f64) < 0.75 * offsets.len() as f64 {
            return None;
        }

        let deviations: Vec<f64> = sweeps
            .iter()
            .map(|leg| axis_diff_deg(leg.axis_deg(), mean_axis))
            .collect();
        let score = ((StatsHelper::mean(&deviations) / tol
            + (spacing_cv / cfg.max_spacing_cv).min(1.0))
            / 2.0)
            .min(1.0);

        let mut evidence = Evidence::new();
        evidence.insert("legs".into(), legs.len().into());
        evidence.insert("passes_forward".into(), passes_forward.into());
        evidence.insert("passes_reverse".into(), passes_reverse.into());
        evidence.insert("alternations".into(), alternations.into());
        evidence.insert("axis_deg".into(), mean_axis.into());
        evidence.insert("spacing_km".into(), mean_spacing.into());
        evidence.insert("spacing_cv".into(), spacing_cv.into());
        evidence.insert("extent_km".into(), extent_km.into());
        Some(PatternMatch {
            kind: PatternKind::Lawnmower,
            score,
            geometry: projected.box_geometry(),
            evidence,
        })
    }
}

/// Signed sum of heading changes between successive usable segments.
fn cumulative_turn_deg(points: &[PlanarSample], min_segment_km: f64) -> f64 {
    let headings: Vec<f64> = points
        .windows(2)
        .filter_map(|w| {
            let (dx, dy) = (w[1].x - w[0].x, w[1].y - w[0].y);
            if dx.hypot(dy) < min_segment_km {
                return None;
            }
            planar_heading_deg(dx, dy)
        })
        .collect();
    headings
        .windows(2)
        .map(|w| signed_turn_deg(w[0], w[1]))
        .sum()
}

/// Axis shared by the largest group of legs, refined to that group's mean.
fn dominant_axis(legs: &[Leg], tol: f64) -> Option<f64> {
    let seed = legs.iter().max_by_key(|candidate| {
        legs.iter()
            .filter(|leg| axis_diff_deg(leg.axis_deg(), candidate.axis_deg()) <= tol)
            .count()
    })?;
    let group = family(legs, seed.axis_deg(), tol);
    StatsHelper::axial_mean_deg(&axes(&group)).or(Some(seed.axis_deg()))
}

fn family(legs: &[Leg], axis: f64, tol: f64) -> Vec<Leg> {
    legs.iter()
        .filter(|leg| axis_diff_deg(leg.axis_deg(), axis) <= tol)
        .copied()
        .collect()
}

fn axes(legs: &[Leg]) -> Vec<f64> {
    legs.iter().map(Leg::axis_deg).collect()
}

#[derive(Debug, Clone, Copy)]
struct PlanarBox {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl PlanarBox {
    const MARGIN_KM: f64 = 0.1;

    fn area(&self) -> f64 {
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }
}

fn leg_box(legs: &[Leg]) -> PlanarBox {
    let mut bbox = PlanarBox {
        min_x: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        min_y: f64::INFINITY,
        max_y: f64::NEG_INFINITY,
    };
    for (x, y) in legs.iter().flat_map(|leg| [leg.start, leg.end]) {
        bbox.min_x = bbox.min_x.min(x - PlanarBox::MARGIN_KM);
        bbox.max_x = bbox.max_x.max(x + PlanarBox::MARGIN_KM);
        bbox.min_y = bbox.min_y.min(y - PlanarBox::MARGIN_KM);
        bbox.max_y = bbox.max_y.max(y + PlanarBox::MARGIN_KM);
    }
    bbox
}

fn overlap_ratio(a: &PlanarBox, b: &PlanarBox) -> f64 {
    let width = (a.max_x.min(b.max_x) - a.min_x.max(b.min_x)).max(0.0);
    let height = (a.max_y.min(b.max_y) - a.min_y.max(b.min_y)).max(0.0);
    let smaller = a.area().min(b.area());
    if !(smaller > 0.0) {
        return 0.0;
    }
    width * height / smaller
}

/// Spread of a point cloud along its principal axes.
struct PrincipalExtents {
    aspect: f64,
    major_span_km: f64,
}

impl PrincipalExtents {
    fn of(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let n = points.len() as f64;
        let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
        let my = points.iter().map(|p| p.1).sum::<f64>() / n;
        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for &(x, y) in points {
            sxx += (x - mx) * (x - mx);
            syy += (y - my) * (y - my);
            sxy += (x - mx) * (y - my);
        }
        let half_trace = (sxx + syy) / 2.0;
        let root = (half_trace * half_trace - (sxx * syy - sxy * sxy)).max(0.0).sqrt();
        let (major, minor) = (half_trace + root, half_trace - root);
        if !(minor > 0.0) {
            return None;
        }
        let angle = 0.5 * (2.0 * sxy).atan2(sxx - syy);
        let (ux, uy) = (angle.cos(), angle.sin());
        let along = points.iter().map(|&(x, y)| (x - mx) * ux + (y - my) * uy);
        let (lo, hi) = along.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        Some(Self {
            aspect: (major / minor).sqrt(),
            major_span_km: hi - lo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StateVector;
    use crate::track::TrackConfig;

    const ORIGIN: GeoPoint = GeoPoint { lat: 45.0, lon: 9.0 };

    fn track_from_xy(points: &[(f64, f64)], step_s: f64) -> Track {
        let frame = LocalFrame::new(ORIGIN);
        let samples = points.iter().enumerate().map(|(i, &(x, y))| {
            let p = frame.unproject(x, y);
            StateVector::new("4ca7f1", 1_000.0 + i as f64 * step_s, p.lat, p.lon)
                .with_altitude(3000.0)
                .with_ground_speed(200.0)
        });
        Track::from_samples("4ca7f1", samples, &TrackConfig::default())
    }

    /// Samples a polyline every kilometre; waypoints sit on whole kilometres.
    fn walk(waypoints: &[(f64, f64)]) -> Vec<(f64, f64)> {
        let mut points = Vec::new();
        for w in waypoints.windows(2) {
            let (a, b) = (w[0], w[1]);
            let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).round() as usize;
            for k in 0..steps {
                let f = k as f64 / steps as f64;
                points.push((a.0 + (b.0 - a.0) * f, a.1 + (b.1 - a.1) * f));
            }
        }
        points.push(waypoints[waypoints.len() - 1]);
        points
    }

    fn circle(n: usize, radius_km: f64) -> Vec<(f64, f64)> {
        (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * std::f64::consts::TAU;
                (radius_km * a.cos(), radius_km * a.sin())
            })
            .collect()
    }

    fn north_south_sweeps(lines: usize) -> Vec<(f64, f64)> {
        let mut waypoints = Vec::new();
        for i in 0..lines {
            let x = 2.0 * i as f64;
            if i % 2 == 0 {
                waypoints.extend([(x, 0.0), (x, 10.0)]);
            } else {
                waypoints.extend([(x, 10.0), (x, 0.0)]);
            }
        }
        waypoints
    }

    fn east_west_sweeps(lines: usize, x_start: f64) -> Vec<(f64, f64)> {
        let mut waypoints = Vec::new();
        for i in 0..lines {
            let y = 2.0 * i as f64;
            let (from, to) = if (i % 2 == 0) == (x_start > 0.0) {
                (x_start, 10.0 - x_start)
            } else {
                (10.0 - x_start, x_start)
            };
            waypoints.extend([(from, y), (to, y)]);
        }
        waypoints
    }

    #[test]
    fn short_tracks_never_classify() {
        let detector = PatternDetector::new(PatternConfig::default());
        let points = circle(20, 1.0);
        let short = track_from_xy(&points[..detector.min_samples() - 1], 10.0);
        assert!(detector.candidates(&short).is_empty());
        assert!(detector.detect(&short).is_none());
    }

    #[test]
    fn perfect_circle_is_a_loop_with_zero_residual() {
        let detector = PatternDetector::new(PatternConfig::default());
        let track = track_from_xy(&circle(20, 1.0), 10.0);
        let matched = detector.classify(&track).expect("loop");
        assert_eq!(matched.kind, PatternKind::Loop);
        let residual = matched.evidence["residual"].as_f64().unwrap();
        assert!(residual < 1e-3, "residual {}", residual);
        assert!((matched.geometry.radius_km.unwrap() - 1.0).abs() < 0.01);
        assert_eq!(matched.evidence["direction"], "CCW");
    }

    #[test]
    fn open_arc_is_not_a_loop() {
        let detector = PatternDetector::new(PatternConfig::default());
        let arc: Vec<(f64, f64)> = circle(40, 2.0).into_iter().take(20).collect();
        let track = track_from_xy(&arc, 10.0);
        assert!(detector.classify(&track).is_none());
    }

    /// Two 6 km straights joined by 1 km semicircles, flown counter-clockwise.
    fn stadium() -> Vec<(f64, f64)> {
        let mut points = Vec::new();
        for k in 0..12 {
            points.push((-3.0 + 0.5 * k as f64, -1.0));
        }
        for j in 0..6 {
            let a = (-90.0 + 30.0 * j as f64).to_radians();
            points.push((3.0 + a.cos(), a.sin()));
        }
        for k in 0..12 {
            points.push((3.0 - 0.5 * k as f64, 1.0));
        }
        for j in 0..6 {
            let a = (90.0 + 30.0 * j as f64).to_radians();
            points.push((-3.0 + a.cos(), a.sin()));
        }
        points
    }

    #[test]
    fn elongated_closed_circuit_is_a_racetrack() {
        let detector = PatternDetector::new(PatternConfig::default());
        let track = track_from_xy(&stadium(), 10.0);
        let matched = detector.classify(&track).expect("racetrack");
        assert_eq!(matched.kind, PatternKind::Racetrack);
        assert!(matched.evidence["aspect_ratio"].as_f64().unwrap() >= 1.5);
        assert_eq!(matched.evidence["direction"], "CCW");
    }

    #[test]
    fn back_and_forth_sweeps_are_a_lawnmower() {
        let detector = PatternDetector::new(PatternConfig::default());
        let track = track_from_xy(&walk(&north_south_sweeps(6)), 10.0);
        let matched = detector.classify(&track).expect("lawnmower");
        assert_eq!(matched.kind, PatternKind::Lawnmower);
        let spacing = matched.evidence["spacing_km"].as_f64().unwrap();
        assert!((spacing - 2.0).abs() < 0.05);
    }

    #[test]
    fn perpendicular_sweeps_are_a_mesh_not_a_lawnmower() {
        let detector = PatternDetector::new(PatternConfig::default());
        let mut waypoints = north_south_sweeps(6);
        waypoints.extend(east_west_sweeps(6, 10.0));
        let track = track_from_xy(&walk(&waypoints), 10.0);

        let kinds: Vec<PatternKind> = detector
            .candidates(&track)
            .into_iter()
            .map(|m| m.kind)
            .collect();
        assert!(!kinds.contains(&PatternKind::Lawnmower));
        let matched = detector.classify(&track).expect("mesh");
        assert_eq!(matched.kind, PatternKind::Mesh);
        let crossing = matched.evidence["crossing_deg"].as_f64().unwrap();
        assert!((crossing - 90.0).abs() < 1.0);
    }

    #[test]
    fn straight_transit_has_no_pattern() {
        let detector = PatternDetector::new(PatternConfig::default());
        let track = track_from_xy(&walk(&[(0.0, 0.0), (0.0, 40.0)]), 10.0);
        assert!(detector.detect(&track).is_none());
    }

    #[test]
    fn detect_builds_pattern_event() {
        let detector = PatternDetector::new(PatternConfig::default());
        let track = track_from_xy(&circle(24, 3.0), 15.0);
        let event = detector.detect(&track).expect("event");
        assert_eq!(event.kind, EventKind::Pattern(PatternKind::Loop));
        assert_eq!(event.hexes, vec!["4ca7f1".to_string()]);
        assert_eq!(event.timestamp, track.last_update().unwrap());
        assert!(event.evidence.contains_key("score"));
    }
}
