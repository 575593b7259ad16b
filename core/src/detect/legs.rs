use crate::math::geodesy::{angle_diff_deg, planar_heading_deg};
use serde::{Deserialize, Serialize};

/// Thresholds for cutting a track into near-straight legs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub leg_heading_tolerance_deg: f64,
    pub min_leg_segments: usize,
    pub min_leg_duration_s: f64,
    /// Segments shorter than this carry no usable heading.
    pub min_segment_km: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            leg_heading_tolerance_deg: 15.0,
            min_leg_segments: 2,
            min_leg_duration_s: 60.0,
            min_segment_km: 0.05,
        }
    }
}

/// Projected sample: kilometres east/north of the track centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarSample {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

/// Near-straight run of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub heading_deg: f64,
    pub duration_s: f64,
    pub length_km: f64,
    pub segments: usize,
}

impl Leg {
    /// Undirected orientation in [0, 180).
    pub fn axis_deg(&self) -> f64 {
        self.heading_deg.rem_euclid(180.0)
    }

    pub fn midpoint(&self) -> (f64, f64) {
        (
            (self.start.0 + self.end.0) / 2.0,
            (self.start.1 + self.end.1) / 2.0,
        )
    }
}

struct Run {
    first: usize,
    last: usize,
    reference_deg: f64,
    segments: usize,
}

pub fn segment_legs(points: &[PlanarSample], config: &SegmentationConfig) -> Vec<Leg> {
    let mut legs = Vec::new();
    let mut run: Option<Run> = None;

    for i in 1..points.len() {
        let (a, b) = (points[i - 1], points[i]);
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        if dx.hypot(dy) < config.min_segment_km {
            continue;
        }
        let Some(heading) = planar_heading_deg(dx, dy) else {
            continue;
        };

        match run.as_mut() {
            Some(current)
                if angle_diff_deg(heading, current.reference_deg)
                    <= config.leg_heading_tolerance_deg =>
            {
                current.last = i;
                current.segments += 1;
            }
            _ => {
                if let Some(done) = run.take() {
                    push_leg(&mut legs, points, &done, config);
                }
                run = Some(Run {
                    first: i - 1,
                    last: i,
                    reference_deg: heading,
                    segments: 1,
                });
            }
        }
    }
    if let Some(done) = run {
        push_leg(&mut legs, points, &done, config);
    }
    legs
}

fn push_leg(legs: &mut Vec<Leg>, points: &[PlanarSample], run: &Run, config: &SegmentationConfig) {
    let start = points[run.first];
    let end = points[run.last];
    let duration_s = end.t - start.t;
    if run.segments < config.min_leg_segments || duration_s < config.min_leg_duration_s {
        return;
    }
    let Some(heading_deg) = planar_heading_deg(end.x - start.x, end.y - start.y) else {
        return;
    };
    legs.push(Leg {
        start: (start.x, start.y),
        end: (end.x, end.y),
        heading_deg,
        duration_s,
        length_km: (end.x - start.x).hypot(end.y - start.y),
        segments: run.segments,
    });
}
