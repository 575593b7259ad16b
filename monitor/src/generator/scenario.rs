use flightcore::math::geodesy::planar_heading_deg;
use flightcore::math::{GeoPoint, LocalFrame};
use flightcore::prelude::unix_now;
use flightcore::{Feed, FetchError, StateVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

const KMS_TO_KT: f64 = 3600.0 / 1.852;

/// Synthetic traffic for offline runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub seed: u64,
    /// Simulated seconds between snapshots.
    pub step_s: f64,
    /// Simulated start; defaults to the wall clock at construction.
    pub start_time: Option<f64>,
    pub center_lat: f64,
    pub center_lon: f64,
    pub background: usize,
    pub emergency_after_steps: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            step_s: 15.0,
            start_time: None,
            center_lat: 44.5,
            center_lon: 11.3,
            background: 6,
            emergency_after_steps: 10,
        }
    }
}

#[derive(Debug, Clone)]
enum Motion {
    /// Counter-clockwise circle.
    Orbit {
        center: (f64, f64),
        radius_km: f64,
        period_s: f64,
    },
    /// North/south lines stepping east, repeating after `lines`.
    Sweep {
        origin: (f64, f64),
        line_km: f64,
        spacing_km: f64,
        lines: usize,
        speed_kms: f64,
    },
    /// Straight line wrapping back to its start every `wrap_km`.
    Transit {
        start: (f64, f64),
        heading_deg: f64,
        speed_kms: f64,
        wrap_km: f64,
    },
}

/// Planar position, heading and speed in km and km/s.
struct Kinematics {
    x: f64,
    y: f64,
    heading_deg: f64,
    speed_kms: f64,
}

impl Motion {
    fn at(&self, elapsed_s: f64) -> Kinematics {
        match *self {
            Motion::Orbit {
                center,
                radius_km,
                period_s,
            } => {
                let omega = TAU / period_s;
                let angle = omega * elapsed_s;
                Kinematics {
                    x: center.0 + radius_km * angle.cos(),
                    y: center.1 + radius_km * angle.sin(),
                    heading_deg: planar_heading_deg(-angle.sin(), angle.cos()).unwrap_or(0.0),
                    speed_kms: radius_km * omega,
                }
            }
            Motion::Sweep {
                origin,
                line_km,
                spacing_km,
                lines,
                speed_kms,
            } => {
                let per_line = line_km + spacing_km;
                let travelled = (speed_kms * elapsed_s).rem_euclid(per_line * lines as f64);
                let line = (travelled / per_line).floor();
                let along = travelled - line * per_line;
                let northbound = (line as u64) % 2 == 0;
                let x0 = origin.0 + line * spacing_km;
                let (x, y, heading_deg) = if along < line_km {
                    let y = if northbound { along } else { line_km - along };
                    (x0, origin.1 + y, if northbound { 0.0 } else { 180.0 })
                } else {
                    let y = if northbound { line_km } else { 0.0 };
                    (x0 + along - line_km, origin.1 + y, 90.0)
                };
                Kinematics {
                    x,
                    y,
                    heading_deg,
                    speed_kms,
                }
            }
            Motion::Transit {
                start,
                heading_deg,
                speed_kms,
                wrap_km,
            } => {
                let travelled = (speed_kms * elapsed_s).rem_euclid(wrap_km);
                let rad = heading_deg.to_radians();
                Kinematics {
                    x: start.0 + travelled * rad.sin(),
                    y: start.1 + travelled * rad.cos(),
                    heading_deg,
                    speed_kms,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Actor {
    hex: String,
    callsign: String,
    motion: Motion,
    altitude_ft: f64,
    /// First step at which the transponder shows 7700.
    squawk_from: Option<u64>,
}

impl Actor {
    fn new(hex: &str, callsign: &str, motion: Motion, altitude_ft: f64) -> Self {
        Self {
            hex: hex.to_string(),
            callsign: callsign.to_string(),
            motion,
            altitude_ft,
            squawk_from: None,
        }
    }
}

struct Clock {
    now: f64,
    step: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioQuery;

impl fmt::Display for ScenarioQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "synthetic scenario")
    }
}

/// Seeded scenario advancing a simulated clock one step per fetch.
///
/// Contains a loiterer, a surveyor, a three-ship formation, a chase pair,
/// one aircraft that declares an emergency, and random background transits.
pub struct SyntheticFeed {
    frame: LocalFrame,
    start: f64,
    step_s: f64,
    actors: Vec<Actor>,
    clock: Mutex<Clock>,
}

impl SyntheticFeed {
    pub fn new(config: &ScenarioConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let start = config.start_time.unwrap_or_else(unix_now).floor();

        let mut actors = vec![
            Actor::new(
                "5b0001",
                "LOIT01",
                Motion::Orbit {
                    center: (-20.0, 10.0),
                    radius_km: 3.0,
                    period_s: 360.0,
                },
                4_000.0,
            ),
            Actor::new(
                "5b0002",
                "SURV02",
                Motion::Sweep {
                    origin: (10.0, 10.0),
                    line_km: 9.0,
                    spacing_km: 1.5,
                    lines: 8,
                    speed_kms: 0.1,
                },
                3_500.0,
            ),
        ];
        for (i, offset) in [(0.0, 0.0), (-0.8, 0.6), (-0.8, -0.6)].iter().enumerate() {
            actors.push(Actor::new(
                &format!("5b001{}", i),
                &format!("FORM1{}", i),
                Motion::Transit {
                    start: (-30.0 + offset.0, -15.0 + offset.1),
                    heading_deg: 90.0,
                    speed_kms: 0.12,
                    wrap_km: 60.0,
                },
                9_000.0 + 100.0 * i as f64,
            ));
        }
        for (hex, callsign, lag_km, altitude_ft) in
            [("5b0020", "LEAD20", 0.0, 7_000.0), ("5b0021", "CHAS21", 2.5, 8_500.0)]
        {
            actors.push(Actor::new(
                hex,
                callsign,
                Motion::Transit {
                    start: (25.0, -40.0 - lag_km),
                    heading_deg: 0.0,
                    speed_kms: 0.1,
                    wrap_km: 80.0,
                },
                altitude_ft,
            ));
        }
        let mut emergency = Actor::new(
            "5b0030",
            "EMER30",
            Motion::Transit {
                start: (40.0, 25.0),
                heading_deg: 270.0,
                speed_kms: 0.13,
                wrap_km: 80.0,
            },
            11_000.0,
        );
        emergency.squawk_from = Some(config.emergency_after_steps);
        actors.push(emergency);

        for i in 0..config.background {
            let start_xy = (rng.gen_range(-60.0..60.0), rng.gen_range(-60.0..60.0));
            actors.push(Actor::new(
                &format!("4b1{:03x}", i),
                &format!("BKG{:03}", i),
                Motion::Transit {
                    start: start_xy,
                    heading_deg: rng.gen_range(0.0..360.0),
                    speed_kms: rng.gen_range(0.12..0.24),
                    wrap_km: 120.0,
                },
                rng.gen_range(15_000.0..39_000.0_f64).round(),
            ));
        }

        Self {
            frame: LocalFrame::new(GeoPoint::new(config.center_lat, config.center_lon)),
            start,
            step_s: config.step_s,
            actors,
            clock: Mutex::new(Clock {
                now: start,
                step: 0,
            }),
        }
    }

    fn clock_guard(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot at the current simulated time, then advances the clock.
    pub fn next_snapshot(&self) -> Vec<StateVector> {
        let mut clock = self.clock_guard();
        let now = clock.now;
        let elapsed = now - self.start;
        let snapshot = self
            .actors
            .iter()
            .map(|actor| {
                let k = actor.motion.at(elapsed);
                let position = self.frame.unproject(k.x, k.y);
                let mut sample = StateVector::new(actor.hex.as_str(), now, position.lat, position.lon)
                    .with_callsign(&actor.callsign)
                    .with_altitude(actor.altitude_ft)
                    .with_ground_speed((k.speed_kms * KMS_TO_KT).round())
                    .with_track(k.heading_deg)
                    .with_vertical_rate(0.0);
                if actor.squawk_from.map_or(false, |from| clock.step >= from) {
                    sample = sample.with_squawk("7700");
                }
                sample
            })
            .collect();
        clock.now += self.step_s;
        clock.step += 1;
        snapshot
    }
}

impl Feed for SyntheticFeed {
    type Query = ScenarioQuery;

    fn queries(&self) -> Vec<ScenarioQuery> {
        vec![ScenarioQuery]
    }

    fn clock(&self) -> f64 {
        self.clock_guard().now
    }

    fn fetch(
        &self,
        _query: &ScenarioQuery,
    ) -> impl Future<Output = Result<Vec<StateVector>, FetchError>> + Send {
        let snapshot = self.next_snapshot();
        async move { Ok(snapshot) }
    }
}
