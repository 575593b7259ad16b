use crate::math::geodesy::angle_diff_deg;
use crate::math::{BoundingBox, GeoPoint, StatsHelper};
use crate::model::{Event, EventKind, Geometry, ProximityKind, StateVector};
use crate::track::Track;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Latest positions older than this (relative to the cycle) are ignored.
    pub max_position_age_s: f64,
    pub cluster_distance_km: f64,
    pub cluster_altitude_ft: f64,
    pub follow_distance_km: f64,
    pub cone_deg: f64,
    pub min_duration_s: f64,
    pub min_samples: usize,
    /// Allowed growth of the separation over a pursuit, as a fraction of the start.
    pub max_divergence_ratio: f64,
    pub lookback_s: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            max_position_age_s: 120.0,
            cluster_distance_km: 3.0,
            cluster_altitude_ft: 500.0,
            follow_distance_km: 5.0,
            cone_deg: 20.0,
            min_duration_s: 120.0,
            min_samples: 3,
            max_divergence_ratio: 0.2,
            lookback_s: 600.0,
        }
    }
}

/// Multi-aircraft relations over one snapshot of live tracks.
pub struct ProximityDetector {
    config: ProximityConfig,
}

struct Participant<'a> {
    track: &'a Track,
    latest: &'a StateVector,
}

/// One qualifying instant of a pursuit.
struct Contact {
    t: f64,
    distance_km: f64,
    cone_offset_deg: f64,
}

impl ProximityDetector {
    pub fn new(config: ProximityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    pub fn detect(&self, tracks: &[&Track], now: f64) -> Vec<Event> {
        let participants = self.participants(tracks, now);
        let mut events = self.clusters(&participants);
        events.extend(self.pursuits(&participants));
        events
    }

    fn participants<'a>(&self, tracks: &[&'a Track], now: f64) -> Vec<Participant<'a>> {
        tracks
            .iter()
            .filter_map(|&track| {
                let latest = track.latest()?;
                let fresh = now - latest.timestamp <= self.config.max_position_age_s;
                (fresh && !latest.is_on_ground()).then_some(Participant { track, latest })
            })
            .collect()
    }

    fn clusters(&self, participants: &[Participant<'_>]) -> Vec<Event> {
        let n = participants.len();
        let mut sets = DisjointSets::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                if self.close(participants[i].latest, participants[j].latest) {
                    sets.union(i, j);
                }
            }
        }

        let mut events = Vec::new();
        for members in sets.groups().into_iter().filter(|g| g.len() >= 2) {
            let samples: Vec<&StateVector> = members.iter().map(|&i| participants[i].latest).collect();
            let positions: Vec<GeoPoint> = samples.iter().map(|s| s.position()).collect();
            let mut max_distance_km: f64 = 0.0;
            for (k, a) in positions.iter().enumerate() {
                for b in &positions[k + 1..] {
                    max_distance_km = max_distance_km.max(a.distance_km(b));
                }
            }
            let altitudes: Vec<f64> = samples.iter().filter_map(|s| s.altitude_ft).collect();
            let spread_ft = altitudes.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                - altitudes.iter().cloned().fold(f64::INFINITY, f64::min);

            let mut hexes: Vec<String> = samples.iter().map(|s| s.hex.clone()).collect();
            hexes.sort();
            let timestamp = samples
                .iter()
                .map(|s| s.timestamp)
                .fold(f64::NEG_INFINITY, f64::max);
            let event = Event::new(
                EventKind::Proximity(ProximityKind::Cluster),
                hexes,
                timestamp,
                group_geometry(&positions),
            )
            .with_evidence("members", members.len())
            .with_evidence("max_distance_km", max_distance_km)
            .with_evidence("max_altitude_spread_ft", spread_ft);
            events.push(event);
        }
        events
    }

    fn close(&self, a: &StateVector, b: &StateVector) -> bool {
        let (Some(alt_a), Some(alt_b)) = (a.altitude_ft, b.altitude_ft) else {
            return false;
        };
        (alt_a - alt_b).abs() <= self.config.cluster_altitude_ft
            && a.position().distance_km(&b.position()) <= self.config.cluster_distance_km
    }

    fn pursuits(&self, participants: &[Participant<'_>]) -> Vec<Event> {
        let mut events = Vec::new();
        for trailing in participants {
            for leading in participants {
                if trailing.track.hex() == leading.track.hex() {
                    continue;
                }
                let separation = trailing.latest.position().distance_km(&leading.latest.position());
                if separation > self.config.follow_distance_km {
                    continue;
                }
                if let Some(event) = self.pursuit(trailing, leading) {
                    events.push(event);
                }
            }
        }
        events
    }

    /// Trailing run of instants where `trailing` flies toward `leading` inside the cone.
    fn pursuit(&self, trailing: &Participant<'_>, leading: &Participant<'_>) -> Option<Event> {
        let cfg = &self.config;
        let start = trailing.latest.timestamp - cfg.lookback_s;
        let pursuer: Vec<&StateVector> = trailing.track.since(start).collect();
        let leader: Vec<&StateVector> = leading.track.samples().collect();

        let (leader_first, leader_last) = (leader.first()?.timestamp, leader.last()?.timestamp);

        let mut run: Vec<Contact> = Vec::new();
        for (i, sample) in pursuer.iter().enumerate() {
            // Instants the leader was not observed neither extend nor break the run.
            if sample.timestamp < leader_first || sample.timestamp > leader_last {
                continue;
            }
            let contact = interpolate(&leader, sample.timestamp).and_then(|(position, leader_heading)| {
                let here = sample.position();
                let heading = heading_at(&pursuer, i)?;
                let bearing = here.bearing_deg(&position)?;
                let distance_km = here.distance_km(&position);
                let cone_offset_deg = angle_diff_deg(heading, bearing);
                let aligned = leader_heading
                    .map_or(true, |h| angle_diff_deg(h, heading) <= cfg.cone_deg);
                (distance_km <= cfg.follow_distance_km && cone_offset_deg <= cfg.cone_deg && aligned)
                    .then_some(Contact {
                        t: sample.timestamp,
                        distance_km,
                        cone_offset_deg,
                    })
            });
            match contact {
                Some(contact) => run.push(contact),
                None => run.clear(),
            }
        }

        let (first, last) = (run.first()?, run.last()?);
        let duration_s = last.t - first.t;
        if run.len() < cfg.min_samples || duration_s < cfg.min_duration_s {
            return None;
        }
        if last.distance_km > first.distance_km * (1.0 + cfg.max_divergence_ratio) {
            return None;
        }
        let distances: Vec<f64> = run.iter().map(|c| c.distance_km).collect();
        let offsets: Vec<f64> = run.iter().map(|c| c.cone_offset_deg).collect();

        let mut hexes = vec![trailing.track.hex().to_string(), leading.track.hex().to_string()];
        hexes.sort();
        let positions = [trailing.latest.position(), leading.latest.position()];
        let event = Event::new(
            EventKind::Proximity(ProximityKind::Pursuit),
            hexes,
            trailing.latest.timestamp.max(leading.latest.timestamp),
            group_geometry(&positions),
        )
        .with_evidence("pursuer", trailing.track.hex())
        .with_evidence("leader", leading.track.hex())
        .with_evidence("duration_s", duration_s)
        .with_evidence("samples", run.len())
        .with_evidence("start_distance_km", first.distance_km)
        .with_evidence("end_distance_km", last.distance_km)
        .with_evidence("mean_distance_km", StatsHelper::mean(&distances))
        .with_evidence(
            "closing_rate_kmh",
            (first.distance_km - last.distance_km) / duration_s * 3600.0,
        )
        .with_evidence("mean_cone_offset_deg", StatsHelper::mean(&offsets));
        Some(event)
    }
}

/// Position and course of `samples` at `t`, only inside their observed span.
fn interpolate(samples: &[&StateVector], t: f64) -> Option<(GeoPoint, Option<f64>)> {
    let idx = samples.partition_point(|s| s.timestamp < t);
    let after = samples.get(idx)?;
    if after.timestamp == t {
        return Some((after.position(), heading_at(samples, idx)));
    }
    let before = samples.get(idx.checked_sub(1)?)?;
    let fraction = (t - before.timestamp) / (after.timestamp - before.timestamp);
    let position = before.position().lerp(&after.position(), fraction);
    let heading = after
        .track_deg
        .or_else(|| before.position().bearing_deg(&after.position()));
    Some((position, heading))
}

/// Reported track, else the course flown into (or out of) sample `i`.
fn heading_at(samples: &[&StateVector], i: usize) -> Option<f64> {
    let sample = samples.get(i)?;
    if let Some(track) = sample.track_deg {
        return Some(track);
    }
    let previous = i.checked_sub(1).and_then(|p| samples.get(p));
    match previous {
        Some(prev) => prev.position().bearing_deg(&sample.position()),
        None => samples
            .get(i + 1)
            .and_then(|next| sample.position().bearing_deg(&next.position())),
    }
}

fn group_geometry(positions: &[GeoPoint]) -> Geometry {
    let n = positions.len().max(1) as f64;
    let centroid = GeoPoint::new(
        positions.iter().map(|p| p.lat).sum::<f64>() / n,
        positions.iter().map(|p| p.lon).sum::<f64>() / n,
    );
    Geometry {
        centroid,
        bbox: BoundingBox::from_points(positions),
        radius_km: None,
    }
}

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }

    /// Members of each set, in index order.
    fn groups(&mut self) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut slot = vec![usize::MAX; self.parent.len()];
        for i in 0..self.parent.len() {
            let root = self.find(i);
            if slot[root] == usize::MAX {
                slot[root] = groups.len();
                groups.push(Vec::new());
            }
            groups[slot[root]].push(i);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::LocalFrame;
    use crate::track::TrackConfig;

    const NOW: f64 = 10_000.0;

    fn frame() -> LocalFrame {
        LocalFrame::new(GeoPoint::new(44.0, 11.0))
    }

    fn at(hex: &str, t: f64, x: f64, y: f64, alt: f64) -> StateVector {
        let p = frame().unproject(x, y);
        StateVector::new(hex, t, p.lat, p.lon)
            .with_altitude(alt)
            .with_ground_speed(200.0)
    }

    fn single(sample: StateVector) -> Track {
        Track::from_samples(sample.hex.clone(), [sample], &TrackConfig::default())
    }

    /// Northbound at ~0.1 km/s from `y0`, sampled every 20 s up to `NOW`.
    fn northbound(hex: &str, x: f64, y0: f64, from: f64) -> Track {
        northbound_at(hex, x, y0, 0.1, from)
    }

    fn northbound_at(hex: &str, x: f64, y0: f64, km_per_s: f64, from: f64) -> Track {
        let samples = (0..=10)
            .map(|k| NOW - 200.0 + 20.0 * k as f64)
            .filter(|t| *t >= from)
            .map(|t| {
                let elapsed = t - (NOW - 200.0);
                at(hex, t, x, y0 + km_per_s * elapsed, 5000.0).with_track(0.0)
            });
        Track::from_samples(hex, samples, &TrackConfig::default())
    }

    fn pursuits_of(detector: &ProximityDetector, tracks: &[Track]) -> Vec<Event> {
        let refs: Vec<&Track> = tracks.iter().collect();
        let participants = detector.participants(&refs, NOW);
        detector.pursuits(&participants)
    }

    #[test]
    fn three_close_aircraft_form_one_cluster() {
        let tracks = [
            single(at("c3", NOW, 0.0, 0.0, 5000.0)),
            single(at("a1", NOW, 1.0, 0.0, 5200.0)),
            single(at("b2", NOW, 0.5, 1.0, 4900.0)),
            single(at("d4", NOW, 30.0, 30.0, 5000.0)),
        ];
        let refs: Vec<&Track> = tracks.iter().collect();
        let detector = ProximityDetector::new(ProximityConfig::default());
        let events = detector.detect(&refs, NOW);
        let clusters: Vec<&Event> = events
            .iter()
            .filter(|e| e.kind == EventKind::Proximity(ProximityKind::Cluster))
            .collect();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].hexes, vec!["a1", "b2", "c3"]);
        assert_eq!(clusters[0].evidence["members"], 3);
        assert!(clusters[0].geometry.bbox.is_some());
    }

    #[test]
    fn vertical_separation_or_unknown_altitude_breaks_cluster() {
        let p = frame().unproject(0.5, 0.0);
        let no_alt = StateVector::new("b2", NOW, p.lat, p.lon).with_ground_speed(200.0);
        let tracks = [
            single(at("a1", NOW, 0.0, 0.0, 5000.0)),
            single(no_alt),
            single(at("c3", NOW, 1.0, 0.0, 9000.0)),
        ];
        let refs: Vec<&Track> = tracks.iter().collect();
        let detector = ProximityDetector::new(ProximityConfig::default());
        assert!(detector.clusters(&detector.participants(&refs, NOW)).is_empty());
    }

    #[test]
    fn stale_and_grounded_aircraft_do_not_participate() {
        let grounded = at("b2", NOW, 0.5, 0.0, 0.0);
        let tracks = [
            single(at("a1", NOW, 0.0, 0.0, 5000.0)),
            single(grounded),
            single(at("c3", NOW - 600.0, 1.0, 0.0, 5000.0)),
        ];
        let refs: Vec<&Track> = tracks.iter().collect();
        let detector = ProximityDetector::new(ProximityConfig::default());
        assert!(detector.detect(&refs, NOW).is_empty());
    }

    #[test]
    fn trailing_aircraft_is_flagged_as_pursuit() {
        let tracks = [
            northbound("aa0001", 0.0, 0.0, 0.0),
            northbound("bb0002", 0.0, 2.0, 0.0),
        ];
        let refs: Vec<&Track> = tracks.iter().collect();
        let detector = ProximityDetector::new(ProximityConfig::default());
        let pursuits: Vec<Event> = detector
            .detect(&refs, NOW)
            .into_iter()
            .filter(|e| e.kind == EventKind::Proximity(ProximityKind::Pursuit))
            .collect();
        assert_eq!(pursuits.len(), 1);
        let event = &pursuits[0];
        assert_eq!(event.hexes, vec!["aa0001", "bb0002"]);
        assert_eq!(event.evidence["pursuer"], "aa0001");
        assert!(event.evidence["duration_s"].as_f64().unwrap() >= 120.0);
        let start = event.evidence["start_distance_km"].as_f64().unwrap();
        assert!((start - 2.0).abs() < 0.05);
    }

    #[test]
    fn abreast_formation_is_not_a_pursuit() {
        let tracks = [
            northbound("aa0001", 0.0, 0.0, 0.0),
            northbound("bb0002", 2.0, 0.0, 0.0),
        ];
        let refs: Vec<&Track> = tracks.iter().collect();
        let detector = ProximityDetector::new(ProximityConfig::default());
        let participants = detector.participants(&refs, NOW);
        assert!(detector.pursuits(&participants).is_empty());
    }

    #[test]
    fn leader_history_is_never_extrapolated() {
        let tracks = [
            northbound("aa0001", 0.0, 0.0, 0.0),
            northbound("bb0002", 0.0, 2.0, NOW - 60.0),
        ];
        let refs: Vec<&Track> = tracks.iter().collect();
        let detector = ProximityDetector::new(ProximityConfig::default());
        let participants = detector.participants(&refs, NOW);
        assert!(detector.pursuits(&participants).is_empty());
    }

    #[test]
    fn pursuer_reporting_ahead_of_leader_is_still_flagged() {
        let leader = northbound("bb0002", 0.0, 2.0, 0.0);
        let ahead = northbound("aa0001", 0.0, 0.0, 0.0);
        let shifted = ahead.samples().map(|s| {
            let mut s = s.clone();
            s.timestamp += 5.0;
            s
        });
        let pursuer = Track::from_samples("aa0001", shifted, &TrackConfig::default());
        let detector = ProximityDetector::new(ProximityConfig::default());

        let pursuits = pursuits_of(&detector, &[pursuer, leader]);
        assert_eq!(pursuits.len(), 1);
        let event = &pursuits[0];
        assert_eq!(event.evidence["pursuer"], "aa0001");
        assert_eq!(event.evidence["samples"], 10);
        assert!(event.evidence["duration_s"].as_f64().unwrap() >= 120.0);
    }

    #[test]
    fn falling_behind_is_not_a_pursuit() {
        // Separation grows from 2 km to 3 km, still inside the follow distance.
        let tracks = [
            northbound("aa0001", 0.0, 0.0, 0.0),
            northbound_at("bb0002", 0.0, 2.0, 0.105, 0.0),
        ];
        let strict = ProximityDetector::new(ProximityConfig::default());
        assert!(pursuits_of(&strict, &tracks).is_empty());

        let lenient = ProximityDetector::new(ProximityConfig {
            max_divergence_ratio: 0.6,
            ..ProximityConfig::default()
        });
        let pursuits = pursuits_of(&lenient, &tracks);
        assert_eq!(pursuits.len(), 1);
        let end = pursuits[0].evidence["end_distance_km"].as_f64().unwrap();
        assert!((end - 3.0).abs() < 0.05);
    }
}
