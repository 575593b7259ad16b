use anyhow::Context;
use flightcore::ingest::CycleReport;
use flightcore::telemetry::{MetricsRecorder, MetricsSnapshot};
use flightcore::{CoreResult, Event, EventSink};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use warp::{Filter, Rejection, Reply};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub enabled: bool,
    pub port: u16,
    /// Events kept for `/events`.
    pub history: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9000,
            history: 200,
        }
    }
}

/// What the read-only HTTP routes expose.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusModel {
    pub events: VecDeque<Event>,
    pub last_cycle: Option<CycleReport>,
}

/// Shared view behind `/events` and `/status`.
#[derive(Clone)]
pub struct StatusBridge {
    state: Arc<RwLock<StatusModel>>,
    metrics: Arc<MetricsRecorder>,
    history: usize,
}

impl StatusBridge {
    pub fn new(metrics: Arc<MetricsRecorder>, history: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(StatusModel::default())),
            metrics,
            history: history.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StatusModel> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StatusModel> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn publish(&self, events: &[Event]) {
        let mut model = self.write();
        model.events.extend(events.iter().cloned());
        while model.events.len() > self.history {
            model.events.pop_front();
        }
    }

    pub fn publish_cycle(&self, report: &CycleReport) {
        self.write().last_cycle = Some(report.clone());
    }

    pub fn recent_events(&self) -> Vec<Event> {
        self.read().events.iter().cloned().collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let events_bridge = self.clone();
        let events = warp::path("events")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || warp::reply::json(&events_bridge.recent_events()));

        let status_bridge = self.clone();
        let status = warp::path("status")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || {
                let model = status_bridge.read();
                warp::reply::json(&json!({
                    "last_cycle": model.last_cycle,
                    "buffered_events": model.events.len(),
                    "metrics": status_bridge.metrics(),
                }))
            });

        events.or(status)
    }

    /// Binds on localhost and serves on the current runtime.
    pub fn serve(&self, port: u16) -> anyhow::Result<SocketAddr> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let (bound, server) = warp::serve(self.routes())
            .try_bind_ephemeral(addr)
            .with_context(|| format!("binding status bridge on {}", addr))?;
        tokio::spawn(server);
        info!("status bridge listening on http://{}", bound);
        Ok(bound)
    }

    pub fn sink(&self) -> BridgeSink {
        BridgeSink {
            bridge: self.clone(),
        }
    }
}

/// Event sink feeding a [`StatusBridge`].
pub struct BridgeSink {
    bridge: StatusBridge,
}

impl EventSink for BridgeSink {
    fn deliver(&mut self, events: &[Event]) -> CoreResult<()> {
        self.bridge.publish(events);
        Ok(())
    }

    fn cycle_finished(&mut self, report: &CycleReport) {
        self.bridge.publish_cycle(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightcore::math::GeoPoint;
    use flightcore::model::Geometry;
    use flightcore::EventKind;

    fn mil(hex: &str) -> Event {
        Event::new(
            EventKind::Military,
            vec![hex.to_string()],
            10.0,
            Geometry::point(GeoPoint::new(41.0, 12.0)),
        )
    }

    #[test]
    fn history_is_bounded_newest_last() {
        let bridge = StatusBridge::new(Arc::new(MetricsRecorder::new()), 2);
        let mut sink = bridge.sink();
        sink.deliver(&[mil("a1"), mil("b2"), mil("c3")]).unwrap();
        let hexes: Vec<String> = bridge
            .recent_events()
            .into_iter()
            .map(|e| e.hexes[0].clone())
            .collect();
        assert_eq!(hexes, vec!["b2", "c3"]);
    }

    #[tokio::test]
    async fn routes_serve_events_and_status() {
        let metrics = Arc::new(MetricsRecorder::new());
        metrics.record_cycle(true);
        let bridge = StatusBridge::new(metrics, 10);
        let mut sink = bridge.sink();
        sink.deliver(&[mil("ae0001")]).unwrap();
        sink.cycle_finished(&CycleReport {
            received: 7,
            ..CycleReport::default()
        });
        let routes = bridge.routes();

        let events = warp::test::request()
            .method("GET")
            .path("/events")
            .reply(&routes)
            .await;
        assert_eq!(events.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(events.body()).unwrap();
        assert_eq!(body[0]["subtype"], "MIL");

        let status = warp::test::request()
            .method("GET")
            .path("/status")
            .reply(&routes)
            .await;
        let body: serde_json::Value = serde_json::from_slice(status.body()).unwrap();
        assert_eq!(body["metrics"]["cycles"], 1);
        assert_eq!(body["last_cycle"]["received"], 7);
        assert_eq!(body["buffered_events"], 1);
    }
}
