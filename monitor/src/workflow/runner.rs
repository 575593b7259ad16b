use crate::bridge::StatusBridge;
use crate::feed::AdsbfiFeed;
use crate::generator::SyntheticFeed;
use crate::sink::{FanoutSink, JsonlSink, LogSink};
use crate::workflow::config::MonitorConfig;
use anyhow::Context;
use flightcore::geo::{load_areas, GeoFence};
use flightcore::ingest::IngestionLoop;
use flightcore::telemetry::MetricsRecorder;
use flightcore::Feed;
use log::{info, warn};
use std::sync::Arc;
use tokio::signal;

/// Wires configuration, feed, sinks and the status bridge around the ingestion loop.
pub struct Runner {
    config: MonitorConfig,
}

impl Runner {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    pub fn fence(&self) -> anyhow::Result<GeoFence> {
        match &self.config.areas_file {
            Some(path) => {
                let areas = load_areas(path)
                    .with_context(|| format!("loading monitoring areas {}", path.display()))?;
                info!("loaded {} monitoring areas from {}", areas.len(), path.display());
                Ok(GeoFence::new(areas))
            }
            None => Ok(GeoFence::new(Vec::new())),
        }
    }

    pub fn sinks(&self, bridge: Option<&StatusBridge>) -> anyhow::Result<FanoutSink> {
        let mut sinks = FanoutSink::new();
        sinks.push(LogSink::new());
        if let Some(path) = &self.config.events_out {
            let jsonl = JsonlSink::open(path)
                .with_context(|| format!("opening event log {}", path.display()))?;
            sinks.push(jsonl);
        }
        if let Some(bridge) = bridge {
            sinks.push(bridge.sink());
        }
        Ok(sinks)
    }

    /// Runs one cycle when `once`, otherwise polls until Ctrl+C.
    pub async fn run(&self, once: bool) -> anyhow::Result<()> {
        let fence = self.fence()?;
        match &self.config.synthetic {
            Some(scenario) => {
                info!("using synthetic scenario (seed {})", scenario.seed);
                self.drive(SyntheticFeed::new(scenario), fence, once).await
            }
            None => {
                let feed = AdsbfiFeed::new(self.config.feed.clone()).context("building adsb.fi client")?;
                self.drive(feed, fence, once).await
            }
        }
    }

    async fn drive<F: Feed>(&self, feed: F, fence: GeoFence, once: bool) -> anyhow::Result<()> {
        let metrics = Arc::new(MetricsRecorder::new());
        let bridge = if self.config.bridge.enabled {
            let bridge = StatusBridge::new(Arc::clone(&metrics), self.config.bridge.history);
            bridge
                .serve(self.config.bridge.port)
                .context("starting status bridge")?;
            Some(bridge)
        } else {
            None
        };
        let sinks = self.sinks(bridge.as_ref())?;
        let mut engine = IngestionLoop::new(feed, sinks, fence, &self.config.detection)
            .context("initialising ingestion loop")?
            .with_metrics(metrics);

        if once {
            let report = engine.run_cycle().await;
            println!("{}", report.summary());
            if let Some(error) = &report.error {
                anyhow::bail!("single cycle failed: {}", error);
            }
            if bridge.is_some() {
                info!("status bridge running (Ctrl+C to stop)...");
                signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            }
        } else {
            info!(
                "polling every {}s (Ctrl+C to stop)",
                self.config.detection.ingest.poll_interval_s
            );
            engine.run_until(shutdown_signal()).await;
        }
        let totals = engine.metrics().snapshot();
        info!(
            "stopped after {} cycles ({} failed), {} events emitted",
            totals.cycles, totals.failed_cycles, totals.events_emitted
        );
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("cannot listen for Ctrl+C ({}), running until killed", err);
        std::future::pending::<()>().await;
    }
}
