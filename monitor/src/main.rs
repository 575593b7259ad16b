use anyhow::Context;
use clap::Parser;
use generator::ScenarioConfig;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::MonitorConfig;
use workflow::runner::Runner;

mod bridge;
mod feed;
mod generator;
mod sink;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "ADS-B airspace anomaly monitor")]
struct Args {
    /// Load a monitor config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// GeoJSON file with monitoring areas (unrestricted when absent)
    #[arg(long)]
    areas: Option<PathBuf>,
    /// Poll interval in seconds
    #[arg(long)]
    interval: Option<f64>,
    /// Run a single cycle, print its summary and exit
    #[arg(long, default_value_t = false)]
    once: bool,
    /// Replace the live feed with the deterministic synthetic scenario
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    #[arg(long)]
    seed: Option<u64>,
    /// Append emitted events as JSON lines
    #[arg(long)]
    events_out: Option<PathBuf>,
    /// Expose /events and /status over HTTP
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long)]
    port: Option<u16>,
}

impl Args {
    fn apply(&self, config: &mut MonitorConfig) {
        if let Some(areas) = &self.areas {
            config.areas_file = Some(areas.clone());
        }
        if let Some(interval) = self.interval {
            config.detection.ingest.poll_interval_s = interval;
        }
        if self.synthetic || self.seed.is_some() {
            let scenario = config.synthetic.get_or_insert_with(ScenarioConfig::default);
            if let Some(seed) = self.seed {
                scenario.seed = seed;
            }
        }
        if let Some(path) = &self.events_out {
            config.events_out = Some(path.clone());
        }
        if self.serve {
            config.bridge.enabled = true;
        }
        if let Some(port) = self.port {
            config.bridge.port = port;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = &args.config {
        MonitorConfig::load(path)?
    } else {
        MonitorConfig::default()
    };
    args.apply(&mut config);
    config.validate().context("validating monitor configuration")?;

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating monitor runtime")?;
    runtime.block_on(Runner::new(config).run(args.once))
}
