use flightcore::ingest::CycleReport;
use flightcore::telemetry::LogManager;
use flightcore::{CoreError, CoreResult, Event, EventSink};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes every event to the log at info level.
pub struct LogSink {
    log: LogManager,
}

impl LogSink {
    pub fn new() -> Self {
        Self {
            log: LogManager::with_target("monitor::events"),
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogSink {
    fn deliver(&mut self, events: &[Event]) -> CoreResult<()> {
        for event in events {
            self.log.record_event(event);
        }
        Ok(())
    }
}

/// Appends one JSON object per event to a file.
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn open<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlSink {
    fn deliver(&mut self, events: &[Event]) -> CoreResult<()> {
        for event in events {
            serde_json::to_writer(&mut self.writer, event)
                .map_err(|e| CoreError::Sink(format!("encoding event for {}: {}", self.path.display(), e)))?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Hands every batch to each inner sink; the first failure is reported after all have run.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn EventSink + Send>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: EventSink + Send + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn deliver(&mut self, events: &[Event]) -> CoreResult<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(err) = sink.deliver(events) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn cycle_finished(&mut self, report: &CycleReport) {
        for sink in &mut self.sinks {
            sink.cycle_finished(report);
        }
    }
}
