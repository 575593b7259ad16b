use crate::prelude::{unix_now, CoreError, CoreResult};
use log::debug;
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

const LOCK_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Shared by every process that talks to the same upstream.
    pub lock_path: PathBuf,
    pub min_interval_s: f64,
    pub lock_timeout_s: f64,
    /// Upper bound on lock wait plus interval wait for one acquisition.
    pub max_wait_s: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            lock_path: PathBuf::from("/tmp/adsbfi_api.lock"),
            min_interval_s: 1.05,
            lock_timeout_s: 10.0,
            max_wait_s: 15.0,
        }
    }
}

/// Cross-process throttle: at most one upstream call per `min_interval`.
///
/// The lock file holds the UNIX time of the last granted call and is guarded
/// by an advisory `flock`. Blocking; call from a blocking-capable thread.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Waits for the next slot and records it; returns the total time waited.
    pub fn acquire(&self) -> CoreResult<Duration> {
        let started = Instant::now();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.config.lock_path)?;
        let mut lock = self.lock(file, started)?;

        let last_call = read_last_call(&mut lock)?;
        let remaining = remaining_wait(last_call, unix_now(), secs(self.config.min_interval_s));
        let waited = started.elapsed();
        if waited + remaining > secs(self.config.max_wait_s) {
            return Err(CoreError::RateLimitUnavailable {
                waited: waited + remaining,
            });
        }
        if !remaining.is_zero() {
            debug!("rate limit: sleeping {:?} before next call", remaining);
            thread::sleep(remaining);
        }

        lock.set_len(0)?;
        lock.seek(SeekFrom::Start(0))?;
        write!(lock, "{:.6}", unix_now())?;
        lock.flush()?;
        drop(lock);
        Ok(started.elapsed())
    }

    fn lock(&self, mut file: File, started: Instant) -> CoreResult<Flock<File>> {
        let timeout = secs(self.config.lock_timeout_s);
        loop {
            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(lock) => return Ok(lock),
                Err((returned, Errno::EAGAIN | Errno::EINTR)) => {
                    if started.elapsed() >= timeout {
                        return Err(CoreError::RateLimitUnavailable {
                            waited: started.elapsed(),
                        });
                    }
                    file = returned;
                    thread::sleep(LOCK_POLL);
                }
                Err((_, errno)) => return Err(CoreError::Io(io::Error::from(errno))),
            }
        }
    }
}

/// Empty or unparsable contents mean no call was ever recorded.
fn read_last_call(file: &mut File) -> io::Result<Option<f64>> {
    let mut contents = String::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_string(&mut contents)?;
    Ok(contents
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite()))
}

/// A last-call time in the future (clock skew) costs a full interval.
fn remaining_wait(last_call: Option<f64>, now: f64, interval: Duration) -> Duration {
    let Some(last_call) = last_call else {
        return Duration::ZERO;
    };
    let elapsed = now - last_call;
    if elapsed < 0.0 {
        return interval;
    }
    interval.saturating_sub(secs(elapsed))
}

pub(crate) fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
