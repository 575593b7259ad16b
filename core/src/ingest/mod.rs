pub mod cycle;
pub mod dedup;
pub mod rate_limit;

pub use cycle::{CycleReport, CycleState, IngestConfig, IngestionLoop};
pub use dedup::{DedupConfig, DedupWindow};
pub use rate_limit::{RateLimitConfig, RateLimiter};
