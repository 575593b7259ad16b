pub mod store;
pub mod window;

pub use store::{Track, TrackConfig, TrackStore, UpdateOutcome};
pub use window::{PushOutcome, SampleWindow};
