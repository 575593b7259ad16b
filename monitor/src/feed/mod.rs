pub mod adsbfi;
pub mod model;

pub use adsbfi::{AdsbfiFeed, FeedConfig, FeedQuery, Tile};
