//! Refresh module
//!
//! Ties the coordinator, the cache and an episode source together.

pub mod pipeline;
pub mod source;

pub use pipeline::{RefreshPipeline, RefreshReport, REFRESH_KEY};
pub use source::{EpisodeSource, HttpEpisodeSource};
