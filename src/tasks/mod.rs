//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Feed refresh: re-runs the refresh pipeline at the configured interval

mod refresh;

pub use refresh::{spawn_refresh_task, MIN_REFRESH_INTERVAL};
