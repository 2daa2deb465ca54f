//! Fetch Module
//!
//! Bounded, dedup-guarded execution of named fetch operations with plain,
//! progressive and batch variants.

mod batch;
mod coordinator;
mod handle;

pub use batch::{sub_fetch, BatchHandle, BatchResult, SubFetch};
pub use coordinator::FetchCoordinator;
pub use handle::{FetchHandle, ProgressHandle, ProgressSender};
pub use tokio_util::sync::CancellationToken;
