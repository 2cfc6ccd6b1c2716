//! Synchronization primitives.
//!
//! Owner-thread jobs are delivered over [`mpsc`], and results and surface
//! bindings come back over [`oneshot`].

pub use tokio::sync::{mpsc, oneshot};
