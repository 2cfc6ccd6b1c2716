//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the playback crates:
//! - Logging and tracing infrastructure
//! - Configuration and capability injection
//! - Event bus for outward notifications
//!
//! ## Overview
//!
//! Nothing here knows about sessions or render targets. The crate fixes the
//! logging conventions, the shape of [`CoreConfig`](config::CoreConfig) and
//! the event types that `core-playback` publishes and `core-service` hands to
//! the transport.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
