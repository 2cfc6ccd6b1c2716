//! # Host Bridge Traits
//!
//! Contracts between the signage playback core and the host it runs on.
//!
//! ## Overview
//!
//! The core owns session lifecycle, render-target brokering and the content
//! cache. Everything that touches real hardware or the network is a host
//! collaborator, expressed here as a trait and injected at bootstrap:
//!
//! ### Playback
//! - [`MediaEngineFactory`](media::MediaEngineFactory) / [`MediaEngine`](media::MediaEngine) - decode, demux and render
//! - [`EngineListener`](media::EngineListener) - engine state notifications
//! - [`DataSourceFactory`](media::DataSourceFactory) - byte source handed to the engine
//!
//! ### Windowing
//! - [`WindowHost`](surface::WindowHost) - container and surface creation
//! - [`SurfaceListener`](surface::SurfaceListener) - asynchronous surface readiness
//!
//! ### Networking & Storage
//! - [`HttpClient`](http::HttpClient) - upstream media fetches
//! - [`StorageProbe`](storage::StorageProbe) - usable disk space for cache sizing
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core refuses to start when a required capability is missing:
//!
//! ```ignore
//! let window_host = builder.window_host
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "WindowHost".to_string(),
//!         message: "No windowing adapter provided. \
//!                  Desktop: enable the desktop-shims feature.".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! Every trait except [`MediaEngine`](media::MediaEngine) is `Send + Sync`.
//! Engines are created and driven on the owner thread only; their listeners
//! may fire from any thread.

pub mod error;
pub mod http;
pub mod logging;
pub mod media;
pub mod storage;
pub mod surface;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{LogEntry, LogLevel, LoggerSink, StderrLogger};
pub use media::{
    ContentType, DataSourceFactory, DataSpec, EngineListener, EngineState, MediaEngine,
    MediaEngineFactory, MediaSource,
};
pub use storage::{StorageProbe, StorageSpace};
pub use surface::{ContainerHandle, SurfaceHandle, SurfaceListener, WindowHost};
