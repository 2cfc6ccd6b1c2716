//! # Playback Session Core
//!
//! Session lifecycle, render-target brokering and the media byte cache.
//!
//! ## Overview
//!
//! This crate handles:
//! - Video and audio playback sessions driving host media engines
//! - A broker for the shared background container and its render targets
//! - A bounded, disk-backed LRU cache consulted by every engine fetch
//! - A registry that serializes all of the above on one owner thread
//!
//! ```text
//! caller ──> SessionRegistry ──(owner thread)──> Session ──> MediaEngine
//!                                                   │            │
//!                                                   ▼            ▼
//!                                      RenderTargetBroker   CacheDataSourceFactory
//!                                                   │            │
//!                                                   ▼            ▼
//!                                              WindowHost   CacheStore / HttpClient
//! ```

pub mod broker;
pub mod cache;
pub mod error;
pub mod ids;
pub mod registry;
pub mod session;
pub mod source;

pub use broker::{
    AttachOutcome, BindCancelled, BindTicket, DetachOutcome, Readiness, RenderTargetBroker,
    TargetInfo, CONTAINER_Z_ORDER,
};
pub use cache::{CacheConfig, CacheKey, CachePolicy, CacheStats, CacheStore};
pub use error::{PlaybackError, Result};
pub use ids::{RenderTargetId, SessionId};
pub use registry::{RegistryDeps, SessionRegistry};
pub use session::{SessionInfo, SessionKind, SessionState};
pub use source::{CacheDataSourceFactory, MediaRequest};
