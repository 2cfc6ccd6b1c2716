//! Media Engine Abstraction
//!
//! The decode/demux/network-fetch engine is a host collaborator. The core
//! configures it (content type, source, volume, video surface) and drives it
//! through play/pause/stop/prepare; the engine reports state changes back
//! through an [`EngineListener`].
//!
//! Engines are created and driven on the owner thread only, so
//! [`MediaEngine`] is deliberately not `Send`. Listeners on the other hand may
//! be invoked from any engine-internal thread.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::surface::SurfaceHandle;

/// Content-type metadata the engine uses for audio focus and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Music,
}

/// Coarse playback state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// No source prepared (initial state, or after `stop`).
    Idle,
    /// Source prepared, waiting for enough data.
    Buffering,
    /// Able to render immediately.
    Ready,
    /// Reached the natural end of the stream.
    Ended,
}

/// One byte-range read requested by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSpec {
    pub url: String,
    pub offset: u64,
    /// `None` reads to the end of the resource.
    pub length: Option<u64>,
}

impl DataSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            offset: 0,
            length: None,
        }
    }

    pub fn with_range(mut self, offset: u64, length: Option<u64>) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }
}

/// Supplies media bytes to the engine.
///
/// The core hands the engine a cache-backed factory; engines call
/// [`open`](Self::open) for each range they need.
#[async_trait]
pub trait DataSourceFactory: Send + Sync {
    async fn open(&self, spec: DataSpec) -> Result<Bytes>;
}

/// A source to load into the engine, built fresh for every `play()`.
#[derive(Clone)]
pub struct MediaSource {
    pub url: String,
    pub data_source: Arc<dyn DataSourceFactory>,
}

impl MediaSource {
    pub fn new(url: impl Into<String>, data_source: Arc<dyn DataSourceFactory>) -> Self {
        Self {
            url: url.into(),
            data_source,
        }
    }
}

impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSource")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Receives engine notifications. May be called from any thread.
pub trait EngineListener: Send + Sync {
    fn on_state_changed(&self, state: EngineState);

    fn on_error(&self, message: String);
}

/// A single media engine instance.
///
/// Every method is synchronous from the caller's point of view; `prepare`
/// only starts loading and completion is reported through the listener.
pub trait MediaEngine {
    fn set_content_type(&mut self, content_type: ContentType) -> Result<()>;

    /// Replace the current source. The engine must be stopped first.
    fn set_source(&mut self, source: MediaSource) -> Result<()>;

    fn prepare(&mut self) -> Result<()>;

    /// Start playback, or request autoplay if the source is still loading.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Stop playback and release the current source. The engine returns to
    /// [`EngineState::Idle`].
    fn stop(&mut self) -> Result<()>;

    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Bind (or with `None`, clear) the surface video frames are painted to.
    fn set_video_surface(&mut self, surface: Option<SurfaceHandle>) -> Result<()>;

    fn state(&self) -> EngineState;

    /// Free decoder resources. Called exactly once per engine.
    fn release(&mut self);
}

/// Creates engines on the owner thread.
pub trait MediaEngineFactory: Send + Sync {
    fn create_engine(&self, listener: Arc<dyn EngineListener>) -> Result<Box<dyn MediaEngine>>;
}
