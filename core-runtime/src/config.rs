//! # Core Configuration Module
//!
//! Configuration and capability injection for the signage playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder to assemble a [`CoreConfig`] that
//! holds every host bridge plus the tunable settings. Building fails fast when
//! a required bridge is missing, so a misconfigured player never starts half
//! way.
//!
//! ## Required Dependencies
//!
//! - `WindowHost` - container and surface creation
//! - `MediaEngineFactory` - media engine instances
//!
//! ## Dependencies with desktop defaults
//!
//! - `HttpClient` - upstream fetches (desktop default: reqwest)
//! - `StorageProbe` - usable disk space (desktop default: sysinfo)
//!
//! When the `desktop-shims` feature is enabled, the desktop defaults are
//! injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .cache_dir("/data/signage/media-cache")
//!     .window_host(Arc::new(MyWindowHost))
//!     .engine_factory(Arc::new(MyEngineFactory))
//!     .audio_default_volume(0.8)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No window host or engine factory: refuses to build.
//! let config = CoreConfig::builder()
//!     .cache_dir("/tmp/cache")
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, MediaEngineFactory, StorageProbe, WindowHost};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Share of the measured usable space the cache may claim.
pub const DEFAULT_CACHE_USABLE_FRACTION: f64 = 0.6;

/// Minimum cache capacity regardless of reported free space (2 GiB).
pub const DEFAULT_CACHE_FLOOR_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Video sessions start muted so several can run side by side.
pub const DEFAULT_VIDEO_VOLUME: f32 = 0.0;

pub const DEFAULT_AUDIO_VOLUME: f32 = 1.0;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

pub const DEFAULT_OWNER_THREAD_NAME: &str = "signage-owner";

/// Core configuration for the signage playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Directory holding cached media bytes and the cache index
    pub cache_dir: PathBuf,

    /// Fraction of usable space claimed by the cache, in `(0, 1]`
    pub cache_usable_fraction: f64,

    /// Capacity floor in bytes
    pub cache_floor_bytes: u64,

    /// Initial volume for video sessions created without an explicit volume
    pub video_default_volume: f32,

    /// Initial volume for audio sessions created without an explicit volume
    pub audio_default_volume: f32,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    /// Name given to the owner thread
    pub owner_thread_name: String,

    pub window_host: Arc<dyn WindowHost>,

    pub engine_factory: Arc<dyn MediaEngineFactory>,

    pub http_client: Arc<dyn HttpClient>,

    pub storage_probe: Arc<dyn StorageProbe>,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("cache_dir", &self.cache_dir)
            .field("cache_usable_fraction", &self.cache_usable_fraction)
            .field("cache_floor_bytes", &self.cache_floor_bytes)
            .field("video_default_volume", &self.video_default_volume)
            .field("audio_default_volume", &self.audio_default_volume)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("owner_thread_name", &self.owner_thread_name)
            .field("window_host", &"WindowHost { ... }")
            .field("engine_factory", &"MediaEngineFactory { ... }")
            .field("http_client", &"HttpClient { ... }")
            .field("storage_probe", &"StorageProbe { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the settings.
    ///
    /// This checks:
    /// - Cache directory is not empty
    /// - Usable fraction is in `(0, 1]` and the floor is non-zero
    /// - Default volumes are in `[0, 1]`
    /// - Event buffer and owner thread name are non-empty
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if !(self.cache_usable_fraction > 0.0 && self.cache_usable_fraction <= 1.0) {
            return Err(Error::Config(format!(
                "Cache usable fraction must be in (0, 1], got {}",
                self.cache_usable_fraction
            )));
        }

        if self.cache_floor_bytes == 0 {
            return Err(Error::Config(
                "Cache floor must be greater than 0 bytes".to_string(),
            ));
        }

        for (name, volume) in [
            ("video_default_volume", self.video_default_volume),
            ("audio_default_volume", self.audio_default_volume),
        ] {
            if !(0.0..=1.0).contains(&volume) {
                return Err(Error::Config(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, volume
                )));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.owner_thread_name.trim().is_empty() {
            return Err(Error::Config(
                "Owner thread name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::missing(
        "HttpClient",
        "HttpClient implementation is required for upstream media fetches. \
         Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
         Embedded: inject the platform HTTP stack.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_storage_probe() -> Result<Arc<dyn StorageProbe>> {
    use bridge_desktop::SysinfoStorageProbe;

    Ok(Arc::new(SysinfoStorageProbe::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_storage_probe() -> Result<Arc<dyn StorageProbe>> {
    Err(Error::missing(
        "StorageProbe",
        "StorageProbe implementation is required to size the media cache. \
         Desktop: enable the 'desktop-shims' feature to use the default SysinfoStorageProbe. \
         Embedded: report usable bytes from the platform storage API.",
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    cache_dir: Option<PathBuf>,
    cache_usable_fraction: Option<f64>,
    cache_floor_bytes: Option<u64>,
    video_default_volume: Option<f32>,
    audio_default_volume: Option<f32>,
    event_buffer_size: Option<usize>,
    owner_thread_name: Option<String>,
    window_host: Option<Arc<dyn WindowHost>>,
    engine_factory: Option<Arc<dyn MediaEngineFactory>>,
    http_client: Option<Arc<dyn HttpClient>>,
    storage_probe: Option<Arc<dyn StorageProbe>>,
}

impl CoreConfigBuilder {
    /// Sets the cache directory (required).
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    pub fn cache_usable_fraction(mut self, fraction: f64) -> Self {
        self.cache_usable_fraction = Some(fraction);
        self
    }

    pub fn cache_floor_bytes(mut self, bytes: u64) -> Self {
        self.cache_floor_bytes = Some(bytes);
        self
    }

    pub fn video_default_volume(mut self, volume: f32) -> Self {
        self.video_default_volume = Some(volume);
        self
    }

    pub fn audio_default_volume(mut self, volume: f32) -> Self {
        self.audio_default_volume = Some(volume);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn owner_thread_name(mut self, name: impl Into<String>) -> Self {
        self.owner_thread_name = Some(name.into());
        self
    }

    /// Sets the windowing bridge (required).
    pub fn window_host(mut self, host: Arc<dyn WindowHost>) -> Self {
        self.window_host = Some(host);
        self
    }

    /// Sets the media engine factory (required).
    pub fn engine_factory(mut self, factory: Arc<dyn MediaEngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    /// Sets the HTTP client. Defaults to reqwest with `desktop-shims`.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the storage probe. Defaults to sysinfo with `desktop-shims`.
    pub fn storage_probe(mut self, probe: Arc<dyn StorageProbe>) -> Self {
        self.storage_probe = Some(probe);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when the cache directory is unset or a setting is
    ///   out of range
    /// - [`Error::CapabilityMissing`] when a required bridge is absent
    pub fn build(self) -> Result<CoreConfig> {
        let cache_dir = self.cache_dir.ok_or_else(|| {
            Error::Config("Cache directory is required. Use .cache_dir() to set it.".to_string())
        })?;

        let window_host = self.window_host.ok_or_else(|| {
            Error::missing(
                "WindowHost",
                "WindowHost implementation is required to create render targets. \
                 Desktop: use bridge_desktop::HeadlessWindowHost for compositor-less kiosks. \
                 Embedded: inject the platform view hierarchy adapter.",
            )
        })?;

        let engine_factory = self.engine_factory.ok_or_else(|| {
            Error::missing(
                "MediaEngineFactory",
                "MediaEngineFactory implementation is required to decode media. \
                 Inject the platform player adapter.",
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let storage_probe = match self.storage_probe {
            Some(probe) => probe,
            None => provide_default_storage_probe()?,
        };

        let config = CoreConfig {
            cache_dir,
            cache_usable_fraction: self
                .cache_usable_fraction
                .unwrap_or(DEFAULT_CACHE_USABLE_FRACTION),
            cache_floor_bytes: self.cache_floor_bytes.unwrap_or(DEFAULT_CACHE_FLOOR_BYTES),
            video_default_volume: self.video_default_volume.unwrap_or(DEFAULT_VIDEO_VOLUME),
            audio_default_volume: self.audio_default_volume.unwrap_or(DEFAULT_AUDIO_VOLUME),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            owner_thread_name: self
                .owner_thread_name
                .unwrap_or_else(|| DEFAULT_OWNER_THREAD_NAME.to_string()),
            window_host,
            engine_factory,
            http_client,
            storage_probe,
        };

        config.validate()?;

        Ok(config)
    }
}
