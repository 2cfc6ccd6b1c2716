//! # Signage Service Façade
//!
//! Bootstrap and the outward operations of the playback core.
//!
//! ## Overview
//!
//! [`SignageService`] wires a validated [`CoreConfig`] into the playback
//! core: it opens the media cache, builds the cache-backed source factory and
//! starts the session registry on its owner thread. Operations take the
//! serde request types from [`api`] with session ids in string form, so a
//! transport only has to decode payloads and encode [`CoreError::code`].
//!
//! Desktop hosts typically enable the `desktop-shims` feature, which brings
//! in the reqwest HTTP client, the sysinfo storage probe and a headless
//! window host from `bridge-desktop`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_service::{api::*, SignageService};
//!
//! let service = SignageService::bootstrap(config).await?;
//! let player = service.create_player(CreatePlayerRequest::new("audio")).await?;
//! service
//!     .play(PlayRequest::new(&player.session_id, "https://cdn.example/jingle.mp3"))
//!     .await?;
//!
//! let mut ended = service.audio_playback_ended();
//! while let Some(event) = ended.recv().await {
//!     println!("{} finished", event.session_id);
//! }
//! ```

pub mod api;
pub mod error;

pub use api::{
    AudioPlaybackEnded, CreatePlayerRequest, CreatePlayerResponse, ErrorBody, PlayRequest,
    PlayerRequest, SetVolumeRequest, SurfaceVisibilityRequest,
};
pub use error::{CoreError, Result};

use std::sync::Arc;

use core_playback::{
    CacheConfig, CacheDataSourceFactory, CacheStats, CacheStore, MediaRequest, RegistryDeps,
    SessionId, SessionInfo, SessionKind, SessionRegistry,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, SessionEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, instrument, warn};

#[cfg(feature = "desktop-shims")]
use bridge_traits::MediaEngineFactory;

/// Primary façade exposed to host applications.
pub struct SignageService {
    registry: SessionRegistry,
    cache: CacheStore,
    events: EventBus,
}

impl SignageService {
    /// Open the cache and start the registry.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InitializationFailed`] when a setting is out of range
    /// - [`CoreError::StorageUnavailable`] when the cache directory cannot be
    ///   created or measured; the service does not start without a cache
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let cache = CacheStore::open(
            CacheConfig::from_core(&config),
            config.storage_probe.as_ref(),
        )
        .await?;
        let sources = Arc::new(CacheDataSourceFactory::new(
            Arc::clone(&config.http_client),
            cache.clone(),
        ));
        let registry =
            SessionRegistry::start(RegistryDeps::from_config(&config, sources, events.clone()))?;

        info!(
            cache_dir = %cache.dir().display(),
            capacity_bytes = cache.capacity_bytes(),
            "Signage service started"
        );
        Ok(Self {
            registry,
            cache,
            events,
        })
    }

    #[instrument(skip(self))]
    pub async fn create_player(&self, request: CreatePlayerRequest) -> Result<CreatePlayerResponse> {
        let kind: SessionKind = request.kind.parse()?;
        let id = self.registry.create(kind, request.volume).await?;
        Ok(CreatePlayerResponse {
            session_id: id.to_string(),
        })
    }

    /// Load a url into the player and start it. Returns once the engine has
    /// been handed the source; surface binding completes in the background.
    #[instrument(skip(self))]
    pub async fn play(&self, request: PlayRequest) -> Result<()> {
        let url = request
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CoreError::Validation("url is required".to_string()))?;
        let id = parse_session_id(&request.session_id)?;
        let media = MediaRequest::new(url).with_auth_token(request.auth_token);
        self.registry
            .play(id, media, request.visible.unwrap_or(true))
            .await?;
        Ok(())
    }

    pub async fn pause(&self, request: PlayerRequest) -> Result<()> {
        let id = parse_session_id(&request.session_id)?;
        Ok(self.registry.pause(id).await?)
    }

    pub async fn stop(&self, request: PlayerRequest) -> Result<()> {
        let id = parse_session_id(&request.session_id)?;
        Ok(self.registry.stop(id).await?)
    }

    pub async fn set_volume(&self, request: SetVolumeRequest) -> Result<()> {
        let id = parse_session_id(&request.session_id)?;
        Ok(self.registry.set_volume(id, request.volume).await?)
    }

    pub async fn hide(&self, request: PlayerRequest) -> Result<()> {
        let id = parse_session_id(&request.session_id)?;
        Ok(self.registry.hide(id).await?)
    }

    pub async fn show(&self, request: PlayerRequest) -> Result<()> {
        let id = parse_session_id(&request.session_id)?;
        self.registry.show(id).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn release_player(&self, request: PlayerRequest) -> Result<()> {
        let id = parse_session_id(&request.session_id)?;
        Ok(self.registry.release(id).await?)
    }

    /// Container-wide visibility toggle kept for older hosts. Video players
    /// that are currently attached keep the container shown.
    pub async fn set_render_surface_visibility(
        &self,
        request: SurfaceVisibilityRequest,
    ) -> Result<()> {
        Ok(self.registry.set_container_visible(request.visible).await?)
    }

    pub async fn player_info(&self, request: PlayerRequest) -> Result<SessionInfo> {
        let id = parse_session_id(&request.session_id)?;
        Ok(self.registry.snapshot(id).await?)
    }

    pub async fn players(&self) -> Result<Vec<SessionInfo>> {
        Ok(self.registry.sessions().await?)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Subscribe to `audioPlaybackEnded` notifications.
    pub fn audio_playback_ended(&self) -> AudioEndedStream {
        AudioEndedStream {
            inner: EventStream::new(self.events.subscribe()).filter(|event| {
                matches!(
                    event,
                    CoreEvent::Session(SessionEvent::AudioPlaybackEnded { .. })
                )
            }),
        }
    }

    /// Subscribe to every core event, for diagnostics.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Release every player, destroy the container and persist the cache
    /// index. Later operations fail with [`CoreError::ShutDown`].
    pub async fn shutdown(&self) -> Result<()> {
        self.registry.shutdown().await?;
        self.cache.release().await?;
        info!("Signage service stopped");
        Ok(())
    }
}

impl std::fmt::Debug for SignageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignageService")
            .field("registry", &self.registry)
            .field("cache_dir", &self.cache.dir())
            .finish()
    }
}

/// Receiver of [`AudioPlaybackEnded`] notifications.
#[derive(Debug)]
pub struct AudioEndedStream {
    inner: EventStream,
}

impl AudioEndedStream {
    /// Next notification, or `None` once the service is gone.
    pub async fn recv(&mut self) -> Option<AudioPlaybackEnded> {
        loop {
            match self.inner.recv().await {
                Ok(CoreEvent::Session(SessionEvent::AudioPlaybackEnded { session_id })) => {
                    return Some(AudioPlaybackEnded { session_id })
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Audio end subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Ids that do not parse cannot name a live player.
fn parse_session_id(raw: &str) -> Result<SessionId> {
    raw.parse()
        .map_err(|_| CoreError::NotFound(raw.to_string()))
}

/// Config builder preloaded with the headless window host. Hosts still
/// provide the engine factory, and the desktop HTTP client and storage
/// probe are filled in by `build()`.
#[cfg(feature = "desktop-shims")]
pub fn desktop_config(
    cache_dir: impl Into<std::path::PathBuf>,
    engine_factory: Arc<dyn MediaEngineFactory>,
) -> core_runtime::config::CoreConfigBuilder {
    CoreConfig::builder()
        .cache_dir(cache_dir)
        .window_host(Arc::new(bridge_desktop::HeadlessWindowHost::new()))
        .engine_factory(engine_factory)
}
