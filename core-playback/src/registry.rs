//! # Session Registry
//!
//! Single entry point for session lifecycle operations. Sessions, the render
//! target broker and every engine live on one owner thread
//! ([`core_async::OwnerThread`]); the async methods here post a job to that
//! thread and await its reply. One FIFO queue means operations on the same
//! session complete in submission order.
//!
//! Host callbacks (engine state, surface readiness) are posted to the same
//! queue, so they never interleave with an operation in progress. Callbacks
//! arriving after shutdown are dropped.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = SessionRegistry::start(RegistryDeps::new(host, engines, sources, events))?;
//! let id = registry.create(SessionKind::Video, None).await?;
//! registry.play(id, MediaRequest::new("https://cdn/a.mp4"), true).await?;
//! registry.release(id).await?;
//! registry.shutdown().await?;
//! ```

use bridge_traits::{
    EngineListener, EngineState, MediaEngineFactory, SurfaceHandle, SurfaceListener, WindowHost,
};
use core_async::{OwnerHandle, OwnerThread};
use core_runtime::config::{
    CoreConfig, DEFAULT_AUDIO_VOLUME, DEFAULT_OWNER_THREAD_NAME, DEFAULT_VIDEO_VOLUME,
};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::broker::{BindTicket, RenderTargetBroker, TargetInfo};
use crate::error::{PlaybackError, Result};
use crate::ids::SessionId;
use crate::session::{EngineTransition, Session, SessionInfo, SessionKind};
use crate::source::{CacheDataSourceFactory, MediaRequest};

/// Collaborators and defaults the registry is started with.
#[derive(Clone)]
pub struct RegistryDeps {
    pub window_host: Arc<dyn WindowHost>,
    pub engine_factory: Arc<dyn MediaEngineFactory>,
    pub sources: Arc<CacheDataSourceFactory>,
    pub events: EventBus,
    pub video_default_volume: f32,
    pub audio_default_volume: f32,
    pub thread_name: String,
}

impl RegistryDeps {
    pub fn new(
        window_host: Arc<dyn WindowHost>,
        engine_factory: Arc<dyn MediaEngineFactory>,
        sources: Arc<CacheDataSourceFactory>,
        events: EventBus,
    ) -> Self {
        Self {
            window_host,
            engine_factory,
            sources,
            events,
            video_default_volume: DEFAULT_VIDEO_VOLUME,
            audio_default_volume: DEFAULT_AUDIO_VOLUME,
            thread_name: DEFAULT_OWNER_THREAD_NAME.to_string(),
        }
    }

    /// Take bridges and defaults from a validated [`CoreConfig`].
    pub fn from_config(
        config: &CoreConfig,
        sources: Arc<CacheDataSourceFactory>,
        events: EventBus,
    ) -> Self {
        Self {
            window_host: Arc::clone(&config.window_host),
            engine_factory: Arc::clone(&config.engine_factory),
            sources,
            events,
            video_default_volume: config.video_default_volume,
            audio_default_volume: config.audio_default_volume,
            thread_name: config.owner_thread_name.clone(),
        }
    }

    fn default_volume(&self, kind: SessionKind) -> f32 {
        match kind {
            SessionKind::Video => self.video_default_volume,
            SessionKind::Audio => self.audio_default_volume,
        }
    }
}

// ============================================================================
// Owner-thread state
// ============================================================================

struct RegistryState {
    sessions: HashMap<SessionId, Session>,
    broker: RenderTargetBroker,
    deps: RegistryDeps,
    handle: OwnerHandle<RegistryState>,
    torn_down: bool,
}

impl RegistryState {
    fn new(deps: RegistryDeps, handle: OwnerHandle<RegistryState>) -> Self {
        let listener = Arc::new(SurfaceCallbacks {
            handle: handle.clone(),
        });
        let broker = RenderTargetBroker::new(
            Arc::clone(&deps.window_host),
            listener,
            deps.events.clone(),
        );
        Self {
            sessions: HashMap::new(),
            broker,
            deps,
            handle,
            torn_down: false,
        }
    }

    fn create(&mut self, kind: SessionKind, volume: Option<f32>) -> Result<SessionId> {
        if kind == SessionKind::Video {
            self.broker.acquire_container()?;
        }

        let id = SessionId::new();
        let listener = Arc::new(EngineCallbacks {
            session: id,
            handle: self.handle.clone(),
        });
        let engine = self.deps.engine_factory.create_engine(listener)?;
        let volume = volume.unwrap_or_else(|| self.deps.default_volume(kind));
        let session = Session::new(id, kind, volume, engine)?;
        self.sessions.insert(id, session);

        info!(session = %id, kind = %kind, volume, "Session created");
        self.emit(SessionEvent::Created {
            session_id: id.to_string(),
            kind: kind.as_str().to_string(),
            volume,
        });
        Ok(id)
    }

    fn play(
        &mut self,
        id: SessionId,
        request: MediaRequest,
        visible: bool,
    ) -> Result<Option<BindTicket>> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| PlaybackError::not_found(id))?;
        let source = request.to_source(&self.deps.sources);
        let ticket = session.play(&mut self.broker, source, visible)?;

        debug!(
            session = %id,
            request = ?request,
            pending_bind = ticket.is_some(),
            "Source handed to engine"
        );
        self.emit(SessionEvent::Preparing {
            session_id: id.to_string(),
        });
        Ok(ticket)
    }

    fn pause(&mut self, id: SessionId) -> Result<()> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| PlaybackError::not_found(id))?;
        if session.pause()? {
            self.emit(SessionEvent::Paused {
                session_id: id.to_string(),
            });
        }
        Ok(())
    }

    fn stop(&mut self, id: SessionId) -> Result<()> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| PlaybackError::not_found(id))?;
        if session.stop(&mut self.broker)? {
            self.emit(SessionEvent::Stopped {
                session_id: id.to_string(),
            });
        }
        Ok(())
    }

    fn set_volume(&mut self, id: SessionId, volume: f32) -> Result<()> {
        self.sessions
            .get_mut(&id)
            .ok_or_else(|| PlaybackError::not_found(id))?
            .set_volume(volume)
    }

    fn hide(&mut self, id: SessionId) -> Result<()> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| PlaybackError::not_found(id))?;
        session.hide(&mut self.broker)
    }

    fn show(&mut self, id: SessionId) -> Result<Option<BindTicket>> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| PlaybackError::not_found(id))?;
        session.show(&mut self.broker)
    }

    fn release(&mut self, id: SessionId) -> Result<()> {
        let mut session = self
            .sessions
            .remove(&id)
            .ok_or_else(|| PlaybackError::not_found(id))?;
        session.release(&mut self.broker);
        info!(session = %id, "Session released");
        self.emit(SessionEvent::Released {
            session_id: id.to_string(),
        });
        Ok(())
    }

    fn snapshot(&self, id: SessionId) -> Result<SessionInfo> {
        self.sessions
            .get(&id)
            .map(Session::snapshot)
            .ok_or_else(|| PlaybackError::not_found(id))
    }

    fn target_info(&self, id: SessionId) -> Result<Option<TargetInfo>> {
        let session = self
            .sessions
            .get(&id)
            .ok_or_else(|| PlaybackError::not_found(id))?;
        Ok(session
            .render_target()
            .and_then(|target| self.broker.target_info(target)))
    }

    fn on_engine_state(&mut self, id: SessionId, state: EngineState) {
        let Some(session) = self.sessions.get_mut(&id) else {
            debug!(session = %id, ?state, "Engine state for a released session ignored");
            return;
        };
        let session_id = id.to_string();
        match session.on_engine_state(state) {
            Some(EngineTransition::Playing) => self.emit(SessionEvent::Playing { session_id }),
            Some(EngineTransition::Ready) => debug!(session = %id, "Engine ready, autoplay off"),
            Some(EngineTransition::Ended { audio_ended }) => {
                self.emit(SessionEvent::Stopped {
                    session_id: session_id.clone(),
                });
                if audio_ended {
                    info!(session = %id, "Audio playback ended");
                    self.emit(SessionEvent::AudioPlaybackEnded { session_id });
                }
            }
            None => {}
        }
    }

    fn on_engine_error(&mut self, id: SessionId, message: String) {
        if !self.sessions.contains_key(&id) {
            return;
        }
        warn!(session = %id, error = %message, "Engine reported an error");
        self.emit(SessionEvent::Error {
            session_id: id.to_string(),
            message,
        });
    }

    fn on_surface_ready(&mut self, surface: SurfaceHandle) {
        let Some((id, _target, surface)) = self.broker.on_surface_ready(surface) else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        if let Err(e) = session.on_surface_bound(surface) {
            warn!(session = %id, error = %e, "Binding ready surface failed");
            self.emit(SessionEvent::Error {
                session_id: id.to_string(),
                message: e.to_string(),
            });
        }
    }

    fn on_surface_destroyed(&mut self, surface: SurfaceHandle) {
        let Some((id, _target)) = self.broker.on_surface_destroyed(surface) else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        if let Err(e) = session.surface_lost(&mut self.broker) {
            warn!(session = %id, error = %e, "Recovering from lost surface failed");
        }
    }

    /// Force-release every session, then destroy the container.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            if let Some(mut session) = self.sessions.remove(&id) {
                session.release(&mut self.broker);
                self.emit(SessionEvent::Released {
                    session_id: id.to_string(),
                });
            }
        }
        self.broker.teardown();
        info!("Session registry torn down");
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.deps.events.emit(CoreEvent::Session(event));
    }
}

impl Drop for RegistryState {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ============================================================================
// Host callback adapters
// ============================================================================

struct EngineCallbacks {
    session: SessionId,
    handle: OwnerHandle<RegistryState>,
}

impl EngineListener for EngineCallbacks {
    fn on_state_changed(&self, state: EngineState) {
        let session = self.session;
        let _ = self
            .handle
            .post(move |registry| registry.on_engine_state(session, state));
    }

    fn on_error(&self, message: String) {
        let session = self.session;
        let _ = self
            .handle
            .post(move |registry| registry.on_engine_error(session, message));
    }
}

struct SurfaceCallbacks {
    handle: OwnerHandle<RegistryState>,
}

impl SurfaceListener for SurfaceCallbacks {
    fn on_surface_ready(&self, surface: SurfaceHandle) {
        let _ = self
            .handle
            .post(move |registry| registry.on_surface_ready(surface));
    }

    fn on_surface_destroyed(&self, surface: SurfaceHandle) {
        let _ = self
            .handle
            .post(move |registry| registry.on_surface_destroyed(surface));
    }
}

// ============================================================================
// Public handle
// ============================================================================

/// Thread-safe handle to the session registry.
pub struct SessionRegistry {
    owner: Arc<OwnerThread<RegistryState>>,
    events: EventBus,
}

impl SessionRegistry {
    /// Spawn the owner thread and build the registry state on it.
    pub fn start(deps: RegistryDeps) -> Result<Self> {
        let events = deps.events.clone();
        let name = deps.thread_name.clone();
        let owner = OwnerThread::spawn(name, move |handle| RegistryState::new(deps, handle))?;
        Ok(Self {
            owner: Arc::new(owner),
            events,
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_running(&self) -> bool {
        !self.owner.handle().is_stopped()
    }

    /// Create a session. `volume` defaults per kind.
    #[instrument(skip(self))]
    pub async fn create(&self, kind: SessionKind, volume: Option<f32>) -> Result<SessionId> {
        if let Some(volume) = volume {
            validate_volume(volume)?;
        }
        self.owner
            .handle()
            .call(move |registry| registry.create(kind, volume))
            .await?
    }

    /// Load `request` into the session and start playback.
    ///
    /// The returned ticket, when present, resolves once the video surface is
    /// bound. Dropping it does not cancel the bind.
    #[instrument(skip(self, request), fields(session = %id))]
    pub async fn play(
        &self,
        id: SessionId,
        request: MediaRequest,
        visible: bool,
    ) -> Result<Option<BindTicket>> {
        if request.url.trim().is_empty() {
            return Err(PlaybackError::Validation("url is required".to_string()));
        }
        self.owner
            .handle()
            .call(move |registry| registry.play(id, request, visible))
            .await?
    }

    pub async fn pause(&self, id: SessionId) -> Result<()> {
        self.owner
            .handle()
            .call(move |registry| registry.pause(id))
            .await?
    }

    pub async fn stop(&self, id: SessionId) -> Result<()> {
        self.owner
            .handle()
            .call(move |registry| registry.stop(id))
            .await?
    }

    pub async fn set_volume(&self, id: SessionId, volume: f32) -> Result<()> {
        validate_volume(volume)?;
        self.owner
            .handle()
            .call(move |registry| registry.set_volume(id, volume))
            .await?
    }

    pub async fn hide(&self, id: SessionId) -> Result<()> {
        self.owner
            .handle()
            .call(move |registry| registry.hide(id))
            .await?
    }

    pub async fn show(&self, id: SessionId) -> Result<Option<BindTicket>> {
        self.owner
            .handle()
            .call(move |registry| registry.show(id))
            .await?
    }

    /// Release a session. A second release of the same id is `NotFound`.
    #[instrument(skip(self), fields(session = %id))]
    pub async fn release(&self, id: SessionId) -> Result<()> {
        self.owner
            .handle()
            .call(move |registry| registry.release(id))
            .await?
    }

    /// Legacy container-wide visibility toggle.
    pub async fn set_container_visible(&self, visible: bool) -> Result<()> {
        self.owner
            .handle()
            .call(move |registry| registry.broker.set_container_visible(visible))
            .await?
    }

    pub async fn container_visible(&self) -> Result<bool> {
        Ok(self
            .owner
            .handle()
            .call(|registry| registry.broker.container_visible())
            .await?)
    }

    pub async fn snapshot(&self, id: SessionId) -> Result<SessionInfo> {
        self.owner
            .handle()
            .call(move |registry| registry.snapshot(id))
            .await?
    }

    pub async fn sessions(&self) -> Result<Vec<SessionInfo>> {
        Ok(self
            .owner
            .handle()
            .call(|registry| {
                registry
                    .sessions
                    .values()
                    .map(Session::snapshot)
                    .collect::<Vec<_>>()
            })
            .await?)
    }

    /// Render target state of a video session, if it holds one.
    pub async fn render_target(&self, id: SessionId) -> Result<Option<TargetInfo>> {
        self.owner
            .handle()
            .call(move |registry| registry.target_info(id))
            .await?
    }

    /// Force-release every session, destroy the container and stop the owner
    /// thread. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        match self.owner.handle().call(|registry| registry.teardown()).await {
            Ok(()) | Err(core_async::OwnerError::Stopped) => {}
            Err(e) => return Err(e.into()),
        }
        let owner = Arc::clone(&self.owner);
        tokio::task::spawn_blocking(move || owner.shutdown())
            .await
            .map_err(|e| PlaybackError::Internal(format!("owner shutdown join failed: {}", e)))
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("owner", &self.owner)
            .finish()
    }
}

fn validate_volume(volume: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(PlaybackError::Validation(format!(
            "volume must be between 0.0 and 1.0, got {}",
            volume
        )));
    }
    Ok(())
}
