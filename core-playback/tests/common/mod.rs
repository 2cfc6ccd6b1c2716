//! Shared fakes for the playback integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, ContainerHandle, ContentType, EngineListener, EngineState, HttpClient,
    HttpRequest, HttpResponse, MediaEngine, MediaEngineFactory, MediaSource, StorageProbe,
    StorageSpace, SurfaceHandle, SurfaceListener, WindowHost,
};
use bytes::Bytes;
use core_playback::{
    CacheConfig, CacheDataSourceFactory, CachePolicy, CacheStore, RegistryDeps, SessionRegistry,
};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast::Receiver;

// ============================================================================
// Window host
// ============================================================================

#[derive(Default)]
pub struct HostState {
    next: u64,
    pub container: Option<ContainerHandle>,
    pub container_z_order: Option<i32>,
    pub container_visible: Option<bool>,
    pub container_destroyed: bool,
    pub valid: HashMap<SurfaceHandle, bool>,
    pub visible: HashMap<SurfaceHandle, bool>,
    pub destroyed: Vec<SurfaceHandle>,
    pub created_surfaces: usize,
    listeners: HashMap<SurfaceHandle, Arc<dyn SurfaceListener>>,
}

/// Window host whose surfaces are either valid on creation or wait for
/// [`FakeHost::make_ready`].
pub struct FakeHost {
    auto_ready: bool,
    pub state: Mutex<HostState>,
}

impl FakeHost {
    pub fn new(auto_ready: bool) -> Arc<Self> {
        Arc::new(Self {
            auto_ready,
            state: Mutex::new(HostState::default()),
        })
    }

    pub fn surfaces(&self) -> Vec<SurfaceHandle> {
        let mut surfaces: Vec<_> = self.state.lock().listeners.keys().copied().collect();
        surfaces.sort_by_key(|s| s.0);
        surfaces
    }

    pub fn is_visible(&self, surface: SurfaceHandle) -> bool {
        self.state.lock().visible.get(&surface).copied().unwrap_or(false)
    }

    pub fn created_surfaces(&self) -> usize {
        self.state.lock().created_surfaces
    }

    /// Validate the surface and fire the readiness callback.
    pub fn make_ready(&self, surface: SurfaceHandle) {
        let listener = {
            let mut state = self.state.lock();
            state.valid.insert(surface, true);
            state.listeners.get(&surface).cloned()
        };
        if let Some(listener) = listener {
            listener.on_surface_ready(surface);
        }
    }

    /// Invalidate the surface and fire the destroyed callback.
    pub fn destroy(&self, surface: SurfaceHandle) {
        let listener = {
            let mut state = self.state.lock();
            state.valid.insert(surface, false);
            state.listeners.get(&surface).cloned()
        };
        if let Some(listener) = listener {
            listener.on_surface_destroyed(surface);
        }
    }
}

impl WindowHost for FakeHost {
    fn create_container(&self, z_order: i32) -> BridgeResult<ContainerHandle> {
        let mut state = self.state.lock();
        let container = ContainerHandle(100);
        state.container = Some(container);
        state.container_z_order = Some(z_order);
        Ok(container)
    }

    fn set_container_visible(&self, _container: ContainerHandle, visible: bool) -> BridgeResult<()> {
        self.state.lock().container_visible = Some(visible);
        Ok(())
    }

    fn destroy_container(&self, _container: ContainerHandle) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.container = None;
        state.container_destroyed = true;
        Ok(())
    }

    fn create_surface(
        &self,
        _container: ContainerHandle,
        listener: Arc<dyn SurfaceListener>,
    ) -> BridgeResult<SurfaceHandle> {
        let mut state = self.state.lock();
        state.next += 1;
        state.created_surfaces += 1;
        let surface = SurfaceHandle(state.next);
        state.valid.insert(surface, self.auto_ready);
        state.listeners.insert(surface, listener);
        Ok(surface)
    }

    fn is_surface_valid(&self, surface: SurfaceHandle) -> bool {
        self.state.lock().valid.get(&surface).copied().unwrap_or(false)
    }

    fn set_surface_visible(&self, surface: SurfaceHandle, visible: bool) -> BridgeResult<()> {
        self.state.lock().visible.insert(surface, visible);
        Ok(())
    }

    fn destroy_surface(&self, surface: SurfaceHandle) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.destroyed.push(surface);
        state.listeners.remove(&surface);
        Ok(())
    }
}

// ============================================================================
// Media engine
// ============================================================================

pub struct EngineLog {
    pub calls: Vec<&'static str>,
    pub state: EngineState,
    pub content_type: Option<ContentType>,
    pub source: Option<MediaSource>,
    pub sources_loaded: Vec<String>,
    pub surface: Option<SurfaceHandle>,
    pub volume: f32,
    pub released: usize,
    /// Set when a source was loaded while another one was still live.
    pub overlapping_sources: bool,
    pub fail_prepare: bool,
    listener: Arc<dyn EngineListener>,
}

/// Test-side handle to one engine created by [`FakeEngines`].
#[derive(Clone)]
pub struct EngineProbe {
    log: Arc<Mutex<EngineLog>>,
}

impl EngineProbe {
    pub fn lock(&self) -> parking_lot::MutexGuard<'_, EngineLog> {
        self.log.lock()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.log.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().calls.clear();
    }

    pub fn source(&self) -> Option<MediaSource> {
        self.log.lock().source.clone()
    }

    /// Report the engine ready, as a prepared engine would.
    pub fn finish_prepare(&self) {
        let listener = {
            let mut log = self.log.lock();
            log.state = EngineState::Ready;
            Arc::clone(&log.listener)
        };
        listener.on_state_changed(EngineState::Ready);
    }

    /// Report a natural end of stream.
    pub fn finish_stream(&self) {
        let listener = {
            let mut log = self.log.lock();
            log.state = EngineState::Ended;
            Arc::clone(&log.listener)
        };
        listener.on_state_changed(EngineState::Ended);
    }

    pub fn report_error(&self, message: &str) {
        let listener = Arc::clone(&self.log.lock().listener);
        listener.on_error(message.to_string());
    }
}

struct FakeEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl MediaEngine for FakeEngine {
    fn set_content_type(&mut self, content_type: ContentType) -> BridgeResult<()> {
        let mut log = self.log.lock();
        log.calls.push("content_type");
        log.content_type = Some(content_type);
        Ok(())
    }

    fn set_source(&mut self, source: MediaSource) -> BridgeResult<()> {
        let mut log = self.log.lock();
        log.calls.push("set_source");
        if log.source.is_some() {
            log.overlapping_sources = true;
        }
        log.sources_loaded.push(source.url.clone());
        log.source = Some(source);
        Ok(())
    }

    fn prepare(&mut self) -> BridgeResult<()> {
        let mut log = self.log.lock();
        log.calls.push("prepare");
        if log.fail_prepare {
            return Err(BridgeError::OperationFailed("decoder init failed".into()));
        }
        log.state = EngineState::Buffering;
        Ok(())
    }

    fn play(&mut self) -> BridgeResult<()> {
        self.log.lock().calls.push("play");
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.log.lock().calls.push("pause");
        Ok(())
    }

    fn stop(&mut self) -> BridgeResult<()> {
        let mut log = self.log.lock();
        log.calls.push("stop");
        log.state = EngineState::Idle;
        log.source = None;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> BridgeResult<()> {
        let mut log = self.log.lock();
        log.calls.push("volume");
        log.volume = volume;
        Ok(())
    }

    fn set_video_surface(&mut self, surface: Option<SurfaceHandle>) -> BridgeResult<()> {
        let mut log = self.log.lock();
        log.calls.push("surface");
        log.surface = surface;
        Ok(())
    }

    fn state(&self) -> EngineState {
        self.log.lock().state
    }

    fn release(&mut self) {
        let mut log = self.log.lock();
        log.calls.push("release");
        log.released += 1;
    }
}

#[derive(Default)]
pub struct FakeEngines {
    created: Mutex<Vec<EngineProbe>>,
    fail_prepare: Mutex<bool>,
}

impl FakeEngines {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Engine `index` in creation order.
    pub fn engine(&self, index: usize) -> EngineProbe {
        self.created.lock()[index].clone()
    }

    pub fn count(&self) -> usize {
        self.created.lock().len()
    }

    /// Engines created after this call fail `prepare()`.
    pub fn fail_prepare(&self, fail: bool) {
        *self.fail_prepare.lock() = fail;
    }
}

impl MediaEngineFactory for FakeEngines {
    fn create_engine(&self, listener: Arc<dyn EngineListener>) -> BridgeResult<Box<dyn MediaEngine>> {
        let log = Arc::new(Mutex::new(EngineLog {
            calls: Vec::new(),
            state: EngineState::Idle,
            content_type: None,
            source: None,
            sources_loaded: Vec::new(),
            surface: None,
            volume: -1.0,
            released: 0,
            overlapping_sources: false,
            fail_prepare: *self.fail_prepare.lock(),
            listener,
        }));
        self.created.lock().push(EngineProbe {
            log: Arc::clone(&log),
        });
        Ok(Box::new(FakeEngine { log }))
    }
}

// ============================================================================
// HTTP and storage
// ============================================================================

/// Answers every request with the URL as body and records the request.
#[derive(Default)]
pub struct RecordingHttp {
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpClient for RecordingHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let body = Bytes::from(request.url.clone().into_bytes());
        self.requests.lock().push(request);
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body,
        })
    }
}

pub struct FixedProbe(pub u64);

impl StorageProbe for FixedProbe {
    fn measure(&self, _path: &Path) -> BridgeResult<StorageSpace> {
        Ok(StorageSpace {
            usable_bytes: self.0,
            total_bytes: self.0,
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub registry: SessionRegistry,
    pub host: Arc<FakeHost>,
    pub engines: Arc<FakeEngines>,
    pub http: Arc<RecordingHttp>,
    pub cache: CacheStore,
    pub events: EventBus,
    _dir: TempDir,
}

pub async fn harness(auto_ready: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = CacheConfig::new(dir.path()).with_policy(CachePolicy {
        usable_fraction: 0.6,
        floor_bytes: 1024 * 1024,
    });
    let cache = CacheStore::open(config, &FixedProbe(0)).await.unwrap();

    let host = FakeHost::new(auto_ready);
    let engines = FakeEngines::new();
    let http = RecordingHttp::new();
    let events = EventBus::new(256);
    let sources = Arc::new(CacheDataSourceFactory::new(http.clone(), cache.clone()));

    let mut deps = RegistryDeps::new(host.clone(), engines.clone(), sources, events.clone());
    deps.thread_name = "test-owner".to_string();
    let registry = SessionRegistry::start(deps).unwrap();

    Harness {
        registry,
        host,
        engines,
        http,
        cache,
        events,
        _dir: dir,
    }
}

/// Wait for the next session event matching `predicate`.
pub async fn next_session_event<F>(rx: &mut Receiver<CoreEvent>, predicate: F) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(CoreEvent::Session(event)) if predicate(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event stream closed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for session event")
}

/// Drain buffered session events without waiting.
pub fn drain_session_events(rx: &mut Receiver<CoreEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let CoreEvent::Session(event) = event {
            events.push(event);
        }
    }
    events
}
