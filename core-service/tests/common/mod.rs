//! Host fakes for the service suites.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, ContainerHandle, ContentType, EngineListener, EngineState, HttpClient,
    HttpRequest, HttpResponse, MediaEngine, MediaEngineFactory, MediaSource, StorageProbe,
    StorageSpace, SurfaceHandle, SurfaceListener, WindowHost,
};
use bytes::Bytes;
use core_runtime::config::{CoreConfig, CoreConfigBuilder};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Surfaces are valid as soon as they exist.
#[derive(Default)]
pub struct ReadyHost {
    next: Mutex<u64>,
    pub container_visible: Mutex<Option<bool>>,
}

impl WindowHost for ReadyHost {
    fn create_container(&self, _z_order: i32) -> BridgeResult<ContainerHandle> {
        Ok(ContainerHandle(1))
    }

    fn set_container_visible(&self, _container: ContainerHandle, visible: bool) -> BridgeResult<()> {
        *self.container_visible.lock() = Some(visible);
        Ok(())
    }

    fn destroy_container(&self, _container: ContainerHandle) -> BridgeResult<()> {
        Ok(())
    }

    fn create_surface(
        &self,
        _container: ContainerHandle,
        _listener: Arc<dyn SurfaceListener>,
    ) -> BridgeResult<SurfaceHandle> {
        let mut next = self.next.lock();
        *next += 1;
        Ok(SurfaceHandle(*next + 10))
    }

    fn is_surface_valid(&self, _surface: SurfaceHandle) -> bool {
        true
    }

    fn set_surface_visible(&self, _surface: SurfaceHandle, _visible: bool) -> BridgeResult<()> {
        Ok(())
    }

    fn destroy_surface(&self, _surface: SurfaceHandle) -> BridgeResult<()> {
        Ok(())
    }
}

struct QuietEngine {
    state: EngineState,
}

impl MediaEngine for QuietEngine {
    fn set_content_type(&mut self, _content_type: ContentType) -> BridgeResult<()> {
        Ok(())
    }

    fn set_source(&mut self, _source: MediaSource) -> BridgeResult<()> {
        Ok(())
    }

    fn prepare(&mut self) -> BridgeResult<()> {
        self.state = EngineState::Buffering;
        Ok(())
    }

    fn play(&mut self) -> BridgeResult<()> {
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        Ok(())
    }

    fn stop(&mut self) -> BridgeResult<()> {
        self.state = EngineState::Idle;
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) -> BridgeResult<()> {
        Ok(())
    }

    fn set_video_surface(&mut self, _surface: Option<SurfaceHandle>) -> BridgeResult<()> {
        Ok(())
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn release(&mut self) {}
}

/// Creates engines that only change state when the test drives their
/// listener.
#[derive(Default)]
pub struct DrivenEngines {
    listeners: Mutex<Vec<Arc<dyn EngineListener>>>,
}

impl DrivenEngines {
    /// Report `state` from engine `index`, in creation order.
    pub fn report(&self, index: usize, state: EngineState) {
        let listener = Arc::clone(&self.listeners.lock()[index]);
        listener.on_state_changed(state);
    }

    pub fn count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl MediaEngineFactory for DrivenEngines {
    fn create_engine(&self, listener: Arc<dyn EngineListener>) -> BridgeResult<Box<dyn MediaEngine>> {
        self.listeners.lock().push(listener);
        Ok(Box::new(QuietEngine {
            state: EngineState::Idle,
        }))
    }
}

pub struct EchoHttp;

#[async_trait]
impl HttpClient for EchoHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(request.url.into_bytes()),
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

pub struct BrokenProbe;

impl StorageProbe for BrokenProbe {
    fn measure(&self, _path: &Path) -> BridgeResult<StorageSpace> {
        Err(BridgeError::NotAvailable("volume not mounted".into()))
    }
}

/// Builder with fakes for every bridge and a 1 MiB cache floor.
pub fn test_config(
    cache_dir: &Path,
    host: Arc<ReadyHost>,
    engines: Arc<DrivenEngines>,
) -> CoreConfigBuilder {
    CoreConfig::builder()
        .cache_dir(cache_dir)
        .cache_floor_bytes(1024 * 1024)
        .owner_thread_name("service-test")
        .window_host(host)
        .engine_factory(engines)
        .http_client(Arc::new(EchoHttp))
        .storage_probe(Arc::new(FixedProbe(0)))
}
