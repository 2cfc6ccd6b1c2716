//! Headless Window Host
//!
//! A [`WindowHost`] for kiosks without a compositor and for demos. Surfaces
//! are bookkeeping only: they become valid a short delay after creation and
//! report readiness from a helper thread, the way a real view hierarchy
//! reports it from its own callback thread.

use bridge_traits::{
    error::{BridgeError, Result},
    surface::{ContainerHandle, SurfaceHandle, SurfaceListener, WindowHost},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

struct SurfaceEntry {
    container: ContainerHandle,
    valid: bool,
    visible: bool,
    listener: Arc<dyn SurfaceListener>,
}

#[derive(Default)]
struct HostState {
    next_handle: u64,
    containers: HashMap<ContainerHandle, ContainerEntry>,
    surfaces: HashMap<SurfaceHandle, SurfaceEntry>,
}

struct ContainerEntry {
    z_order: i32,
    visible: bool,
}

/// Window host without a display.
pub struct HeadlessWindowHost {
    ready_delay: Duration,
    state: Arc<Mutex<HostState>>,
}

impl HeadlessWindowHost {
    /// Surfaces become ready after 10 ms.
    pub fn new() -> Self {
        Self::with_ready_delay(Duration::from_millis(10))
    }

    pub fn with_ready_delay(ready_delay: Duration) -> Self {
        Self {
            ready_delay,
            state: Arc::new(Mutex::new(HostState::default())),
        }
    }

    pub fn surface_visible(&self, surface: SurfaceHandle) -> Option<bool> {
        self.state.lock().surfaces.get(&surface).map(|s| s.visible)
    }

    pub fn container_visible(&self, container: ContainerHandle) -> Option<bool> {
        self.state.lock().containers.get(&container).map(|c| c.visible)
    }

    pub fn container_z_order(&self, container: ContainerHandle) -> Option<i32> {
        self.state.lock().containers.get(&container).map(|c| c.z_order)
    }

    pub fn surface_count(&self) -> usize {
        self.state.lock().surfaces.len()
    }

    /// Invalidate a surface as a display reconfiguration would, then bring it
    /// back after the ready delay.
    pub fn recycle_surface(&self, surface: SurfaceHandle) -> Result<()> {
        let listener = {
            let mut state = self.state.lock();
            let entry = state
                .surfaces
                .get_mut(&surface)
                .ok_or(BridgeError::SurfaceGone(surface.0))?;
            entry.valid = false;
            Arc::clone(&entry.listener)
        };
        listener.on_surface_destroyed(surface);
        self.schedule_ready(surface, listener);
        Ok(())
    }

    fn schedule_ready(&self, surface: SurfaceHandle, listener: Arc<dyn SurfaceListener>) {
        let state = Arc::clone(&self.state);
        let delay = self.ready_delay;
        let spawned = thread::Builder::new()
            .name(format!("headless-{}", surface))
            .spawn(move || {
                thread::sleep(delay);
                let still_exists = match state.lock().surfaces.get_mut(&surface) {
                    Some(entry) => {
                        entry.valid = true;
                        true
                    }
                    None => false,
                };
                if still_exists {
                    debug!(surface = %surface, "Headless surface ready");
                    listener.on_surface_ready(surface);
                }
            });
        if let Err(e) = spawned {
            warn!(surface = %surface, error = %e, "Could not schedule surface readiness");
        }
    }
}

impl Default for HeadlessWindowHost {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowHost for HeadlessWindowHost {
    fn create_container(&self, z_order: i32) -> Result<ContainerHandle> {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let container = ContainerHandle(state.next_handle);
        state.containers.insert(
            container,
            ContainerEntry {
                z_order,
                visible: false,
            },
        );
        debug!(container = container.0, z_order, "Headless container created");
        Ok(container)
    }

    fn set_container_visible(&self, container: ContainerHandle, visible: bool) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state.containers.get_mut(&container).ok_or_else(|| {
            BridgeError::OperationFailed(format!("unknown container {}", container.0))
        })?;
        entry.visible = visible;
        Ok(())
    }

    fn destroy_container(&self, container: ContainerHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.containers.remove(&container);
        state.surfaces.retain(|_, entry| entry.container != container);
        Ok(())
    }

    fn create_surface(
        &self,
        container: ContainerHandle,
        listener: Arc<dyn SurfaceListener>,
    ) -> Result<SurfaceHandle> {
        let surface = {
            let mut state = self.state.lock();
            if !state.containers.contains_key(&container) {
                return Err(BridgeError::OperationFailed(format!(
                    "unknown container {}",
                    container.0
                )));
            }
            state.next_handle += 1;
            let surface = SurfaceHandle(state.next_handle);
            state.surfaces.insert(
                surface,
                SurfaceEntry {
                    container,
                    valid: false,
                    visible: false,
                    listener: Arc::clone(&listener),
                },
            );
            surface
        };
        self.schedule_ready(surface, listener);
        Ok(surface)
    }

    fn is_surface_valid(&self, surface: SurfaceHandle) -> bool {
        self.state
            .lock()
            .surfaces
            .get(&surface)
            .is_some_and(|entry| entry.valid)
    }

    fn set_surface_visible(&self, surface: SurfaceHandle, visible: bool) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state
            .surfaces
            .get_mut(&surface)
            .ok_or(BridgeError::SurfaceGone(surface.0))?;
        entry.visible = visible;
        Ok(())
    }

    fn destroy_surface(&self, surface: SurfaceHandle) -> Result<()> {
        self.state.lock().surfaces.remove(&surface);
        Ok(())
    }
}
