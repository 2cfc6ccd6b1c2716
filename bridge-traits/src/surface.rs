//! Windowing Abstraction
//!
//! The host view hierarchy owns the physical drawable surfaces. The core asks
//! it for one background container and for surfaces inside that container;
//! the host reports readiness and destruction asynchronously through a
//! [`SurfaceListener`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Host handle for the shared container view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerHandle(pub u64);

/// Host handle for one drawable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceHandle(pub u64);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Surface lifecycle notifications. May be called from any thread.
pub trait SurfaceListener: Send + Sync {
    /// The surface became valid and can be bound to a decoder.
    fn on_surface_ready(&self, surface: SurfaceHandle);

    /// The host tore the surface down. It may become ready again later.
    fn on_surface_destroyed(&self, surface: SurfaceHandle);
}

/// Host windowing system.
///
/// Calls are only made from the owner thread.
pub trait WindowHost: Send + Sync {
    /// Create the container under the host root at the given z-order. Lower
    /// values render beneath higher ones.
    fn create_container(&self, z_order: i32) -> Result<ContainerHandle>;

    fn set_container_visible(&self, container: ContainerHandle, visible: bool) -> Result<()>;

    fn destroy_container(&self, container: ContainerHandle) -> Result<()>;

    /// Create an invisible surface inside `container`. Readiness is reported
    /// to `listener`, possibly before this call returns.
    fn create_surface(
        &self,
        container: ContainerHandle,
        listener: Arc<dyn SurfaceListener>,
    ) -> Result<SurfaceHandle>;

    /// Returns `true` when the surface can be bound right now.
    fn is_surface_valid(&self, surface: SurfaceHandle) -> bool;

    fn set_surface_visible(&self, surface: SurfaceHandle, visible: bool) -> Result<()>;

    fn destroy_surface(&self, surface: SurfaceHandle) -> Result<()>;
}
