//! # Render Target Broker
//!
//! Owns the shared background container and the render targets inside it.
//! Targets outlive the sessions that use them: pausing, stopping or hiding a
//! video session only changes visibility and ownership bookkeeping, so the
//! decoder keeps its surface binding and resumes without a rebuild.
//!
//! ## Readiness
//!
//! ```text
//!            attach (surface valid)
//!  Unbound ────────────────────────────> Bound
//!     │  attach (not yet valid)            ▲
//!     └──────────> PendingBind ────────────┘
//!                       on_surface_ready (owner still matches)
//!
//!  PendingBind | Bound ── on_surface_destroyed ──> Unbound
//!  any ── teardown ──> Destroyed
//! ```
//!
//! A target's owner is set only while it is `PendingBind` or `Bound`, and a
//! target has at most one pending bind. A newer attach replaces the older
//! ticket, which then resolves to [`BindCancelled`].
//!
//! All methods run on the owner thread.

use bridge_traits::{ContainerHandle, SurfaceHandle, SurfaceListener, WindowHost};
use core_async::sync::oneshot;
use core_runtime::events::{CoreEvent, EventBus, SurfaceEvent};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, Result};
use crate::ids::{RenderTargetId, SessionId};

/// Container z-order: beneath every overlay the host draws.
pub const CONTAINER_Z_ORDER: i32 = i32::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Unbound,
    PendingBind,
    Bound,
    Destroyed,
}

/// Result of [`RenderTargetBroker::attach`].
#[derive(Debug)]
pub enum AttachOutcome {
    /// The surface was valid; the engine can render into it now.
    Bound(SurfaceHandle),
    /// The bind completes when the host reports the surface ready.
    Pending(BindTicket),
}

/// Result of [`RenderTargetBroker::detach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachOutcome {
    /// The engine keeps its surface binding.
    Retained,
    /// The target went back to the pool; the engine must drop the surface.
    ClearBinding,
}

/// A pending bind was superseded, detached, or lost with its surface.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("pending bind for {target} was cancelled")]
pub struct BindCancelled {
    pub target: RenderTargetId,
}

/// Resolves once the target's surface is bound for the requesting session.
#[derive(Debug)]
pub struct BindTicket {
    target: RenderTargetId,
    rx: oneshot::Receiver<SurfaceHandle>,
}

impl BindTicket {
    pub fn target(&self) -> RenderTargetId {
        self.target
    }
}

impl Future for BindTicket {
    type Output = std::result::Result<SurfaceHandle, BindCancelled>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let target = self.target;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| BindCancelled { target }))
    }
}

struct PendingBind {
    session: SessionId,
    tx: oneshot::Sender<SurfaceHandle>,
}

struct RenderTarget {
    surface: SurfaceHandle,
    readiness: Readiness,
    /// Session currently attached. Cleared by any detach.
    owner: Option<SessionId>,
    /// Session the target is allocated to. Survives a retaining detach.
    holder: Option<SessionId>,
    visible: bool,
    pending: Option<PendingBind>,
}

/// Read-only view of a render target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub id: RenderTargetId,
    pub surface: SurfaceHandle,
    pub readiness: Readiness,
    pub owner: Option<SessionId>,
    pub holder: Option<SessionId>,
    pub visible: bool,
    pub pending_bind: bool,
}

pub struct RenderTargetBroker {
    host: Arc<dyn WindowHost>,
    listener: Arc<dyn SurfaceListener>,
    events: EventBus,
    container: Option<ContainerHandle>,
    targets: BTreeMap<RenderTargetId, RenderTarget>,
    by_surface: HashMap<SurfaceHandle, RenderTargetId>,
    pool: VecDeque<RenderTargetId>,
    next_id: u64,
    requested_container_visible: bool,
    container_visible: bool,
}

impl RenderTargetBroker {
    /// `listener` receives host readiness callbacks for every surface this
    /// broker creates.
    pub fn new(
        host: Arc<dyn WindowHost>,
        listener: Arc<dyn SurfaceListener>,
        events: EventBus,
    ) -> Self {
        Self {
            host,
            listener,
            events,
            container: None,
            targets: BTreeMap::new(),
            by_surface: HashMap::new(),
            pool: VecDeque::new(),
            next_id: 1,
            requested_container_visible: false,
            container_visible: false,
        }
    }

    /// Create the container on first use.
    pub fn acquire_container(&mut self) -> Result<ContainerHandle> {
        if let Some(container) = self.container {
            return Ok(container);
        }
        let container = self
            .host
            .create_container(CONTAINER_Z_ORDER)
            .map_err(|e| PlaybackError::SurfaceUnavailable(e.to_string()))?;
        self.container = Some(container);
        self.emit(SurfaceEvent::ContainerCreated {
            z_order: CONTAINER_Z_ORDER,
        });
        info!(z_order = CONTAINER_Z_ORDER, "Render container created");

        let visible = self.effective_container_visibility();
        if let Err(e) = self.host.set_container_visible(container, visible) {
            warn!(visible, error = %e, "Failed to set initial container visibility");
        }
        self.container_visible = visible;
        Ok(container)
    }

    /// Allocate a new invisible target inside the container.
    pub fn create_target(&mut self) -> Result<RenderTargetId> {
        let container = self.acquire_container()?;
        let surface = self
            .host
            .create_surface(container, Arc::clone(&self.listener))
            .map_err(|e| PlaybackError::SurfaceUnavailable(e.to_string()))?;
        if let Err(e) = self.host.set_surface_visible(surface, false) {
            warn!(surface = %surface, error = %e, "Failed to hide new surface");
        }

        let id = RenderTargetId(self.next_id);
        self.next_id += 1;
        self.targets.insert(
            id,
            RenderTarget {
                surface,
                readiness: Readiness::Unbound,
                owner: None,
                holder: None,
                visible: false,
                pending: None,
            },
        );
        self.by_surface.insert(surface, id);
        self.emit(SurfaceEvent::TargetCreated { target_id: id.get() });
        debug!(target = %id, surface = %surface, "Render target created");
        Ok(id)
    }

    /// Hand `session` a target, reusing a pooled one when available.
    pub fn acquire_target(&mut self, session: SessionId) -> Result<RenderTargetId> {
        let id = match self.pool.pop_front() {
            Some(id) => {
                debug!(target = %id, session = %session, "Reusing pooled render target");
                id
            }
            None => self.create_target()?,
        };
        let target = self.target_mut(id)?;
        target.holder = Some(session);
        Ok(id)
    }

    /// Attach `session` to `target`, binding now or once the surface is ready.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::TargetBusy`] when another session owns the target.
    pub fn attach(&mut self, session: SessionId, id: RenderTargetId) -> Result<AttachOutcome> {
        let target = self.target_mut(id)?;
        let taken_by_other = [target.owner, target.holder]
            .iter()
            .flatten()
            .any(|other| *other != session);
        if taken_by_other {
            return Err(PlaybackError::TargetBusy { target: id.get() });
        }
        target.owner = Some(session);
        target.holder = Some(session);
        let surface = target.surface;

        if self.host.is_surface_valid(surface) {
            let target = self.target_mut(id)?;
            let newly_bound = target.readiness != Readiness::Bound;
            target.readiness = Readiness::Bound;
            target.pending = None;
            if newly_bound {
                self.emit(SurfaceEvent::TargetBound {
                    target_id: id.get(),
                    session_id: session.to_string(),
                });
            }
            self.sync_container_visibility();
            return Ok(AttachOutcome::Bound(surface));
        }

        let (tx, rx) = oneshot::channel();
        let target = self.target_mut(id)?;
        target.readiness = Readiness::PendingBind;
        if target.pending.replace(PendingBind { session, tx }).is_some() {
            debug!(target = %id, "Superseded earlier pending bind");
        }
        debug!(target = %id, session = %session, "Surface not ready; bind pending");
        self.sync_container_visibility();
        Ok(AttachOutcome::Pending(BindTicket { target: id, rx }))
    }

    /// Display visibility only. Never touches the engine binding.
    pub fn set_visible(&mut self, id: RenderTargetId, visible: bool) -> Result<()> {
        let target = self.target_mut(id)?;
        if target.visible == visible {
            return Ok(());
        }
        let surface = target.surface;
        self.host.set_surface_visible(surface, visible)?;
        self.target_mut(id)?.visible = visible;
        Ok(())
    }

    /// Release `session`'s attachment to `target` and hide it.
    ///
    /// With `destroy` the target leaves the session and returns to the pool.
    pub fn detach(
        &mut self,
        session: SessionId,
        id: RenderTargetId,
        destroy: bool,
    ) -> Result<DetachOutcome> {
        let target = self.target_mut(id)?;
        if target.holder.is_some_and(|holder| holder != session) {
            debug!(target = %id, session = %session, "Detach from a target held elsewhere ignored");
            return Ok(DetachOutcome::Retained);
        }
        target.owner = None;
        if target.pending.take().is_some() || target.readiness == Readiness::PendingBind {
            target.readiness = Readiness::Unbound;
        }

        if let Err(e) = self.set_visible(id, false) {
            warn!(target = %id, error = %e, "Failed to hide render target on detach");
        }

        let outcome = if destroy {
            let target = self.target_mut(id)?;
            target.holder = None;
            if target.readiness != Readiness::Destroyed {
                target.readiness = Readiness::Unbound;
                self.pool.push_back(id);
            }
            DetachOutcome::ClearBinding
        } else {
            DetachOutcome::Retained
        };
        self.sync_container_visibility();
        Ok(outcome)
    }

    /// Host readiness callback. Returns the session to bind when the pending
    /// requester still owns the target.
    pub fn on_surface_ready(
        &mut self,
        surface: SurfaceHandle,
    ) -> Option<(SessionId, RenderTargetId, SurfaceHandle)> {
        let id = *self.by_surface.get(&surface)?;
        let target = self.targets.get_mut(&id)?;
        let Some(pending) = target.pending.take() else {
            debug!(target = %id, "Surface ready with no pending bind");
            return None;
        };
        if target.owner != Some(pending.session) {
            debug!(target = %id, session = %pending.session, "Dropping stale pending bind");
            target.readiness = Readiness::Unbound;
            return None;
        }

        target.readiness = Readiness::Bound;
        let _ = pending.tx.send(surface);
        self.emit(SurfaceEvent::TargetBound {
            target_id: id.get(),
            session_id: pending.session.to_string(),
        });
        debug!(target = %id, session = %pending.session, "Pending bind completed");
        Some((pending.session, id, surface))
    }

    /// Host destroyed a surface. Returns the session holding the target so it
    /// can drop its binding. Never an error.
    pub fn on_surface_destroyed(
        &mut self,
        surface: SurfaceHandle,
    ) -> Option<(SessionId, RenderTargetId)> {
        let id = *self.by_surface.get(&surface)?;
        let target = self.targets.get_mut(&id)?;
        if !matches!(target.readiness, Readiness::PendingBind | Readiness::Bound) {
            return None;
        }
        target.pending = None;
        target.readiness = Readiness::Unbound;
        target.owner = None;
        let holder = target.holder;

        warn!(target = %id, surface = %surface, "Host destroyed surface; target unbound");
        self.emit(SurfaceEvent::TargetLost { target_id: id.get() });
        self.sync_container_visibility();
        holder.map(|session| (session, id))
    }

    /// Legacy container-wide toggle. The container stays visible while any
    /// target is attached regardless of the request.
    pub fn set_container_visible(&mut self, visible: bool) -> Result<()> {
        self.requested_container_visible = visible;
        self.sync_container_visibility();
        Ok(())
    }

    pub fn container_visible(&self) -> bool {
        self.container.is_some() && self.container_visible
    }

    pub fn has_container(&self) -> bool {
        self.container.is_some()
    }

    pub fn target_info(&self, id: RenderTargetId) -> Option<TargetInfo> {
        self.targets.get(&id).map(|target| TargetInfo {
            id,
            surface: target.surface,
            readiness: target.readiness,
            owner: target.owner,
            holder: target.holder,
            visible: target.visible,
            pending_bind: target.pending.is_some(),
        })
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn surface_of(&self, id: RenderTargetId) -> Option<SurfaceHandle> {
        self.targets.get(&id).map(|target| target.surface)
    }

    /// Destroy every surface and the container. Process teardown only.
    pub fn teardown(&mut self) {
        for (id, target) in self.targets.iter_mut() {
            target.pending = None;
            target.owner = None;
            target.holder = None;
            target.readiness = Readiness::Destroyed;
            if let Err(e) = self.host.destroy_surface(target.surface) {
                warn!(target = %id, error = %e, "Failed to destroy surface");
            }
        }
        self.pool.clear();
        if let Some(container) = self.container.take() {
            if let Err(e) = self.host.destroy_container(container) {
                warn!(error = %e, "Failed to destroy render container");
            }
            info!(targets = self.targets.len(), "Render container torn down");
        }
        self.container_visible = false;
    }

    fn target_mut(&mut self, id: RenderTargetId) -> Result<&mut RenderTarget> {
        self.targets
            .get_mut(&id)
            .ok_or_else(|| PlaybackError::Internal(format!("unknown render target {}", id)))
    }

    fn effective_container_visibility(&self) -> bool {
        self.requested_container_visible || self.targets.values().any(|t| t.owner.is_some())
    }

    fn sync_container_visibility(&mut self) {
        let Some(container) = self.container else {
            return;
        };
        let visible = self.effective_container_visibility();
        if visible == self.container_visible {
            return;
        }
        match self.host.set_container_visible(container, visible) {
            Ok(()) => {
                self.container_visible = visible;
                self.emit(SurfaceEvent::ContainerVisibility { visible });
            }
            Err(e) => warn!(visible, error = %e, "Failed to update container visibility"),
        }
    }

    fn emit(&self, event: SurfaceEvent) {
        let _ = self.events.emit(CoreEvent::Surface(event));
    }
}

impl Drop for RenderTargetBroker {
    fn drop(&mut self) {
        if self.container.is_some() {
            self.teardown();
        }
    }
}
