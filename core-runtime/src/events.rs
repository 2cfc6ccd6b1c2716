//! # Event Bus System
//!
//! Outward notifications of the playback core, published over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wraps per-domain enums
//!   ([`SessionEvent`], [`SurfaceEvent`])
//! - **EventBus**: cloneable publisher; emitting never blocks, which matters
//!   because the owner thread emits
//! - **EventStream**: receiver wrapper with filtering
//!
//! ```text
//!  owner thread                          transport / host
//!  ────────────        ┌───────────┐     ───────────────
//!  Session ──emit────> │ EventBus  │ ──> EventStream (audioPlaybackEnded)
//!  Broker  ──emit────> │ broadcast │ ──> EventStream (diagnostics)
//!                      └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, SessionEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut ended = EventStream::new(bus.subscribe()).filter(|event| {
//!     matches!(event, CoreEvent::Session(SessionEvent::AudioPlaybackEnded { .. }))
//! });
//!
//! bus.emit(CoreEvent::Session(SessionEvent::AudioPlaybackEnded {
//!     session_id: "7d0c".to_string(),
//! }))
//! .ok();
//!
//! let event = ended.recv().await.unwrap();
//! assert_eq!(event.session_id(), Some("7d0c"));
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError, Receiver};

use crate::config::DEFAULT_EVENT_BUFFER_SIZE;

// ============================================================================
// Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session lifecycle events
    Session(SessionEvent),
    /// Container and render-target events
    Surface(SurfaceEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Surface(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Session(SessionEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Surface(SurfaceEvent::TargetLost { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::AudioPlaybackEnded { .. })
            | CoreEvent::Session(SessionEvent::Created { .. })
            | CoreEvent::Session(SessionEvent::Released { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// The session this event concerns, if any.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Session(e) => Some(e.session_id()),
            CoreEvent::Surface(SurfaceEvent::TargetBound { session_id, .. }) => {
                Some(session_id.as_str())
            }
            CoreEvent::Surface(_) => None,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Session Events
// ============================================================================

/// Events describing playback session lifecycle.
///
/// Session ids are carried in their hyphenated string form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A session was created.
    Created {
        session_id: String,
        /// `"video"` or `"audio"`.
        kind: String,
        volume: f32,
    },
    /// A source was handed to the engine and is loading.
    Preparing { session_id: String },
    /// The engine started rendering.
    Playing { session_id: String },
    Paused { session_id: String },
    Stopped { session_id: String },
    /// An audio session reached the natural end of its stream. Emitted at
    /// most once per `play()`.
    AudioPlaybackEnded { session_id: String },
    /// The engine reported an asynchronous failure.
    Error { session_id: String, message: String },
    Released { session_id: String },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Created { .. } => "Session created",
            SessionEvent::Preparing { .. } => "Session preparing",
            SessionEvent::Playing { .. } => "Session playing",
            SessionEvent::Paused { .. } => "Session paused",
            SessionEvent::Stopped { .. } => "Session stopped",
            SessionEvent::AudioPlaybackEnded { .. } => "Audio playback ended",
            SessionEvent::Error { .. } => "Session error",
            SessionEvent::Released { .. } => "Session released",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::Created { session_id, .. }
            | SessionEvent::Preparing { session_id }
            | SessionEvent::Playing { session_id }
            | SessionEvent::Paused { session_id }
            | SessionEvent::Stopped { session_id }
            | SessionEvent::AudioPlaybackEnded { session_id }
            | SessionEvent::Error { session_id, .. }
            | SessionEvent::Released { session_id } => session_id,
        }
    }
}

// ============================================================================
// Surface Events
// ============================================================================

/// Events describing the shared container and its render targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SurfaceEvent {
    /// The background container was attached to the host root.
    ContainerCreated { z_order: i32 },
    /// Effective container visibility changed.
    ContainerVisibility { visible: bool },
    TargetCreated { target_id: u64 },
    /// A decoder was bound to the target's surface.
    TargetBound { target_id: u64, session_id: String },
    /// The host destroyed the surface; the target is unbound.
    TargetLost { target_id: u64 },
}

impl SurfaceEvent {
    fn description(&self) -> &str {
        match self {
            SurfaceEvent::ContainerCreated { .. } => "Container created",
            SurfaceEvent::ContainerVisibility { .. } => "Container visibility changed",
            SurfaceEvent::TargetCreated { .. } => "Render target created",
            SurfaceEvent::TargetBound { .. } => "Render target bound",
            SurfaceEvent::TargetLost { .. } => "Render target surface lost",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Slow subscribers observe `RecvError::Lagged` instead of slowing the
/// publisher down.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every publisher is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. Returns `None` when nothing matching is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
