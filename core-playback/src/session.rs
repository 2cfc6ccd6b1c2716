//! # Playback Session
//!
//! One session wraps one media engine. Its kind is fixed at creation and
//! decides what the session carries:
//!
//! - **Video** sessions hold at most one render target. The target is
//!   allocated on the first `play()` and kept across pause, stop and hide so
//!   the decoder's surface binding survives; only `release()` gives it back.
//! - **Audio** sessions never hold a target. They carry an end-of-stream
//!   latch that fires once per natural completion of a `play()`.
//!
//! ## States
//!
//! ```text
//! Idle ─play─> Preparing ─engine ready─> Ready | Playing ⇄ Paused
//!                  ▲                            │
//!                  └──── play / show ─── Stopped ┘ (stop or natural end)
//! any ─release─> Released (terminal)
//! ```
//!
//! Engine failures surface as [`PlaybackError::OperationFailed`] and are
//! neither retried nor rolled back.

use bridge_traits::{ContentType, EngineState, MediaEngine, MediaSource, SurfaceHandle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::broker::{AttachOutcome, BindTicket, DetachOutcome, RenderTargetBroker};
use crate::error::{PlaybackError, Result};
use crate::ids::{RenderTargetId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Video,
    Audio,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Video => "video",
            SessionKind::Audio => "audio",
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            SessionKind::Video => ContentType::Movie,
            SessionKind::Audio => ContentType::Music,
        }
    }
}

impl FromStr for SessionKind {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(SessionKind::Video),
            "audio" => Ok(SessionKind::Audio),
            other => Err(PlaybackError::Validation(format!(
                "unknown player kind '{}', expected 'video' or 'audio'",
                other
            ))),
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Preparing,
    Ready,
    Playing,
    Paused,
    Stopped,
    Released,
}

impl SessionState {
    fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Preparing | SessionState::Ready | SessionState::Playing
        )
    }
}

#[derive(Debug, Default)]
pub struct VideoSlot {
    target: Option<RenderTargetId>,
    bound_surface: Option<SurfaceHandle>,
    visible: bool,
}

#[derive(Debug, Default)]
pub struct AudioSlot {
    end_armed: bool,
}

impl AudioSlot {
    fn arm(&mut self) {
        self.end_armed = true;
    }

    /// Returns `true` only for the first end-of-stream after arming.
    fn fire(&mut self) -> bool {
        std::mem::take(&mut self.end_armed)
    }
}

/// What a session carries, by kind.
#[derive(Debug)]
pub enum MediaSlot {
    Video(VideoSlot),
    Audio(AudioSlot),
}

impl MediaSlot {
    fn for_kind(kind: SessionKind) -> Self {
        match kind {
            SessionKind::Video => MediaSlot::Video(VideoSlot::default()),
            SessionKind::Audio => MediaSlot::Audio(AudioSlot::default()),
        }
    }
}

/// Session-level consequence of an engine notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTransition {
    Ready,
    Playing,
    /// Natural end of stream. `audio_ended` is set when the audio latch fired.
    Ended { audio_ended: bool },
}

/// Immutable view of a session for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: SessionId,
    pub kind: SessionKind,
    pub state: SessionState,
    pub volume: f32,
    pub render_target: Option<RenderTargetId>,
    pub visible: bool,
}

pub struct Session {
    id: SessionId,
    kind: SessionKind,
    state: SessionState,
    volume: f32,
    engine: Box<dyn MediaEngine>,
    slot: MediaSlot,
    autoplay: bool,
    last_source: Option<MediaSource>,
}

impl Session {
    /// Configure a freshly created engine for `kind`. The engine is released
    /// if configuration fails.
    pub fn new(
        id: SessionId,
        kind: SessionKind,
        volume: f32,
        mut engine: Box<dyn MediaEngine>,
    ) -> Result<Self> {
        let configured = engine
            .set_content_type(kind.content_type())
            .and_then(|()| engine.set_volume(volume));
        if let Err(e) = configured {
            engine.release();
            return Err(e.into());
        }
        Ok(Self {
            id,
            kind,
            state: SessionState::Idle,
            volume,
            engine,
            slot: MediaSlot::for_kind(kind),
            autoplay: false,
            last_source: None,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn render_target(&self) -> Option<RenderTargetId> {
        match &self.slot {
            MediaSlot::Video(slot) => slot.target,
            MediaSlot::Audio(_) => None,
        }
    }

    /// Load `source` and start playback.
    ///
    /// A running source is stopped first. Video sessions have their render
    /// target attached before `prepare()`; the returned ticket resolves once
    /// a pending surface is bound.
    pub fn play(
        &mut self,
        broker: &mut RenderTargetBroker,
        source: MediaSource,
        visible: bool,
    ) -> Result<Option<BindTicket>> {
        self.unload_source()?;

        let ticket = match &mut self.slot {
            MediaSlot::Video(slot) => {
                if slot.target.is_none() {
                    slot.target = Some(broker.acquire_target(self.id)?);
                }
                let ticket = attach_video(self.id, self.engine.as_mut(), slot, broker)?;
                set_video_visible(slot, broker, visible)?;
                ticket
            }
            MediaSlot::Audio(_) => {
                self.engine.set_video_surface(None)?;
                None
            }
        };

        self.start(source)?;
        Ok(ticket)
    }

    pub fn pause(&mut self) -> Result<bool> {
        if !self.state.is_active() {
            return Ok(false);
        }
        self.engine.pause()?;
        self.autoplay = false;
        self.state = SessionState::Paused;
        Ok(true)
    }

    /// Stop playback. A video target stays allocated and keeps its binding.
    pub fn stop(&mut self, broker: &mut RenderTargetBroker) -> Result<bool> {
        if matches!(self.state, SessionState::Idle | SessionState::Stopped) {
            return Ok(false);
        }
        self.engine.stop()?;
        self.autoplay = false;
        self.state = SessionState::Stopped;
        match &mut self.slot {
            MediaSlot::Video(slot) => {
                if let Some(target) = slot.target {
                    broker.detach(self.id, target, false)?;
                    slot.visible = false;
                }
            }
            MediaSlot::Audio(slot) => {
                slot.fire();
            }
        }
        Ok(true)
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.engine.set_volume(volume)?;
        self.volume = volume;
        Ok(())
    }

    pub fn hide(&mut self, broker: &mut RenderTargetBroker) -> Result<()> {
        if let MediaSlot::Video(slot) = &mut self.slot {
            if let Some(target) = slot.target {
                broker.detach(self.id, target, false)?;
            }
            slot.visible = false;
        }
        Ok(())
    }

    /// Make the session visible again, resuming a paused session and
    /// replaying a stopped one.
    pub fn show(&mut self, broker: &mut RenderTargetBroker) -> Result<Option<BindTicket>> {
        let ticket = match &mut self.slot {
            MediaSlot::Video(slot) => match slot.target {
                Some(_) => {
                    let ticket = attach_video(self.id, self.engine.as_mut(), slot, broker)?;
                    set_video_visible(slot, broker, true)?;
                    ticket
                }
                None => {
                    slot.visible = true;
                    None
                }
            },
            MediaSlot::Audio(_) => None,
        };

        match self.state {
            SessionState::Paused => {
                self.engine.play()?;
                self.engine.set_volume(self.volume)?;
                self.autoplay = true;
                self.state = SessionState::Playing;
            }
            SessionState::Stopped => {
                if let Some(source) = self.last_source.clone() {
                    self.start(source)?;
                }
            }
            _ => {}
        }
        Ok(ticket)
    }

    /// Tear the session down. Best effort: failures are logged and the
    /// session always ends up released.
    pub fn release(&mut self, broker: &mut RenderTargetBroker) {
        if self.state == SessionState::Released {
            return;
        }
        if let Err(e) = self.engine.stop() {
            warn!(session = %self.id, error = %e, "Engine stop failed during release");
        }
        if let MediaSlot::Video(slot) = &mut self.slot {
            if let Some(target) = slot.target.take() {
                match broker.detach(self.id, target, true) {
                    Ok(DetachOutcome::ClearBinding) | Ok(DetachOutcome::Retained) => {}
                    Err(e) => warn!(session = %self.id, error = %e, "Detach failed during release"),
                }
            }
            if slot.bound_surface.take().is_some() {
                if let Err(e) = self.engine.set_video_surface(None) {
                    warn!(session = %self.id, error = %e, "Failed to clear video surface");
                }
            }
            slot.visible = false;
        }
        self.engine.release();
        self.last_source = None;
        self.state = SessionState::Released;
    }

    /// A pending bind for this session completed.
    pub fn on_surface_bound(&mut self, surface: SurfaceHandle) -> Result<()> {
        if let MediaSlot::Video(slot) = &mut self.slot {
            bind_surface(self.engine.as_mut(), slot, surface)?;
        }
        Ok(())
    }

    /// The host destroyed this session's surface. A visible session asks for
    /// a new bind so playback picks up when the host recreates it.
    pub fn surface_lost(&mut self, broker: &mut RenderTargetBroker) -> Result<Option<BindTicket>> {
        let MediaSlot::Video(slot) = &mut self.slot else {
            return Ok(None);
        };
        if slot.bound_surface.take().is_some() {
            self.engine.set_video_surface(None)?;
        }
        if slot.visible && slot.target.is_some() && self.state != SessionState::Released {
            return attach_video(self.id, self.engine.as_mut(), slot, broker);
        }
        Ok(None)
    }

    /// Apply an engine state notification.
    pub fn on_engine_state(&mut self, engine_state: EngineState) -> Option<EngineTransition> {
        match engine_state {
            EngineState::Ready if self.state == SessionState::Preparing => {
                if self.autoplay {
                    self.state = SessionState::Playing;
                    Some(EngineTransition::Playing)
                } else {
                    self.state = SessionState::Ready;
                    Some(EngineTransition::Ready)
                }
            }
            EngineState::Ended if self.state.is_active() => {
                self.state = SessionState::Stopped;
                self.autoplay = false;
                let audio_ended = match &mut self.slot {
                    MediaSlot::Audio(slot) => slot.fire(),
                    MediaSlot::Video(_) => false,
                };
                Some(EngineTransition::Ended { audio_ended })
            }
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SessionInfo {
        let visible = match &self.slot {
            MediaSlot::Video(slot) => slot.visible,
            MediaSlot::Audio(_) => false,
        };
        SessionInfo {
            id: self.id,
            kind: self.kind,
            state: self.state,
            volume: self.volume,
            render_target: self.render_target(),
            visible,
        }
    }

    /// Stop an engine that still holds a source, including one that ended on
    /// its own.
    fn unload_source(&mut self) -> Result<()> {
        if self.engine.state() != EngineState::Idle {
            debug!(session = %self.id, "Stopping current source before swap");
            self.engine.stop()?;
        }
        Ok(())
    }

    fn start(&mut self, source: MediaSource) -> Result<()> {
        self.unload_source()?;
        self.engine.set_source(source.clone())?;
        self.last_source = Some(source);
        if let MediaSlot::Audio(slot) = &mut self.slot {
            slot.arm();
        }
        self.state = SessionState::Preparing;
        self.autoplay = true;
        self.engine.prepare()?;
        self.engine.set_volume(self.volume)?;
        self.engine.play()?;
        self.engine.set_volume(self.volume)?;
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("volume", &self.volume)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

fn attach_video(
    session: SessionId,
    engine: &mut dyn MediaEngine,
    slot: &mut VideoSlot,
    broker: &mut RenderTargetBroker,
) -> Result<Option<BindTicket>> {
    let Some(target) = slot.target else {
        return Ok(None);
    };
    match broker.attach(session, target)? {
        AttachOutcome::Bound(surface) => {
            bind_surface(engine, slot, surface)?;
            Ok(None)
        }
        AttachOutcome::Pending(ticket) => Ok(Some(ticket)),
    }
}

fn bind_surface(
    engine: &mut dyn MediaEngine,
    slot: &mut VideoSlot,
    surface: SurfaceHandle,
) -> Result<()> {
    if slot.bound_surface != Some(surface) {
        engine.set_video_surface(Some(surface))?;
        slot.bound_surface = Some(surface);
    }
    Ok(())
}

fn set_video_visible(
    slot: &mut VideoSlot,
    broker: &mut RenderTargetBroker,
    visible: bool,
) -> Result<()> {
    if let Some(target) = slot.target {
        broker.set_visible(target, visible)?;
    }
    slot.visible = visible;
    Ok(())
}
