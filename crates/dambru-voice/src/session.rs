//! Session lifecycle state machine.
//!
//! [`SessionManager`] exclusively owns the live session handle, the capture
//! pipeline and the playback scheduler. Every input (user commands,
//! transport callbacks, playback completions) arrives as a [`SessionEvent`]
//! and is applied by [`SessionManager::dispatch`] on a single thread.
//!
//! # State transitions
//!
//! ```text
//! Idle ──start──► Connecting ──Opened──► Active
//!   ▲                 │                    │
//!   └──── teardown ◄──┴── stop / Error / Closed / persona change
//! ```
//!
//! Transport and playback callbacks are tagged with the session
//! *generation* they were created for. The generation advances on every
//! start and every teardown, so late callbacks from a closed session are
//! ignored instead of affecting its successor.

use std::sync::Arc;

use dambru_core::{
    DEFAULT_CAPTURE_FRAME_SIZE, DEFAULT_LIVE_MODEL, LiveConnectConfig, LiveMessage,
    LiveSessionHandle, LiveTransport, PersonaConfig, START_FAILED_MESSAGE, SessionState,
    Settings, TRANSPORT_ERROR_MESSAGE, TransportEvent, TransportEventSink,
};
use tokio::sync::mpsc;

use crate::audio_io::{AudioBackend, PlaybackCompletion, PlaybackId};
use crate::error::VoiceError;
use crate::playback::PlaybackScheduler;
use crate::status::StatusProjection;
use crate::uplink::CapturePipeline;

/// Connection-independent session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Live model name.
    pub live_model: String,
    /// Samples per outbound capture frame.
    pub capture_frame_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            live_model: DEFAULT_LIVE_MODEL.to_string(),
            capture_frame_size: DEFAULT_CAPTURE_FRAME_SIZE,
        }
    }
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            live_model: settings.effective_live_model().to_string(),
            capture_frame_size: settings.effective_capture_frame_size(),
        }
    }
}

/// Everything the state machine reacts to.
#[derive(Debug)]
pub enum SessionEvent {
    /// User asked to start a session.
    Start,
    /// User asked to stop the session.
    Stop,
    /// A different persona was selected.
    SelectPersona(PersonaConfig),
    /// Callback from the live transport.
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    /// A playback unit finished on its own.
    PlaybackEnded { generation: u64, id: PlaybackId },
    /// Tear down and stop processing events.
    Shutdown,
}

/// Result of a start request.
#[derive(Debug)]
pub enum StartOutcome {
    /// Handshake initiated; the session is `Connecting`.
    Started,
    /// A session is already connecting or active. Nothing changed.
    AlreadyRunning,
    /// Devices or transport could not be opened; the session is `Idle`.
    Failed(VoiceError),
}

/// Owns one live session at a time and its audio pipelines.
pub struct SessionManager {
    state: SessionState,
    persona: PersonaConfig,
    config: SessionConfig,
    generation: u64,
    transport: Arc<dyn LiveTransport>,
    audio: Arc<dyn AudioBackend>,
    link: Option<Arc<dyn LiveSessionHandle>>,
    capture: Option<CapturePipeline>,
    playback: Option<PlaybackScheduler>,
    status: StatusProjection,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionManager {
    /// Create an idle manager. Callbacks are routed back through `events`.
    pub fn new(
        transport: Arc<dyn LiveTransport>,
        audio: Arc<dyn AudioBackend>,
        persona: PersonaConfig,
        config: SessionConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            persona,
            config,
            generation: 0,
            transport,
            audio,
            link: None,
            capture: None,
            playback: None,
            status: StatusProjection::new(),
            events,
        }
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn status(&self) -> &StatusProjection {
        &self.status
    }

    /// Playback scheduler of the running session, if any.
    pub const fn playback(&self) -> Option<&PlaybackScheduler> {
        self.playback.as_ref()
    }

    pub const fn has_session_handle(&self) -> bool {
        self.link.is_some()
    }

    /// Apply one event. Returns `false` once the manager has shut down.
    pub fn dispatch(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Start => {
                self.start();
            }
            SessionEvent::Stop => self.stop(),
            SessionEvent::SelectPersona(persona) => self.select_persona(persona),
            SessionEvent::Transport { generation, event } => {
                if generation == self.generation {
                    self.on_transport_event(event);
                } else {
                    tracing::trace!(
                        generation,
                        current = self.generation,
                        "Ignoring stale transport event"
                    );
                }
            }
            SessionEvent::PlaybackEnded { generation, id } => {
                if generation == self.generation {
                    if let Some(playback) = self.playback.as_mut() {
                        playback.on_completed(id);
                    }
                }
            }
            SessionEvent::Shutdown => {
                self.stop();
                return false;
            }
        }
        true
    }

    /// Acquire devices and begin the handshake with the current persona.
    pub fn start(&mut self) -> StartOutcome {
        if self.state != SessionState::Idle {
            tracing::debug!(state = %self.state, "Start ignored: session already running");
            return StartOutcome::AlreadyRunning;
        }

        self.generation += 1;
        self.set_state(SessionState::Connecting);
        self.status.begin_connect();
        tracing::info!(
            persona = %self.persona.id,
            voice = %self.persona.voice_id,
            generation = self.generation,
            "Starting live session"
        );

        match self.open_session() {
            Ok(()) => StartOutcome::Started,
            Err(err) => {
                tracing::warn!(%err, "Failed to start live session");
                self.teardown();
                self.status.set_error(START_FAILED_MESSAGE);
                StartOutcome::Failed(err)
            }
        }
    }

    /// End the session. A no-op when already idle.
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            tracing::debug!("Stop ignored: session already idle");
            return;
        }
        self.set_state(SessionState::Closing);
        self.teardown();
    }

    /// Switch persona. A running session is torn down and not reconnected.
    pub fn select_persona(&mut self, persona: PersonaConfig) {
        if persona == self.persona {
            return;
        }
        if self.state != SessionState::Idle {
            tracing::info!(
                from = %self.persona.id,
                to = %persona.id,
                "Persona changed mid-session; ending session"
            );
            self.stop();
        }
        self.persona = persona;
    }

    fn open_session(&mut self) -> Result<(), VoiceError> {
        let generation = self.generation;

        let input = self.audio.open_input(self.config.capture_frame_size)?;
        self.capture = Some(CapturePipeline::new(input));

        let events = self.events.clone();
        let on_complete: PlaybackCompletion = Arc::new(move |id| {
            let _ = events.send(SessionEvent::PlaybackEnded { generation, id });
        });
        let output = self.audio.open_output(on_complete)?;
        self.playback = Some(PlaybackScheduler::new(output));

        let events = self.events.clone();
        let on_event: TransportEventSink = Arc::new(move |event| {
            let _ = events.send(SessionEvent::Transport { generation, event });
        });
        let connect = LiveConnectConfig::for_persona(&self.config.live_model, &self.persona);
        self.link = Some(self.transport.connect(connect, on_event)?);

        Ok(())
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::Message(message) => self.on_message(&message),
            TransportEvent::Error(message) => {
                tracing::error!(error = %message, "Live session error");
                self.teardown();
                self.status.set_error(TRANSPORT_ERROR_MESSAGE);
            }
            TransportEvent::Closed { reason } => {
                tracing::info!(
                    reason = reason.as_deref().unwrap_or("none"),
                    "Live session closed by remote"
                );
                self.teardown();
            }
        }
    }

    fn on_opened(&mut self) {
        if self.state != SessionState::Connecting {
            tracing::debug!(state = %self.state, "Ignoring duplicate open");
            return;
        }
        let (Some(link), Some(capture)) = (self.link.clone(), self.capture.as_mut()) else {
            return;
        };

        if let Err(err) = capture.start(link) {
            tracing::error!(%err, "Failed to start microphone streaming");
            self.teardown();
            self.status.set_error(START_FAILED_MESSAGE);
            return;
        }

        self.set_state(SessionState::Active);
        tracing::info!(persona = %self.persona.id, "Live session active");
    }

    fn on_message(&mut self, message: &LiveMessage) {
        if self.state != SessionState::Active {
            tracing::trace!(state = %self.state, "Ignoring message outside active session");
            return;
        }
        let Some(playback) = self.playback.as_mut() else {
            return;
        };

        if message.interrupted {
            playback.interrupt();
        }

        for chunk in &message.audio {
            if let Err(err) = playback.schedule_chunk(chunk) {
                if err.is_fatal() {
                    tracing::error!(%err, "Failed to schedule audio chunk");
                } else {
                    tracing::warn!(%err, "Dropping malformed audio chunk");
                }
            }
        }

        if message.turn_complete {
            tracing::trace!(in_flight = playback.in_flight(), "Model turn complete");
        }
    }

    /// Release everything the session holds. Every exit path ends here.
    ///
    /// Each step is guarded individually; a failure in one never skips the
    /// others.
    fn teardown(&mut self) {
        self.generation += 1;

        if let Some(link) = self.link.take() {
            link.close();
        }
        if let Some(capture) = self.capture.take() {
            if let Err(err) = capture.stop() {
                tracing::warn!(%err, "Failed to release microphone");
            }
        }
        if let Some(playback) = self.playback.take() {
            playback.shutdown();
        }

        self.set_state(SessionState::Idle);
    }

    fn set_state(&mut self, new_state: SessionState) {
        if self.state != new_state {
            tracing::debug!(old = %self.state, new = %new_state, "Session state transition");
            self.state = new_state;
            self.status.set_state(new_state);
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}
