//! Companion service: runs a [`SessionManager`] on its own worker.
//!
//! Commands are enqueued on an unbounded channel and applied one at a time
//! on a blocking worker, since device open/close may block. Transport and
//! playback callbacks feed into the same channel, so the session state is
//! only ever touched from that worker.

use std::sync::Arc;

use dambru_core::{LiveTransport, PersonaConfig, SessionStatus};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::audio_io::AudioBackend;
use crate::error::VoiceError;
use crate::session::{SessionConfig, SessionEvent, SessionManager};

/// Handle to a running session worker.
pub struct CompanionService {
    events: mpsc::UnboundedSender<SessionEvent>,
    status: watch::Receiver<SessionStatus>,
    active: watch::Receiver<bool>,
    worker: Option<JoinHandle<()>>,
}

impl CompanionService {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn spawn(
        transport: Arc<dyn LiveTransport>,
        audio: Arc<dyn AudioBackend>,
        persona: PersonaConfig,
        config: SessionConfig,
    ) -> Self {
        let (events, mut rx) = mpsc::unbounded_channel();
        let mut manager = SessionManager::new(transport, audio, persona, config, events.clone());
        let status = manager.status().subscribe();
        let active = manager.status().subscribe_active();

        let worker = tokio::task::spawn_blocking(move || {
            while let Some(event) = rx.blocking_recv() {
                if !manager.dispatch(event) {
                    break;
                }
            }
            tracing::debug!("Session worker exited");
        });

        Self {
            events,
            status,
            active,
            worker: Some(worker),
        }
    }

    /// Request a new session with the current persona.
    pub fn start(&self) -> Result<(), VoiceError> {
        self.send(SessionEvent::Start)
    }

    /// Request the session to end.
    pub fn stop(&self) -> Result<(), VoiceError> {
        self.send(SessionEvent::Stop)
    }

    /// Switch persona; a running session ends.
    pub fn select_persona(&self, persona: PersonaConfig) -> Result<(), VoiceError> {
        self.send(SessionEvent::SelectPersona(persona))
    }

    /// Receiver for the full session status.
    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Receiver for the "audio is active" boolean.
    pub fn active(&self) -> watch::Receiver<bool> {
        self.active.clone()
    }

    pub fn snapshot(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Tear down any session and wait for the worker to finish.
    pub async fn shutdown(mut self) {
        let _ = self.events.send(SessionEvent::Shutdown);
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                tracing::error!(%err, "Session worker panicked");
            }
        }
    }

    fn send(&self, event: SessionEvent) -> Result<(), VoiceError> {
        self.events
            .send(event)
            .map_err(|_| VoiceError::ServiceStopped)
    }
}

impl Drop for CompanionService {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.events.send(SessionEvent::Shutdown);
        }
    }
}
