//! Status projection: publishes session status to external consumers.
//!
//! Two `tokio::sync::watch` channels are maintained:
//!
//! - the full [`SessionStatus`] (`connected`, `initializing`, `last_error`)
//! - a bare `bool` that is true while audio is active
//!
//! The boolean only notifies receivers when its value actually changes:
//! true the instant `Active` is entered, false the instant `Idle` is
//! entered.

use dambru_core::{SessionState, SessionStatus};
use tokio::sync::watch;

/// Publisher side of the session status signals.
pub struct StatusProjection {
    status_tx: watch::Sender<SessionStatus>,
    active_tx: watch::Sender<bool>,
}

impl Default for StatusProjection {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusProjection {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::idle());
        let (active_tx, _) = watch::channel(false);
        Self {
            status_tx,
            active_tx,
        }
    }

    /// Receiver for the full status.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Receiver for the "audio is active" boolean.
    pub fn subscribe_active(&self) -> watch::Receiver<bool> {
        self.active_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionStatus {
        self.status_tx.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        *self.active_tx.borrow()
    }

    /// Project a state transition onto the status flags.
    pub fn set_state(&self, state: SessionState) {
        self.update(|status| {
            status.state = state;
            status.connected = state == SessionState::Active;
            status.initializing = state == SessionState::Connecting;
        });
    }

    /// Begin a new start attempt: clears any previous error.
    pub fn begin_connect(&self) {
        self.update(|status| {
            status.state = SessionState::Connecting;
            status.connected = false;
            status.initializing = true;
            status.last_error = None;
        });
    }

    /// Surface a user-visible error message.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|status| status.last_error = Some(message));
    }

    fn update(&self, apply: impl FnOnce(&mut SessionStatus)) {
        self.status_tx.send_if_modified(|status| {
            let before = status.clone();
            apply(status);
            *status != before
        });

        let connected = self.status_tx.borrow().connected;
        self.active_tx.send_if_modified(|active| {
            if *active == connected {
                false
            } else {
                *active = connected;
                true
            }
        });
    }
}
