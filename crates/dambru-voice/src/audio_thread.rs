//! Dedicated audio I/O thread: isolates `!Send` audio resources from the async runtime.
//!
//! `cpal::Stream` (capture) and `rodio::OutputStream` (playback) are `!Send` on
//! some platforms. Rather than using `unsafe impl Send/Sync`, we confine both
//! types to a single OS thread and communicate via channels.
//!
//! The public [`AudioThreadHandle`] is the `Send + Sync` proxy that the device
//! backend holds. Device contexts are opened lazily, one session at a time.

use std::sync::mpsc;
use std::thread;

use dambru_core::PLAYBACK_SAMPLE_RATE;

use crate::audio_io::{FrameCallback, PlaybackCompletion};
use crate::capture::AudioCapture;
use crate::error::VoiceError;
use crate::mixer::SharedMixer;
use crate::output::AudioPlayback;

// ── Commands ───────────────────────────────────────────────────────

/// A command sent from the device backend to the audio thread.
enum AudioCommand {
    /// Acquire the microphone.
    OpenInput {
        frame_size: usize,
        reply: mpsc::Sender<Result<(), VoiceError>>,
    },

    /// Begin delivering capture frames to `on_frame`.
    StartStreaming {
        on_frame: FrameCallback,
        reply: mpsc::Sender<Result<(), VoiceError>>,
    },

    /// Stop capture and release the microphone.
    ReleaseInput { reply: mpsc::Sender<()> },

    /// Open the output device and return its mixer.
    OpenOutput {
        on_complete: PlaybackCompletion,
        reply: mpsc::Sender<Result<SharedMixer, VoiceError>>,
    },

    /// Stop playback and release the output device.
    ReleaseOutput { reply: mpsc::Sender<()> },

    /// Shut down the audio thread, releasing all resources.
    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `Send + Sync` handle to the dedicated audio I/O thread.
///
/// All methods take `&self`. Request–reply methods block the caller until
/// the audio thread responds; this latency is negligible (local channel I/O
/// plus the device operation itself).
pub struct AudioThreadHandle {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioThreadHandle {
    /// Spawn the audio thread. No device is opened until requested.
    pub fn spawn() -> Result<Self, VoiceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();

        let thread = thread::Builder::new()
            .name("dambru-audio".into())
            .spawn(move || Self::run(&cmd_rx))
            .map_err(|e| {
                VoiceError::InputStreamError(format!("failed to spawn audio thread: {e}"))
            })?;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    // ── Capture ────────────────────────────────────────────────────

    /// Acquire the microphone for frames of `frame_size` samples.
    pub fn open_input(&self, frame_size: usize) -> Result<(), VoiceError> {
        self.send_and_recv(|reply| AudioCommand::OpenInput { frame_size, reply })
    }

    /// Begin delivering capture frames.
    pub fn start_streaming(&self, on_frame: FrameCallback) -> Result<(), VoiceError> {
        self.send_and_recv(|reply| AudioCommand::StartStreaming { on_frame, reply })
    }

    /// Release the microphone. Returns once the stream has been dropped.
    pub fn release_input(&self) -> Result<(), VoiceError> {
        self.query(|reply| AudioCommand::ReleaseInput { reply })
            .ok_or(VoiceError::AudioThreadDied)
    }

    // ── Playback ───────────────────────────────────────────────────

    /// Open the output device at the model's playback rate.
    pub fn open_output(&self, on_complete: PlaybackCompletion) -> Result<SharedMixer, VoiceError> {
        self.send_and_recv(|reply| AudioCommand::OpenOutput { on_complete, reply })
    }

    /// Release the output device.
    pub fn release_output(&self) -> Result<(), VoiceError> {
        self.query(|reply| AudioCommand::ReleaseOutput { reply })
            .ok_or(VoiceError::AudioThreadDied)
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Send a command that expects a `Result<T, VoiceError>` reply. Creates
    /// a one-shot reply channel, sends the command, and blocks until the
    /// audio thread responds. Channel failures map to
    /// [`VoiceError::AudioThreadDied`].
    fn send_and_recv<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<Result<T, VoiceError>>) -> AudioCommand,
    ) -> Result<T, VoiceError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx
            .send(build(tx))
            .map_err(|_| VoiceError::AudioThreadDied)?;
        rx.recv().map_err(|_| VoiceError::AudioThreadDied)?
    }

    /// Like `send_and_recv` but for commands that return a bare value.
    /// Returns `None` if the thread is dead.
    fn query<T>(&self, build: impl FnOnce(mpsc::Sender<T>) -> AudioCommand) -> Option<T> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx.send(build(tx)).ok()?;
        rx.recv().ok()
    }

    // ── Audio thread event loop ────────────────────────────────────

    /// The body of the dedicated audio thread. Owns `AudioCapture` and
    /// `AudioPlayback` for their entire lifetime; they never cross thread
    /// boundaries.
    fn run(cmd_rx: &mpsc::Receiver<AudioCommand>) {
        let mut capture: Option<AudioCapture> = None;
        let mut playback: Option<AudioPlayback> = None;

        tracing::debug!("Audio thread started");

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::OpenInput { frame_size, reply } => {
                    if capture.take().is_some() {
                        tracing::warn!("Replacing an open microphone stream");
                    }
                    let result = AudioCapture::open(frame_size).map(|c| {
                        capture = Some(c);
                    });
                    let _ = reply.send(result);
                }
                AudioCommand::StartStreaming { on_frame, reply } => {
                    let result = capture.as_ref().map_or_else(
                        || {
                            Err(VoiceError::InputStreamError(
                                "microphone is not open".to_string(),
                            ))
                        },
                        |c| c.start_streaming(on_frame),
                    );
                    let _ = reply.send(result);
                }
                AudioCommand::ReleaseInput { reply } => {
                    if let Some(mut c) = capture.take() {
                        c.release();
                    }
                    let _ = reply.send(());
                }
                AudioCommand::OpenOutput { on_complete, reply } => {
                    if playback.take().is_some() {
                        tracing::warn!("Replacing an open output device");
                    }
                    let result = AudioPlayback::open(PLAYBACK_SAMPLE_RATE, on_complete).map(|p| {
                        let mixer = p.mixer();
                        playback = Some(p);
                        mixer
                    });
                    let _ = reply.send(result);
                }
                AudioCommand::ReleaseOutput { reply } => {
                    playback.take();
                    let _ = reply.send(());
                }
                AudioCommand::Shutdown => break,
            }
        }

        drop(capture);
        drop(playback);
        tracing::debug!("Audio thread exiting");
    }
}

impl Drop for AudioThreadHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Audio thread panicked during shutdown");
            }
        }
    }
}
