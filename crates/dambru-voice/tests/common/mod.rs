//! In-memory transport and audio fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use dambru_core::{
    EncodedFrame, IncomingAudioChunk, LiveConnectConfig, LiveMessage, LivePortError,
    LiveSessionHandle, LiveTransport, PLAYBACK_SAMPLE_RATE, PersonaCatalog, PersonaConfig,
    SendFailure, TransportEvent, TransportEventSink,
};
use dambru_voice::{
    AudioBackend, AudioInput, AudioOutput, FrameCallback, PcmBuffer, PlaybackCompletion,
    PlaybackId, SessionConfig, SessionEvent, SessionManager, VoiceError,
};
use tokio::sync::mpsc;

// ── Transport ──────────────────────────────────────────────────────

/// Session handle that records frames and close calls.
#[derive(Default)]
pub struct RecordingLink {
    pub frames: Mutex<Vec<EncodedFrame>>,
    pub closes: AtomicUsize,
}

impl RecordingLink {
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl LiveSessionHandle for RecordingLink {
    fn send_audio(&self, frame: EncodedFrame) -> Result<(), SendFailure> {
        if self.close_count() > 0 {
            return Err(SendFailure("session closed".to_string()));
        }
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Transport that records every connect and hands out queued handles.
#[derive(Default)]
pub struct FakeTransport {
    pub connects: Mutex<Vec<(LiveConnectConfig, TransportEventSink)>>,
    pub handles: Mutex<VecDeque<Arc<dyn LiveSessionHandle>>>,
    pub links: Mutex<Vec<Arc<RecordingLink>>>,
    pub fail_with: Mutex<Option<LivePortError>>,
}

impl FakeTransport {
    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    pub fn push_handle(&self, handle: Arc<dyn LiveSessionHandle>) {
        self.handles.lock().unwrap().push_back(handle);
    }

    /// The most recently created recording link.
    pub fn last_link(&self) -> Arc<RecordingLink> {
        Arc::clone(self.links.lock().unwrap().last().expect("no link created"))
    }

    pub fn last_config(&self) -> LiveConnectConfig {
        self.connects.lock().unwrap().last().expect("no connect").0.clone()
    }

    /// Deliver `event` through the sink of connect number `index`.
    pub fn emit(&self, index: usize, event: TransportEvent) {
        let sink = Arc::clone(&self.connects.lock().unwrap()[index].1);
        sink(event);
    }

    /// Deliver `event` through the most recent sink.
    pub fn emit_last(&self, event: TransportEvent) {
        let index = self.connect_count() - 1;
        self.emit(index, event);
    }
}

impl LiveTransport for FakeTransport {
    fn connect(
        &self,
        config: LiveConnectConfig,
        on_event: TransportEventSink,
    ) -> Result<Arc<dyn LiveSessionHandle>, LivePortError> {
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        self.connects.lock().unwrap().push((config, on_event));
        if let Some(handle) = self.handles.lock().unwrap().pop_front() {
            return Ok(handle);
        }
        let link = Arc::new(RecordingLink::default());
        self.links.lock().unwrap().push(Arc::clone(&link));
        Ok(link)
    }
}

// ── Audio ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct DeviceLog {
    pub now: f64,
    pub deny_microphone: bool,
    pub inputs_opened: usize,
    pub inputs_released: usize,
    pub outputs_opened: usize,
    pub outputs_released: usize,
    pub started: Vec<(PlaybackId, f64, usize)>,
    pub stopped: Vec<PlaybackId>,
}

/// Shared fake audio devices.
#[derive(Clone, Default)]
pub struct FakeAudio {
    pub log: Arc<Mutex<DeviceLog>>,
    pub frame_sink: Arc<Mutex<Option<FrameCallback>>>,
    pub on_complete: Arc<Mutex<Option<PlaybackCompletion>>>,
}

impl FakeAudio {
    pub fn set_now(&self, now: f64) {
        self.log.lock().unwrap().now = now;
    }

    pub fn deny_microphone(&self) {
        self.log.lock().unwrap().deny_microphone = true;
    }

    /// Push one captured frame through the streaming callback.
    pub fn capture(&self, frame: &[f32]) {
        if let Some(cb) = self.frame_sink.lock().unwrap().as_mut() {
            cb(frame);
        }
    }

    /// Report natural completion of `id` the way the device would.
    pub fn complete(&self, id: PlaybackId) {
        let callback = self.on_complete.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(id);
        }
    }

    pub fn started(&self) -> Vec<(PlaybackId, f64, usize)> {
        self.log.lock().unwrap().started.clone()
    }

    pub fn stopped(&self) -> Vec<PlaybackId> {
        self.log.lock().unwrap().stopped.clone()
    }
}

struct FakeInput(FakeAudio);

impl AudioInput for FakeInput {
    fn start_streaming(&self, on_frame: FrameCallback) -> Result<(), VoiceError> {
        *self.0.frame_sink.lock().unwrap() = Some(on_frame);
        Ok(())
    }

    fn release(&self) -> Result<(), VoiceError> {
        *self.0.frame_sink.lock().unwrap() = None;
        self.0.log.lock().unwrap().inputs_released += 1;
        Ok(())
    }
}

struct FakeOutput(FakeAudio);

impl AudioOutput for FakeOutput {
    fn sample_rate(&self) -> u32 {
        PLAYBACK_SAMPLE_RATE
    }

    fn current_time(&self) -> f64 {
        self.0.log.lock().unwrap().now
    }

    fn start_at(&self, id: PlaybackId, buffer: PcmBuffer, when: f64) -> Result<(), VoiceError> {
        self.0.log.lock().unwrap().started.push((id, when, buffer.frames()));
        Ok(())
    }

    fn stop(&self, id: PlaybackId) -> Result<(), VoiceError> {
        self.0.log.lock().unwrap().stopped.push(id);
        Ok(())
    }

    fn release(&self) -> Result<(), VoiceError> {
        self.0.log.lock().unwrap().outputs_released += 1;
        Ok(())
    }
}

impl AudioBackend for FakeAudio {
    fn open_input(&self, _frame_size: usize) -> Result<Box<dyn AudioInput>, VoiceError> {
        let mut log = self.log.lock().unwrap();
        if log.deny_microphone {
            return Err(VoiceError::MicrophonePermissionDenied);
        }
        log.inputs_opened += 1;
        Ok(Box::new(FakeInput(self.clone())))
    }

    fn open_output(
        &self,
        on_complete: PlaybackCompletion,
    ) -> Result<Box<dyn AudioOutput>, VoiceError> {
        self.log.lock().unwrap().outputs_opened += 1;
        *self.on_complete.lock().unwrap() = Some(on_complete);
        Ok(Box::new(FakeOutput(self.clone())))
    }
}

// ── Harness ────────────────────────────────────────────────────────

pub struct Harness {
    pub manager: SessionManager,
    pub transport: Arc<FakeTransport>,
    pub audio: FakeAudio,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_persona(PersonaCatalog::builtin().default_persona().clone())
    }

    pub fn with_persona(persona: PersonaConfig) -> Self {
        let transport = Arc::new(FakeTransport::default());
        let audio = FakeAudio::default();
        let (tx, events) = mpsc::unbounded_channel();
        let manager = SessionManager::new(
            Arc::clone(&transport) as Arc<dyn LiveTransport>,
            Arc::new(audio.clone()),
            persona,
            SessionConfig::default(),
            tx,
        );
        Self {
            manager,
            transport,
            audio,
            events,
        }
    }

    /// Apply every queued callback event to the manager.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.manager.dispatch(event);
        }
    }

    /// Start and complete the handshake.
    pub fn activate(&mut self) {
        self.manager.start();
        self.transport.emit_last(TransportEvent::Opened);
        self.pump();
    }

    /// Deliver a server message on the current session and apply it.
    pub fn deliver(&mut self, message: LiveMessage) {
        self.transport.emit_last(TransportEvent::Message(message));
        self.pump();
    }
}

// ── Audio fixtures ─────────────────────────────────────────────────

/// A silent 24 kHz chunk lasting `secs`.
pub fn chunk_secs(secs: f64) -> IncomingAudioChunk {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = (secs * f64::from(PLAYBACK_SAMPLE_RATE)).round() as usize;
    IncomingAudioChunk::new(STANDARD.encode(vec![0u8; frames * 2]))
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
