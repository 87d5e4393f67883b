//! Local audio backend: real devices via cpal/rodio on the audio thread.
//!
//! [`LocalAudioBackend`] owns an `Arc<AudioThreadHandle>` and hands out
//! input/output contexts that share it. Scheduling on the output goes
//! straight to the shared mixer; only device open/close crosses threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio_io::{
    AudioBackend, AudioInput, AudioOutput, FrameCallback, PlaybackCompletion, PlaybackId,
};
use crate::audio_thread::AudioThreadHandle;
use crate::capture::resample;
use crate::codec::PcmBuffer;
use crate::error::VoiceError;
use crate::mixer::{SharedMixer, lock};

/// Production [`AudioBackend`] backed by the default system devices.
pub struct LocalAudioBackend {
    thread: Arc<AudioThreadHandle>,
}

impl LocalAudioBackend {
    /// Spawn the audio thread. Devices open per session.
    pub fn new() -> Result<Self, VoiceError> {
        Ok(Self {
            thread: Arc::new(AudioThreadHandle::spawn()?),
        })
    }
}

impl AudioBackend for LocalAudioBackend {
    fn open_input(&self, frame_size: usize) -> Result<Box<dyn AudioInput>, VoiceError> {
        self.thread.open_input(frame_size)?;
        Ok(Box::new(LocalAudioInput {
            thread: Arc::clone(&self.thread),
            released: AtomicBool::new(false),
        }))
    }

    fn open_output(
        &self,
        on_complete: PlaybackCompletion,
    ) -> Result<Box<dyn AudioOutput>, VoiceError> {
        let mixer = self.thread.open_output(on_complete)?;
        Ok(Box::new(LocalAudioOutput {
            thread: Arc::clone(&self.thread),
            mixer,
            released: AtomicBool::new(false),
        }))
    }
}

/// Microphone context on the audio thread.
pub struct LocalAudioInput {
    thread: Arc<AudioThreadHandle>,
    released: AtomicBool,
}

impl AudioInput for LocalAudioInput {
    fn start_streaming(&self, on_frame: FrameCallback) -> Result<(), VoiceError> {
        self.thread.start_streaming(on_frame)
    }

    fn release(&self) -> Result<(), VoiceError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.thread.release_input()
    }
}

impl Drop for LocalAudioInput {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(%err, "Failed to release microphone on drop");
        }
    }
}

/// Output context: a mixer rendered by rodio on its own thread.
pub struct LocalAudioOutput {
    thread: Arc<AudioThreadHandle>,
    mixer: SharedMixer,
    released: AtomicBool,
}

impl AudioOutput for LocalAudioOutput {
    fn sample_rate(&self) -> u32 {
        lock(&self.mixer).sample_rate()
    }

    fn current_time(&self) -> f64 {
        lock(&self.mixer).current_time()
    }

    fn start_at(&self, id: PlaybackId, buffer: PcmBuffer, when: f64) -> Result<(), VoiceError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(VoiceError::OutputStreamError(
                "output device already released".to_string(),
            ));
        }

        let device_rate = self.sample_rate();
        let source_rate = buffer.sample_rate();
        let mono = buffer.into_mono();
        let samples = if source_rate == device_rate {
            mono
        } else {
            resample(&mono, source_rate, device_rate)?
        };

        lock(&self.mixer).schedule(id, samples, when);
        Ok(())
    }

    fn stop(&self, id: PlaybackId) -> Result<(), VoiceError> {
        if lock(&self.mixer).stop(id) {
            Ok(())
        } else {
            Err(VoiceError::UnknownPlayback(id.0))
        }
    }

    fn release(&self) -> Result<(), VoiceError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        lock(&self.mixer).stop_all();
        self.thread.release_output()
    }
}

impl Drop for LocalAudioOutput {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(%err, "Failed to release output device on drop");
        }
    }
}
