//! Capture pipeline: microphone frames to the live session.
//!
//! Each fixed-size frame is encoded synchronously inside the capture
//! callback and handed to the session handle. Sends are fire-and-forget:
//! a failed send drops that frame and nothing is buffered or retried, so
//! transient failures become audio gaps. Drop counts are reported when the
//! pipeline stops.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dambru_core::LiveSessionHandle;

use crate::audio_io::AudioInput;
use crate::codec;
use crate::error::VoiceError;

/// Frame counters for one capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_sent: u64,
    pub frames_dropped: u64,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    dropped: AtomicU64,
}

/// Streams microphone frames into a live session.
pub struct CapturePipeline {
    input: Box<dyn AudioInput>,
    counters: Arc<Counters>,
    streaming: bool,
}

impl CapturePipeline {
    /// Wrap an acquired microphone. Nothing is sent until [`Self::start`].
    pub fn new(input: Box<dyn AudioInput>) -> Self {
        Self {
            input,
            counters: Arc::new(Counters::default()),
            streaming: false,
        }
    }

    /// Begin forwarding frames to `link`.
    pub fn start(&mut self, link: Arc<dyn LiveSessionHandle>) -> Result<(), VoiceError> {
        let counters = Arc::clone(&self.counters);
        self.input.start_streaming(Box::new(move |frame: &[f32]| {
            let encoded = codec::encode_frame(frame);
            match link.send_audio(encoded) {
                Ok(()) => {
                    counters.sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(%err, "Dropped capture frame");
                }
            }
        }))?;
        self.streaming = true;
        tracing::debug!("Capture pipeline streaming");
        Ok(())
    }

    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_sent: self.counters.sent.load(Ordering::Relaxed),
            frames_dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stop forwarding and release the microphone.
    pub fn stop(self) -> Result<CaptureStats, VoiceError> {
        let stats = self.stats();
        self.input.release()?;
        tracing::info!(
            frames_sent = stats.frames_sent,
            frames_dropped = stats.frames_dropped,
            "Capture pipeline stopped"
        );
        Ok(stats)
    }
}
