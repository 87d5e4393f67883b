//! Playback pipeline: gapless sequential scheduling with instant interruption.
//!
//! [`PlaybackScheduler`] owns the output device context, the `PlaybackClock`
//! (`next_start_time`) and the set of in-flight playback handles.
//!
//! # Invariants
//!
//! - Each chunk starts at `max(next_start_time, device_now)`; afterwards
//!   `next_start_time` advances by the chunk's duration.
//! - `in_flight` holds exactly the handles that were started and have not
//!   completed naturally or been stopped.
//! - [`PlaybackScheduler::interrupt`] empties `in_flight` and resets the
//!   clock to zero, so the next chunk starts at the current device time.
//!
//! The scheduler is owned by the session actor and is never shared, so no
//! locking is needed around the clock or the set.

use std::collections::HashSet;

use dambru_core::{IncomingAudioChunk, PLAYBACK_SAMPLE_RATE};

use crate::audio_io::{AudioOutput, PlaybackId};
use crate::codec::{self, PcmBuffer};
use crate::error::VoiceError;

/// Incoming model audio is mono.
const PLAYBACK_CHANNELS: u16 = 1;

/// Where and for how long a chunk was scheduled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledPlayback {
    pub id: PlaybackId,
    /// Device time (seconds) at which the chunk starts.
    pub start_time: f64,
    /// Chunk duration in seconds.
    pub duration: f64,
}

impl ScheduledPlayback {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Schedules decoded chunks back-to-back on an output device.
pub struct PlaybackScheduler {
    output: Box<dyn AudioOutput>,
    next_start_time: f64,
    in_flight: HashSet<PlaybackId>,
    next_id: u64,
}

impl PlaybackScheduler {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            next_start_time: 0.0,
            in_flight: HashSet::new(),
            next_id: 0,
        }
    }

    /// Decode a chunk and schedule it after everything already queued.
    ///
    /// A malformed chunk yields [`VoiceError::Decode`] and leaves the clock
    /// and the in-flight set untouched. Empty chunks schedule nothing.
    pub fn schedule_chunk(
        &mut self,
        chunk: &IncomingAudioChunk,
    ) -> Result<Option<ScheduledPlayback>, VoiceError> {
        let sample_rate = chunk.declared_sample_rate().unwrap_or(PLAYBACK_SAMPLE_RATE);
        let buffer = codec::decode_to_samples(chunk, sample_rate, PLAYBACK_CHANNELS)?;
        self.schedule_buffer(buffer)
    }

    /// Schedule an already decoded buffer.
    pub fn schedule_buffer(
        &mut self,
        buffer: PcmBuffer,
    ) -> Result<Option<ScheduledPlayback>, VoiceError> {
        if buffer.is_empty() {
            return Ok(None);
        }

        let start_time = self.next_start_time.max(self.output.current_time());
        let duration = buffer.duration_secs();
        let id = PlaybackId(self.next_id);
        self.next_id += 1;

        self.output.start_at(id, buffer, start_time)?;
        self.next_start_time = start_time + duration;
        self.in_flight.insert(id);

        tracing::trace!(%id, start_time, duration, "Scheduled playback chunk");
        Ok(Some(ScheduledPlayback {
            id,
            start_time,
            duration,
        }))
    }

    /// Stop every in-flight handle, clear the set and reset the clock.
    ///
    /// Returns how many handles were in flight.
    pub fn interrupt(&mut self) -> usize {
        let count = self.in_flight.len();
        for id in self.in_flight.drain() {
            if let Err(err) = self.output.stop(id) {
                tracing::trace!(%id, %err, "Ignoring stop of finished playback");
            }
        }
        self.next_start_time = 0.0;

        if count > 0 {
            tracing::debug!(stopped = count, "Playback interrupted");
        }
        count
    }

    /// Record the natural completion of `id`. Returns false for unknown ids.
    pub fn on_completed(&mut self, id: PlaybackId) -> bool {
        self.in_flight.remove(&id)
    }

    /// Stop all playback and release the output device.
    pub fn shutdown(mut self) {
        self.interrupt();
        if let Err(err) = self.output.release() {
            tracing::warn!(%err, "Failed to release output device");
        }
    }

    /// The `PlaybackClock`: device time at which the next chunk may start.
    pub const fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, id: PlaybackId) -> bool {
        self.in_flight.contains(&id)
    }

    /// Whether any scheduled audio has yet to finish.
    pub fn is_playing(&self) -> bool {
        !self.in_flight.is_empty()
    }
}
