//! Scheduled mixer: plays buffers at absolute device times via `rodio`.
//!
//! The mixer is an endless mono [`rodio::Source`]. The number of frames it
//! has rendered *is* the output device clock, so a voice scheduled for time
//! `t` begins exactly `t * sample_rate` frames after the context opened.
//! Back-to-back voices whose start times abut therefore play gaplessly.
//!
//! State is shared between the rodio mixer thread (rendering) and the audio
//! thread (scheduling/stopping) through a short-held mutex.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::audio_io::{PlaybackCompletion, PlaybackId};

/// Frames rendered per lock acquisition (20 ms at 24 kHz).
pub const RENDER_BLOCK_FRAMES: usize = 480;

/// Mixer state shared between the renderer and the scheduler.
pub type SharedMixer = Arc<Mutex<MixerState>>;

struct Voice {
    id: PlaybackId,
    start_frame: u64,
    samples: Vec<f32>,
    cursor: usize,
}

/// Voices waiting or playing, plus the device clock.
pub struct MixerState {
    sample_rate: u32,
    rendered: u64,
    voices: Vec<Voice>,
}

impl MixerState {
    pub const fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            rendered: 0,
            voices: Vec::new(),
        }
    }

    pub fn shared(sample_rate: u32) -> SharedMixer {
        Arc::new(Mutex::new(Self::new(sample_rate)))
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds of audio rendered since the mixer was created.
    #[allow(clippy::cast_precision_loss)]
    pub fn current_time(&self) -> f64 {
        self.rendered as f64 / f64::from(self.sample_rate)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn frame_at(&self, when: f64) -> u64 {
        if when.is_finite() && when > 0.0 {
            (when * f64::from(self.sample_rate)).round() as u64
        } else {
            0
        }
    }

    /// Queue mono `samples` to start at device time `when`.
    ///
    /// A voice whose start time has already been rendered skips the elapsed
    /// samples, so it still ends at its scheduled time and a successor
    /// starting there does not overlap it.
    pub fn schedule(&mut self, id: PlaybackId, samples: Vec<f32>, when: f64) {
        let start_frame = self.frame_at(when);
        self.voices.push(Voice {
            id,
            start_frame,
            samples,
            cursor: 0,
        });
    }

    /// Remove a voice without reporting completion. Returns false if unknown.
    pub fn stop(&mut self, id: PlaybackId) -> bool {
        let before = self.voices.len();
        self.voices.retain(|v| v.id != id);
        self.voices.len() != before
    }

    /// Remove every voice. Returns how many were removed.
    pub fn stop_all(&mut self) -> usize {
        let count = self.voices.len();
        self.voices.clear();
        count
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Mix the next `out.len()` frames and advance the clock.
    ///
    /// Ids of voices that played their last sample are appended to `finished`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn render(&mut self, out: &mut [f32], finished: &mut Vec<PlaybackId>) {
        out.fill(0.0);
        let block_start = self.rendered;
        let block_len = out.len();
        let block_end = block_start + block_len as u64;

        for voice in &mut self.voices {
            if voice.start_frame >= block_end {
                continue;
            }
            if voice.cursor == 0 && voice.start_frame < block_start {
                let elapsed = usize::try_from(block_start - voice.start_frame).unwrap_or(usize::MAX);
                voice.cursor = elapsed.min(voice.samples.len());
            }
            let offset = voice.start_frame.saturating_sub(block_start) as usize;
            let remaining = voice.samples.len() - voice.cursor;
            let count = remaining.min(block_len - offset);
            let source = &voice.samples[voice.cursor..voice.cursor + count];
            for (o, s) in out[offset..offset + count].iter_mut().zip(source) {
                *o += *s;
            }
            voice.cursor += count;
        }

        self.voices.retain(|v| {
            let done = v.cursor >= v.samples.len();
            if done {
                finished.push(v.id);
            }
            !done
        });

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
        self.rendered = block_end;
    }
}

/// Lock the shared mixer, recovering the state if a holder panicked.
pub fn lock(mixer: &Mutex<MixerState>) -> MutexGuard<'_, MixerState> {
    mixer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Endless `rodio` source that renders a [`SharedMixer`].
pub struct MixerSource {
    mixer: SharedMixer,
    sample_rate: u32,
    block: Vec<f32>,
    pos: usize,
    finished: Vec<PlaybackId>,
    on_complete: PlaybackCompletion,
}

impl MixerSource {
    pub fn new(mixer: SharedMixer, on_complete: PlaybackCompletion) -> Self {
        let sample_rate = lock(&mixer).sample_rate();
        Self {
            mixer,
            sample_rate,
            block: vec![0.0; RENDER_BLOCK_FRAMES],
            pos: RENDER_BLOCK_FRAMES,
            finished: Vec::new(),
            on_complete,
        }
    }

    fn refill(&mut self) {
        lock(&self.mixer).render(&mut self.block, &mut self.finished);
        // Callbacks run outside the lock so they may schedule or stop voices.
        for id in self.finished.drain(..) {
            (self.on_complete)(id);
        }
        self.pos = 0;
    }
}

impl Iterator for MixerSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.block.len() {
            self.refill();
        }
        let sample = self.block.get(self.pos).copied();
        self.pos += 1;
        sample
    }
}

impl rodio::Source for MixerSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(state: &mut MixerState, frames: usize) -> (Vec<f32>, Vec<PlaybackId>) {
        let mut out = vec![0.0; frames];
        let mut finished = Vec::new();
        state.render(&mut out, &mut finished);
        (out, finished)
    }

    #[test]
    fn test_voice_plays_from_its_start_frame() {
        let mut state = MixerState::new(10);
        state.schedule(PlaybackId(1), vec![0.1, 0.2, 0.3], 0.5);

        let (out, finished) = render(&mut state, 10);
        assert_eq!(out, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.1, 0.2, 0.3, 0.0, 0.0]);
        assert_eq!(finished, vec![PlaybackId(1)]);
        assert_eq!(state.active_voices(), 0);
        assert!((state.current_time() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_back_to_back_voices_are_gapless_across_blocks() {
        let mut state = MixerState::new(10);
        state.schedule(PlaybackId(1), vec![0.5; 3], 0.0);
        state.schedule(PlaybackId(2), vec![0.25; 3], 0.3);

        let (first, done_first) = render(&mut state, 4);
        assert_eq!(first, vec![0.5, 0.5, 0.5, 0.25]);
        assert_eq!(done_first, vec![PlaybackId(1)]);

        let (second, done_second) = render(&mut state, 4);
        assert_eq!(second, vec![0.25, 0.25, 0.0, 0.0]);
        assert_eq!(done_second, vec![PlaybackId(2)]);
    }

    #[test]
    fn test_late_voice_skips_elapsed_samples() {
        let mut state = MixerState::new(10);
        let _ = render(&mut state, 5);
        state.schedule(PlaybackId(7), vec![0.1, 0.2, 0.3, 0.4], 0.3);

        let (out, finished) = render(&mut state, 3);
        assert_eq!(out, vec![0.3, 0.4, 0.0]);
        assert_eq!(finished, vec![PlaybackId(7)]);
    }

    #[test]
    fn test_fully_elapsed_voice_completes_silently() {
        let mut state = MixerState::new(10);
        let _ = render(&mut state, 5);
        state.schedule(PlaybackId(7), vec![0.4], 0.1);

        let (out, finished) = render(&mut state, 2);
        assert_eq!(out, vec![0.0, 0.0]);
        assert_eq!(finished, vec![PlaybackId(7)]);
    }

    #[test]
    fn test_late_voice_does_not_overlap_its_successor() {
        let mut state = MixerState::new(10);
        let _ = render(&mut state, 4);
        state.schedule(PlaybackId(1), vec![0.5; 6], 0.0);
        state.schedule(PlaybackId(2), vec![0.25; 6], 0.6);

        let (out, finished) = render(&mut state, 8);
        assert_eq!(out, vec![0.5, 0.5, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25]);
        assert_eq!(finished, vec![PlaybackId(1), PlaybackId(2)]);
    }

    #[test]
    fn test_stop_silences_without_completion() {
        let mut state = MixerState::new(10);
        state.schedule(PlaybackId(1), vec![0.5; 20], 0.0);
        let _ = render(&mut state, 5);

        assert!(state.stop(PlaybackId(1)));
        assert!(!state.stop(PlaybackId(1)));

        let (out, finished) = render(&mut state, 5);
        assert!(out.iter().all(|s| *s == 0.0));
        assert!(finished.is_empty());
    }

    #[test]
    fn test_overlapping_voices_sum_and_clip() {
        let mut state = MixerState::new(10);
        state.schedule(PlaybackId(1), vec![0.75, 0.25], 0.0);
        state.schedule(PlaybackId(2), vec![0.75, 0.25], 0.0);
        let (out, _) = render(&mut state, 2);
        assert_eq!(out, vec![1.0, 0.5]);
    }

    #[test]
    fn test_source_reports_completion_through_callback() {
        let mixer = MixerState::shared(10);
        lock(&mixer).schedule(PlaybackId(3), vec![0.5; 2], 0.0);

        let done = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&done);
        let source = MixerSource::new(
            Arc::clone(&mixer),
            Arc::new(move |id| sink.lock().unwrap().push(id)),
        );

        let samples: Vec<f32> = source.take(4).collect();
        assert_eq!(samples, vec![0.5, 0.5, 0.0, 0.0]);
        assert_eq!(*done.lock().unwrap(), vec![PlaybackId(3)]);
    }
}
