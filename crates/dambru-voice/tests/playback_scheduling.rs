//! Gapless scheduling and interruption tests for `PlaybackScheduler`.
//!
//! The scheduler is exercised against the real `MixerState` clock so the
//! rendered samples prove that back-to-back chunks leave no silence between
//! them, and that an interruption silences queued audio immediately.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use dambru_core::{IncomingAudioChunk, PLAYBACK_SAMPLE_RATE};
use dambru_voice::mixer::{MixerState, SharedMixer, lock};
use dambru_voice::{AudioOutput, PcmBuffer, PlaybackId, PlaybackScheduler, VoiceError};

const RATE: u32 = 100;

/// Output context rendering through a `MixerState` driven by the test.
struct MixerOutput {
    mixer: SharedMixer,
    /// Frames the device renders between the clock read and the next
    /// `start_at`, as when the mixer thread runs a block in that window.
    render_before_start: AtomicUsize,
}

impl AudioOutput for MixerOutput {
    fn sample_rate(&self) -> u32 {
        lock(&self.mixer).sample_rate()
    }

    fn current_time(&self) -> f64 {
        lock(&self.mixer).current_time()
    }

    fn start_at(&self, id: PlaybackId, buffer: PcmBuffer, when: f64) -> Result<(), VoiceError> {
        let mut mixer = lock(&self.mixer);
        let lag = self.render_before_start.swap(0, Ordering::SeqCst);
        if lag > 0 {
            mixer.render(&mut vec![0.0; lag], &mut Vec::new());
        }
        mixer.schedule(id, buffer.into_mono(), when);
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
        lock(&self.mixer).stop_all();
        Ok(())
    }
}

struct Rig {
    scheduler: PlaybackScheduler,
    mixer: SharedMixer,
    finished: Arc<Mutex<Vec<PlaybackId>>>,
}

impl Rig {
    fn new() -> Self {
        Self::with_render_lag(0)
    }

    fn with_render_lag(frames: usize) -> Self {
        let mixer = MixerState::shared(RATE);
        let finished = Arc::new(Mutex::new(Vec::new()));
        let output = MixerOutput {
            mixer: Arc::clone(&mixer),
            render_before_start: AtomicUsize::new(frames),
        };
        Self {
            scheduler: PlaybackScheduler::new(Box::new(output)),
            mixer,
            finished,
        }
    }

    /// Render `frames` frames and feed completions back to the scheduler.
    fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        let mut done = Vec::new();
        lock(&self.mixer).render(&mut out, &mut done);
        for id in done {
            self.scheduler.on_completed(id);
            self.finished.lock().unwrap().push(id);
        }
        out
    }
}

/// A constant-valued chunk of `frames` samples at `RATE`.
fn tone(frames: usize, level: i16) -> IncomingAudioChunk {
    let bytes: Vec<u8> = std::iter::repeat_n(level.to_le_bytes(), frames)
        .flatten()
        .collect();
    IncomingAudioChunk {
        mime_type: Some(format!("audio/pcm;rate={RATE}")),
        data: STANDARD.encode(bytes),
    }
}

fn silence_secs(secs: f64) -> IncomingAudioChunk {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = (secs * f64::from(PLAYBACK_SAMPLE_RATE)).round() as usize;
    IncomingAudioChunk::new(STANDARD.encode(vec![0u8; frames * 2]))
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn consecutive_chunks_start_where_previous_ended() {
    let mut rig = Rig::new();

    let a = rig.scheduler.schedule_chunk(&silence_secs(0.5)).unwrap().unwrap();
    let b = rig.scheduler.schedule_chunk(&silence_secs(0.3)).unwrap().unwrap();

    assert!(approx_eq(a.start_time, 0.0));
    assert!(approx_eq(b.start_time, a.start_time + 0.5));
    assert!(approx_eq(rig.scheduler.next_start_time(), 0.8));
}

#[test]
fn queued_chunk_durations_accumulate_exactly() {
    for durations in [[0.1, 0.2, 0.3], [0.5, 0.5, 0.5], [0.04, 1.0, 0.26]] {
        let mut rig = Rig::new();
        let mut expected = 0.0;
        for duration in durations {
            let scheduled = rig
                .scheduler
                .schedule_chunk(&silence_secs(duration))
                .unwrap()
                .unwrap();
            assert!(approx_eq(scheduled.start_time, expected));
            expected += duration;
        }
        assert!(approx_eq(rig.scheduler.next_start_time(), expected));
        assert_eq!(rig.scheduler.in_flight(), 3);
    }
}

#[test]
fn rendered_output_has_no_gap_between_chunks() {
    let mut rig = Rig::new();
    rig.scheduler.schedule_chunk(&tone(7, 8192)).unwrap();
    rig.scheduler.schedule_chunk(&tone(5, 16384)).unwrap();

    let out = rig.render(16);
    assert!(out[..7].iter().all(|s| (*s - 0.25).abs() < 1e-6));
    assert!(out[7..12].iter().all(|s| (*s - 0.5).abs() < 1e-6));
    assert!(out[12..].iter().all(|s| *s == 0.0));
    assert_eq!(rig.scheduler.in_flight(), 0);
    assert_eq!(rig.finished.lock().unwrap().len(), 2);
}

#[test]
fn chunk_after_idle_period_starts_at_device_now() {
    let mut rig = Rig::new();
    rig.scheduler.schedule_chunk(&tone(10, 8192)).unwrap();
    let _ = rig.render(50);

    let late = rig.scheduler.schedule_chunk(&tone(10, 8192)).unwrap().unwrap();
    assert!(approx_eq(late.start_time, 0.5));
}

#[test]
fn block_rendered_before_start_does_not_overlap_next_chunk() {
    let mut rig = Rig::with_render_lag(3);
    let a = rig.scheduler.schedule_chunk(&tone(6, 16384)).unwrap().unwrap();
    let b = rig.scheduler.schedule_chunk(&tone(4, 8192)).unwrap().unwrap();
    assert!(approx_eq(a.start_time, 0.0));
    assert!(approx_eq(b.start_time, 0.06));

    let out = rig.render(8);
    assert!(out[..3].iter().all(|s| (*s - 0.5).abs() < 1e-6));
    assert!(out[3..7].iter().all(|s| (*s - 0.25).abs() < 1e-6));
    assert!(out[7].abs() < f32::EPSILON);
    assert_eq!(*rig.finished.lock().unwrap(), vec![a.id, b.id]);
}

#[test]
fn interrupt_silences_queue_and_next_chunk_starts_now() {
    let mut rig = Rig::new();
    rig.scheduler.schedule_chunk(&tone(100, 8192)).unwrap();
    rig.scheduler.schedule_chunk(&tone(100, 8192)).unwrap();
    let _ = rig.render(30);

    assert_eq!(rig.scheduler.interrupt(), 2);
    assert_eq!(rig.scheduler.in_flight(), 0);
    assert!(rig.scheduler.next_start_time().abs() < f64::EPSILON);
    assert_eq!(lock(&rig.mixer).active_voices(), 0);

    let c = rig.scheduler.schedule_chunk(&tone(4, 16384)).unwrap().unwrap();
    assert!(approx_eq(c.start_time, 0.3));

    let out = rig.render(6);
    assert!(out[..4].iter().all(|s| (*s - 0.5).abs() < 1e-6));
    assert!(out[4..].iter().all(|s| *s == 0.0));
    assert!(rig.finished.lock().unwrap().iter().all(|id| *id == c.id));
}

#[test]
fn interrupt_after_natural_completion_ignores_finished_handles() {
    let mut rig = Rig::new();
    rig.scheduler.schedule_chunk(&tone(5, 8192)).unwrap();
    rig.scheduler.schedule_chunk(&tone(50, 8192)).unwrap();
    let _ = rig.render(10);
    assert_eq!(rig.scheduler.in_flight(), 1);

    assert_eq!(rig.scheduler.interrupt(), 1);
    assert_eq!(rig.scheduler.in_flight(), 0);
}
