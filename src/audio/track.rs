use std::sync::atomic::{AtomicUsize, Ordering};

use super::ENGINE_CHANNELS;

/// In-memory sample store for one track, normalized at load time to the
/// engine sample rate and stereo interleaved layout. Reads wrap modulo the
/// frame count; the source is never re-opened once constructed.
#[derive(Debug)]
pub struct TrackSource {
    samples: Vec<f32>,
    sample_rate: u32,
    frames: usize,
    // Display-only read cursor, updated after each read. Playback position is
    // always derived from the master clock, never from this.
    cursor: AtomicUsize,
}

impl TrackSource {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        debug_assert!(samples.len() % ENGINE_CHANNELS == 0);
        let frames = samples.len() / ENGINE_CHANNELS;
        Self {
            samples,
            sample_rate,
            frames,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        ENGINE_CHANNELS
    }

    /// Total frame count (interleaved sample count / channel count).
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    /// Last reported read position, in frames. Always in [0, frames).
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Copy `out.len() / ENGINE_CHANNELS` frames starting at `start_frame`
    /// into `out`, wrapping at the end of the track. The window may span the
    /// wrap point; the tail of the source is stitched to its head. O(out.len())
    /// with no allocation.
    pub fn read_wrapped(&self, start_frame: usize, out: &mut [f32]) {
        if self.frames == 0 {
            out.fill(0.0);
            return;
        }

        let want_frames = out.len() / ENGINE_CHANNELS;
        let start = start_frame % self.frames;
        let mut src = start * ENGINE_CHANNELS;
        let total = self.samples.len();

        let mut written = 0;
        while written < want_frames * ENGINE_CHANNELS {
            if src >= total {
                src = 0;
            }
            let run = (total - src).min(want_frames * ENGINE_CHANNELS - written);
            out[written..written + run].copy_from_slice(&self.samples[src..src + run]);
            written += run;
            src += run;
        }

        self.cursor
            .store((start + want_frames) % self.frames, Ordering::Relaxed);
    }
}
