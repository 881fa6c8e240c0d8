use super::TrackSource;

/// Live playback instance of one track within a patch.
///
/// A voice never keeps its own elapsed-time counter: its read position is
/// always `master_clock % loop_frames`. Because position is derived rather
/// than accumulated, muting and unmuting cannot desynchronize a voice from
/// its siblings -- there is nothing to resync.
#[derive(Debug)]
pub struct LoopVoice {
    source: TrackSource,
    loop_frames: usize,
    enabled: bool,
}

impl LoopVoice {
    pub fn new(source: TrackSource) -> Self {
        let loop_frames = source.frames();
        Self {
            source,
            loop_frames,
            enabled: true,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// O(1), allocation-free. Never touches the source cursor.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn loop_frames(&self) -> usize {
        self.loop_frames
    }

    pub fn duration_seconds(&self) -> f64 {
        self.source.duration_seconds()
    }

    /// Loop-relative position for a given master clock value, in frames.
    pub fn position_at(&self, master_clock: usize) -> usize {
        if self.loop_frames == 0 {
            0
        } else {
            master_clock % self.loop_frames
        }
    }

    pub fn position_seconds_at(&self, master_clock: usize) -> f64 {
        self.position_at(master_clock) as f64 / self.source.sample_rate() as f64
    }

    /// Fill `out` with this voice's window starting at `master_clock`.
    /// Disabled voices produce silence but derive position identically, so
    /// re-enabling never needs a seek and never introduces a discontinuity.
    pub fn read_window(&self, master_clock: usize, out: &mut [f32]) {
        if !self.enabled || self.loop_frames == 0 {
            out.fill(0.0);
            return;
        }
        self.source.read_wrapped(self.position_at(master_clock), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ENGINE_CHANNELS;

    fn voice_of(frames: usize) -> LoopVoice {
        let mut samples = Vec::with_capacity(frames * ENGINE_CHANNELS);
        for i in 0..frames {
            let v = (i as f32 + 1.0) * 0.01;
            samples.push(v);
            samples.push(v);
        }
        LoopVoice::new(TrackSource::new(samples, 44100))
    }

    #[test]
    fn position_is_periodic_and_in_range() {
        let voice = voice_of(7);
        for clock in 0..100 {
            let pos = voice.position_at(clock);
            assert!(pos < 7);
            assert_eq!(pos, voice.position_at(clock + 7));
            assert_eq!(pos, voice.position_at(clock + 70));
        }
    }

    #[test]
    fn disabled_window_is_silence() {
        let mut voice = voice_of(16);
        voice.set_enabled(false);
        let mut out = vec![1.0; 8 * ENGINE_CHANNELS];
        voice.read_window(5, &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn toggle_off_then_on_is_transparent() {
        // The window at a given clock must be identical whether or not the
        // voice was muted at some earlier clock value.
        let mut voice = voice_of(16);
        let mut reference = vec![0.0; 8 * ENGINE_CHANNELS];
        voice.read_window(40, &mut reference);

        voice.toggle();
        let mut silent = vec![0.0; 8 * ENGINE_CHANNELS];
        voice.read_window(24, &mut silent);
        voice.toggle();

        let mut resumed = vec![0.0; 8 * ENGINE_CHANNELS];
        voice.read_window(40, &mut resumed);
        assert_eq!(reference, resumed);
    }

    #[test]
    fn zero_length_voice_is_silent() {
        let voice = LoopVoice::new(TrackSource::new(Vec::new(), 44100));
        assert_eq!(voice.position_at(12345), 0);
        let mut out = vec![1.0; 4];
        voice.read_window(99, &mut out);
        assert_eq!(out, vec![0.0; 4]);
    }
}
