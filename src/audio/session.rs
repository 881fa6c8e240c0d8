use super::{ENGINE_CHANNELS, LoopVoice};

/// Transport state for a loaded patch. Stop is a hard reset: the next start
/// always begins from clock 0, matching the hardware's all-start/all-stop
/// behavior rather than pause/resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stopped,
    Running,
}

/// Playback state for one loaded patch: up to 3 loop voices sharing a single
/// master sample clock. The clock is the sole source of truth for playback
/// position; voices derive their own positions from it.
pub struct PlaybackSession {
    voices: Vec<LoopVoice>,
    master_clock: usize,
    transport: Transport,
    scratch: Vec<f32>,
}

impl PlaybackSession {
    pub fn new(voices: Vec<LoopVoice>) -> Self {
        Self {
            voices,
            master_clock: 0,
            transport: Transport::Stopped,
            scratch: Vec::new(),
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn master_clock(&self) -> usize {
        self.master_clock
    }

    pub fn voices(&self) -> &[LoopVoice] {
        &self.voices
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Stopped -> Running, clock reset to 0 so all enabled voices begin at
    /// loop-relative position 0 in unison. No-op while Running.
    pub fn start(&mut self) {
        if self.transport == Transport::Stopped {
            self.master_clock = 0;
            self.transport = Transport::Running;
        }
    }

    /// Running -> Stopped. The clock value is left in place but nothing
    /// further is produced; a subsequent start() resets it.
    pub fn stop(&mut self) {
        self.transport = Transport::Stopped;
    }

    pub fn toggle_transport(&mut self) {
        match self.transport {
            Transport::Running => self.stop(),
            Transport::Stopped => self.start(),
        }
    }

    /// Flip the enabled flag of the voice at `index`. Valid in either
    /// transport state; while Stopped the flag is honored on the next start.
    /// Out-of-range indices are ignored.
    pub fn toggle_voice(&mut self, index: usize) {
        if let Some(voice) = self.voices.get_mut(index) {
            voice.toggle();
        }
    }

    /// Mix one buffer of `out.len() / ENGINE_CHANNELS` frames.
    ///
    /// Running: sums the window of every enabled voice (simple additive mix,
    /// hard-clipped to [-1, 1]) and advances the clock by exactly the frame
    /// count. Each voice wraps at its own length, so patches whose tracks
    /// disagree on duration loop polyrhythmically instead of being forced to
    /// a global duration.
    ///
    /// Stopped: fills silence and leaves the clock untouched, keeping the
    /// output callback's cadence uninterrupted.
    pub fn pull(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if self.transport == Transport::Stopped {
            return;
        }

        let frames = out.len() / ENGINE_CHANNELS;
        if self.scratch.len() < out.len() {
            self.scratch.resize(out.len(), 0.0);
        }

        for voice in &self.voices {
            if !voice.enabled() {
                continue;
            }
            voice.read_window(self.master_clock, &mut self.scratch[..out.len()]);
            for (dst, src) in out.iter_mut().zip(self.scratch.iter()) {
                *dst += src;
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        self.master_clock += frames;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TrackSource;

    fn voice_with_value(frames: usize, value: f32) -> LoopVoice {
        LoopVoice::new(TrackSource::new(
            vec![value; frames * ENGINE_CHANNELS],
            44100,
        ))
    }

    fn ramp_voice(frames: usize) -> LoopVoice {
        let mut samples = Vec::with_capacity(frames * ENGINE_CHANNELS);
        for i in 0..frames {
            let v = (i % 100) as f32 * 0.005;
            samples.push(v);
            samples.push(-v);
        }
        LoopVoice::new(TrackSource::new(samples, 44100))
    }

    #[test]
    fn pull_advances_clock_by_frame_count() {
        let mut session = PlaybackSession::new(vec![ramp_voice(500)]);
        session.start();
        let mut out = vec![0.0; 128 * ENGINE_CHANNELS];
        for i in 1..=5 {
            session.pull(&mut out);
            assert_eq!(session.master_clock(), i * 128);
        }
    }

    #[test]
    fn pull_while_stopped_is_silent_and_static() {
        let mut session = PlaybackSession::new(vec![voice_with_value(100, 0.5)]);
        let mut out = vec![1.0; 64 * ENGINE_CHANNELS];
        session.pull(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(session.master_clock(), 0);
    }

    #[test]
    fn successive_pulls_are_gapless() {
        // Concatenating two pulls must equal one pull of the combined range.
        let mut chunked = PlaybackSession::new(vec![ramp_voice(700)]);
        chunked.start();
        let mut a = vec![0.0; 300 * ENGINE_CHANNELS];
        let mut b = vec![0.0; 300 * ENGINE_CHANNELS];
        chunked.pull(&mut a);
        chunked.pull(&mut b);

        let mut whole = PlaybackSession::new(vec![ramp_voice(700)]);
        whole.start();
        let mut all = vec![0.0; 600 * ENGINE_CHANNELS];
        whole.pull(&mut all);

        assert_eq!(&all[..300 * ENGINE_CHANNELS], &a[..]);
        assert_eq!(&all[300 * ENGINE_CHANNELS..], &b[..]);
    }

    #[test]
    fn start_is_noop_while_running() {
        let mut session = PlaybackSession::new(vec![ramp_voice(100)]);
        session.start();
        let mut out = vec![0.0; 50 * ENGINE_CHANNELS];
        session.pull(&mut out);
        session.start();
        assert_eq!(session.master_clock(), 50);
    }

    #[test]
    fn stop_then_start_resets_clock() {
        let mut session = PlaybackSession::new(vec![ramp_voice(100)]);
        session.start();
        let mut out = vec![0.0; 64 * ENGINE_CHANNELS];
        for _ in 0..9 {
            session.pull(&mut out);
        }
        session.stop();
        assert_eq!(session.master_clock(), 9 * 64);
        session.start();
        assert_eq!(session.master_clock(), 0);
        assert_eq!(session.transport(), Transport::Running);
    }

    #[test]
    fn additive_mix_sums_enabled_voices() {
        let mut session = PlaybackSession::new(vec![
            voice_with_value(64, 0.25),
            voice_with_value(64, 0.25),
            voice_with_value(64, 0.25),
        ]);
        session.start();
        let mut out = vec![0.0; 32 * ENGINE_CHANNELS];
        session.pull(&mut out);
        assert!(out.iter().all(|&s| (s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn mix_hard_clips() {
        let mut session = PlaybackSession::new(vec![
            voice_with_value(64, 0.8),
            voice_with_value(64, 0.8),
        ]);
        session.start();
        let mut out = vec![0.0; 32 * ENGINE_CHANNELS];
        session.pull(&mut out);
        assert!(out.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn toggled_voice_rejoins_in_phase() {
        // Three pulls with all voices on, toggle voice 2 off, one pull,
        // toggle it back, one pull: both enabled stretches of voice 2's
        // contribution must match an uninterrupted run sample-for-sample.
        let block = 1000 * ENGINE_CHANNELS;

        let mut solo = PlaybackSession::new(vec![ramp_voice(1337)]);
        solo.start();
        let mut uninterrupted = vec![0.0; 5 * block];
        solo.pull(&mut uninterrupted);

        // Toggled run: voice 2 alone so its contribution is isolated, plus
        // two silent siblings to mirror the 3-track patch.
        let mut silent_a = voice_with_value(900, 0.3);
        let mut silent_b = voice_with_value(1100, 0.3);
        silent_a.set_enabled(false);
        silent_b.set_enabled(false);
        let mut session = PlaybackSession::new(vec![silent_a, ramp_voice(1337), silent_b]);
        session.start();

        let mut chunks: Vec<Vec<f32>> = Vec::new();
        for _ in 0..3 {
            let mut out = vec![0.0; block];
            session.pull(&mut out);
            chunks.push(out);
        }
        session.toggle_voice(1);
        let mut muted = vec![0.0; block];
        session.pull(&mut muted);
        session.toggle_voice(1);
        let mut resumed = vec![0.0; block];
        session.pull(&mut resumed);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(&uninterrupted[i * block..(i + 1) * block], &chunk[..]);
        }
        assert!(muted.iter().all(|&s| s == 0.0));
        assert_eq!(&uninterrupted[4 * block..5 * block], &resumed[..]);
    }

    #[test]
    fn unequal_lengths_wrap_independently() {
        // 500- and 700-frame loops: after 3500 frames the first has completed
        // exactly 7 cycles and the second exactly 5, both back at position 0.
        let mut session = PlaybackSession::new(vec![ramp_voice(500), ramp_voice(700)]);
        session.start();
        let mut out = vec![0.0; 500 * ENGINE_CHANNELS];
        for _ in 0..7 {
            session.pull(&mut out);
        }
        assert_eq!(session.master_clock(), 3500);
        assert_eq!(session.voices()[0].position_at(session.master_clock()), 0);
        assert_eq!(session.voices()[1].position_at(session.master_clock()), 0);
    }

    #[test]
    fn toggle_voice_out_of_range_is_ignored() {
        let mut session = PlaybackSession::new(vec![ramp_voice(10)]);
        session.toggle_voice(7);
        assert!(session.voices()[0].enabled());
    }

    #[test]
    fn toggle_while_stopped_applies_on_start() {
        let mut session = PlaybackSession::new(vec![voice_with_value(64, 0.5)]);
        session.toggle_voice(0);
        session.start();
        let mut out = vec![0.0; 16 * ENGINE_CHANNELS];
        session.pull(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(session.master_clock(), 16);
    }
}
