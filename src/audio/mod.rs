pub mod decode;
pub mod engine;
pub mod output;
pub mod session;
pub mod track;
pub mod voice;

pub use engine::{PlayerEngine, SessionSnapshot, VoiceSnapshot};
pub use output::AudioOutput;
pub use session::{PlaybackSession, Transport};
pub use track::TrackSource;
pub use voice::LoopVoice;

/// Fixed engine-side channel layout. Every track is normalized to this at
/// load time, so the mix path never has to care about per-file layouts.
pub const ENGINE_CHANNELS: usize = 2;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 1024,
        }
    }
}

/// Commands sent from the UI thread to the audio engine. Drained at the top
/// of each output callback, so a command takes effect no later than the next
/// buffer and never mid-buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Start,
    Stop,
    ToggleAll,
    ToggleVoice(usize),
}

/// Events sent from the audio side back to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Error(String),
}
