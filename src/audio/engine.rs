use crossbeam::channel::Receiver;
use std::sync::Mutex;

use super::{EngineConfig, PlaybackSession, SessionCommand, Transport};

/// Per-voice state as reported to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSnapshot {
    pub enabled: bool,
    pub position_seconds: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub transport: Transport,
    pub voices: Vec<VoiceSnapshot>,
}

/// Bridge between the UI thread and the real-time output callback.
///
/// The engine owns the single mutable "current session" slot. The output
/// callback drains pending commands and pulls one buffer under a short-held
/// try_lock; the UI thread swaps whole sessions in and out under the same
/// mutex. Sessions are always built fully before they are installed, so the
/// callback can never observe a half-constructed one.
pub struct PlayerEngine {
    session: Mutex<Option<PlaybackSession>>,
    command_receiver: Receiver<SessionCommand>,
    config: EngineConfig,
}

impl PlayerEngine {
    pub fn new(config: EngineConfig, command_receiver: Receiver<SessionCommand>) -> Self {
        Self {
            session: Mutex::new(None),
            command_receiver,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Swap in a fully constructed session, dropping (and thereby releasing)
    /// any previous one. UI thread only. Commands still queued for the old
    /// session are discarded so they cannot leak into the new patch.
    pub fn install_session(&self, session: PlaybackSession) {
        if let Ok(mut slot) = self.session.lock() {
            while self.command_receiver.try_recv().is_ok() {}
            *slot = Some(session);
        }
    }

    /// Tear down the current session, releasing its track sources.
    pub fn clear_session(&self) {
        if let Ok(mut slot) = self.session.lock() {
            *slot = None;
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Produce one stereo interleaved buffer. Called from the output
    /// callback; must never block. Pending commands are applied before the
    /// pull, under the same lock, so a toggle can never tear a buffer
    /// half-old/half-new. A contended lock or empty slot degrades to
    /// silence, never to a stall.
    pub fn process(&self, out: &mut [f32]) {
        let Ok(mut slot) = self.session.try_lock() else {
            out.fill(0.0);
            return;
        };

        while let Ok(command) = self.command_receiver.try_recv() {
            if let Some(session) = slot.as_mut() {
                Self::apply(session, command);
            }
        }

        match slot.as_mut() {
            Some(session) => session.pull(out),
            None => out.fill(0.0),
        }
    }

    fn apply(session: &mut PlaybackSession, command: SessionCommand) {
        match command {
            SessionCommand::Start => session.start(),
            SessionCommand::Stop => session.stop(),
            SessionCommand::ToggleAll => session.toggle_transport(),
            SessionCommand::ToggleVoice(index) => session.toggle_voice(index),
        }
    }

    /// Read-only view of the current session for drawing. UI thread; the
    /// lock is held just long enough to copy a few scalars per voice.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let slot = self.session.lock().ok()?;
        let session = slot.as_ref()?;
        let clock = session.master_clock();
        Some(SessionSnapshot {
            transport: session.transport(),
            voices: session
                .voices()
                .iter()
                .map(|voice| VoiceSnapshot {
                    enabled: voice.enabled(),
                    position_seconds: voice.position_seconds_at(clock),
                    duration_seconds: voice.duration_seconds(),
                })
                .collect(),
        })
    }
}
