//! Interface cues — short fire-and-forget sounds for transport actions and
//! line transitions.
//!
//! Playback of the actual audio clips is left to the front-end; the crate
//! only decides *when* a cue fires.  [`LogSounds`] is the default sink and
//! just records the cue in the log.

use std::sync::Mutex;

/// Named interface cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Start,
    Stop,
    Pause,
    Resume,
    GenerateSuccess,
    FadeIn,
    FadeOut,
}

impl Sound {
    pub fn name(&self) -> &'static str {
        match self {
            Sound::Start => "start",
            Sound::Stop => "stop",
            Sound::Pause => "pause",
            Sound::Resume => "resume",
            Sound::GenerateSuccess => "generateSuccess",
            Sound::FadeIn => "fadeIn",
            Sound::FadeOut => "fadeOut",
        }
    }
}

/// Sink for interface cues.  Must never block or fail.
pub trait SoundEffects: Send + Sync {
    fn play(&self, sound: Sound);
}

/// Writes each cue to the debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSounds;

impl SoundEffects for LogSounds {
    fn play(&self, sound: Sound) {
        log::debug!("sound: {}", sound.name());
    }
}

/// Records every cue in order.  Used by tests to assert on cue sequencing.
#[derive(Debug, Default)]
pub struct RecordedSounds {
    played: Mutex<Vec<Sound>>,
}

impl RecordedSounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// All cues played so far.
    pub fn played(&self) -> Vec<Sound> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl SoundEffects for RecordedSounds {
    fn play(&self, sound: Sound) {
        if let Ok(mut played) = self.played.lock() {
            played.push(sound);
        }
    }
}
