//! Core narration trait, voice descriptors and timing estimates.
//!
//! # Overview
//!
//! [`Narrator`] is the interface the playback orchestrator drives.  It is
//! object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn Narrator>`; only one utterance is ever active on a narrator.
//!
//! [`SpeechNarrator`](crate::narration::SpeechNarrator) is the production
//! implementation layered over a platform [`SpeechBackend`](crate::narration::SpeechBackend).
//!
//! [`MockNarrator`] (available under `#[cfg(test)]`) records utterances and
//! lets tests decide when, and whether, each one completes.

use async_trait::async_trait;

/// Slowest supported speaking rate.
pub const MIN_RATE: f32 = 0.1;
/// Fastest supported speaking rate.
pub const MAX_RATE: f32 = 10.0;

/// Characters spoken per second at rate 1.0.
const CHARS_PER_SECOND_AT_1X_RATE: f64 = 12.0;
/// Allowance for pauses and transitions added to every line.
const BASE_LINE_MS: f64 = 1_500.0;
/// Shortest duration reported for any line, so short lines stay perceivable.
const MIN_LINE_MS: f64 = 2_000.0;

/// Callback fired once when an utterance ends naturally.
pub type OnComplete = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

/// A voice offered by the speech backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Stable identifier used to select the voice.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// BCP-47 language tag, e.g. `"en-US"`.
    pub lang: String,
    /// Synthesised on-device rather than by a remote service.
    pub local: bool,
}

impl Voice {
    pub fn new(id: &str, name: &str, lang: &str, local: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lang: lang.into(),
            local,
        }
    }
}

/// Choose the voice used when none has been selected: a local English voice,
/// then any English voice, then whatever comes first.
pub fn pick_default_voice(voices: &[Voice]) -> Option<Voice> {
    voices
        .iter()
        .find(|v| v.lang.starts_with("en") && v.local)
        .or_else(|| voices.iter().find(|v| v.lang.starts_with("en")))
        .or_else(|| voices.first())
        .cloned()
}

/// Clamp a rate multiplier to [`MIN_RATE`] ..= [`MAX_RATE`].
pub fn clamp_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        return 1.0;
    }
    rate.clamp(MIN_RATE, MAX_RATE)
}

/// Milliseconds of pure speech for `text` at `rate`.
pub fn speech_ms(text: &str, rate: f32) -> f64 {
    let rate = f64::from(clamp_rate(rate));
    text.chars().count() as f64 / (rate * CHARS_PER_SECOND_AT_1X_RATE) * 1_000.0
}

/// Estimated on-screen duration of a line, used for the progress timer.
///
/// `max(2000, 1500 + chars / (rate * 12) * 1000)`.
///
/// ```
/// use visual_storyteller::narration::estimate_duration_ms;
///
/// assert_eq!(estimate_duration_ms("", 1.0), 2_000);
/// assert_eq!(estimate_duration_ms(&"a".repeat(120), 1.0), 11_500);
/// ```
pub fn estimate_duration_ms(text: &str, rate: f32) -> u64 {
    (BASE_LINE_MS + speech_ms(text, rate)).max(MIN_LINE_MS) as u64
}

// ---------------------------------------------------------------------------
// Narrator trait
// ---------------------------------------------------------------------------

/// Text-to-speech as seen by the playback orchestrator.
///
/// # Contract
///
/// - `speak` cancels any active utterance first.  `on_complete` runs exactly
///   once when the new utterance ends naturally and never if it is cancelled.
/// - `cancel` marks the active utterance cancelled *before* stopping audio.
/// - `pause` / `resume` are no-ops unless the narrator is in the
///   complementary state.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// All voices; waits for the backend's first voice load.
    async fn voices(&self) -> Vec<Voice>;

    /// Select a voice by id.  Unknown ids are logged and ignored.
    async fn set_voice(&self, id: &str);

    /// Currently selected voice, if voices have loaded.
    fn selected_voice(&self) -> Option<Voice>;

    /// Set the speaking rate, clamped to the supported range.
    fn set_rate(&self, rate: f32);

    fn rate(&self) -> f32;

    fn speak(&self, text: &str, on_complete: OnComplete);

    /// Speak a sample with `voice_id`, interrupting current speech.
    async fn speak_preview(&self, text: &str, voice_id: &str);

    fn pause(&self);

    fn resume(&self);

    fn cancel(&self);

    /// Estimated line duration at the current rate.
    fn estimated_duration_ms(&self, text: &str) -> u64 {
        estimate_duration_ms(text, self.rate())
    }
}

// Compile-time assertion: Box<dyn Narrator> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Narrator>) {}
};

// ---------------------------------------------------------------------------
// MockNarrator  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockNarrator;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
