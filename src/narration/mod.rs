//! Narration — text-to-speech as consumed by the playback orchestrator.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  Narrator (trait)                      │
//! │                                                       │
//! │   ┌──────────────────────┐    ┌───────────────────┐   │
//! │   │ SpeechNarrator<B>     │───▶│ SpeechBackend (B) │   │
//! │   │ - voices (once)       │    │ - utter / cancel  │   │
//! │   │ - rate / pitch        │    │ - pause / resume  │   │
//! │   │ - cancel flags        │    └───────────────────┘   │
//! │   └──────────────────────┘             ▲              │
//! │                                        │              │
//! │                              TimedBackend (headless)  │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use visual_storyteller::narration::{Narrator, SpeechNarrator, TimedBackend};
//!
//! # async fn demo() {
//! let narrator = SpeechNarrator::new(TimedBackend::new());
//! narrator.set_rate(1.2);
//! narrator.speak("Once upon a time.", Box::new(|| println!("done")));
//! # }
//! ```

pub mod engine;
pub mod speech;
pub mod timed;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{
    clamp_rate, estimate_duration_ms, pick_default_voice, Narrator, OnComplete, Voice, MAX_RATE,
    MIN_RATE,
};
pub use speech::{SpeechBackend, SpeechNarrator, Utterance};
pub use timed::TimedBackend;

#[cfg(test)]
pub use engine::MockNarrator;
