//! [`SpeechNarrator`] — the production [`Narrator`] built on a platform
//! [`SpeechBackend`].
//!
//! The backend only knows how to start, pause, resume and cancel one
//! utterance and reports the end of every utterance, cancelled or not.  The
//! narrator adds what the orchestrator relies on:
//!
//! * one-time voice loading with a sensible default voice,
//! * rate clamping and the fixed narration pitch,
//! * a per-utterance cancellation flag, set before the backend is told to
//!   cancel, so a cancelled utterance never reports completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::engine::{clamp_rate, pick_default_voice, Narrator, OnComplete, Voice};

// ---------------------------------------------------------------------------
// SpeechBackend
// ---------------------------------------------------------------------------

/// Parameters for a single utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
}

/// Minimal platform speech synthesis surface.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Resolve the installed voices.  Called once.
    async fn load_voices(&self) -> Vec<Voice>;

    /// Start speaking.  `on_end` fires when the utterance stops for any
    /// reason, including [`cancel`](SpeechBackend::cancel).
    fn utter(&self, utterance: Utterance, on_end: OnComplete);

    fn is_speaking(&self) -> bool;

    fn is_paused(&self) -> bool;

    fn pause(&self);

    fn resume(&self);

    /// Stop the current utterance immediately.
    fn cancel(&self);
}

// ---------------------------------------------------------------------------
// SpeechNarrator
// ---------------------------------------------------------------------------

struct NarratorState {
    selected: Option<Voice>,
    rate: f32,
    /// Cancellation flag of the utterance started by the last `speak`.
    current: Option<Arc<AtomicBool>>,
}

/// [`Narrator`] over any [`SpeechBackend`].
pub struct SpeechNarrator<B: SpeechBackend> {
    backend: B,
    voices: OnceCell<Vec<Voice>>,
    pitch: f32,
    state: Mutex<NarratorState>,
}

impl<B: SpeechBackend> SpeechNarrator<B> {
    /// Pitch applied to story narration.
    pub const DEFAULT_PITCH: f32 = 1.1;

    pub fn new(backend: B) -> Self {
        Self::with_pitch(backend, Self::DEFAULT_PITCH)
    }

    pub fn with_pitch(backend: B, pitch: f32) -> Self {
        Self {
            backend,
            voices: OnceCell::new(),
            pitch,
            state: Mutex::new(NarratorState {
                selected: None,
                rate: 1.0,
                current: None,
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn loaded_voices(&self) -> &Vec<Voice> {
        self.voices
            .get_or_init(|| async {
                let voices = self.backend.load_voices().await;
                log::info!("narration: {} voices available", voices.len());
                if let Ok(mut st) = self.state.lock() {
                    if st.selected.is_none() {
                        st.selected = pick_default_voice(&voices);
                    }
                }
                voices
            })
            .await
    }

    /// Flag the active utterance cancelled; returns whether one existed.
    fn flag_current_cancelled(&self) -> bool {
        let current = self.state.lock().ok().and_then(|mut st| st.current.take());
        match current {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl<B: SpeechBackend> Narrator for SpeechNarrator<B> {
    async fn voices(&self) -> Vec<Voice> {
        self.loaded_voices().await.clone()
    }

    async fn set_voice(&self, id: &str) {
        let voice = self.loaded_voices().await.iter().find(|v| v.id == id).cloned();
        match voice {
            Some(voice) => {
                log::debug!("narration: voice set to {}", voice.name);
                if let Ok(mut st) = self.state.lock() {
                    st.selected = Some(voice);
                }
            }
            None => log::error!("narration: voice not found for id: {id}"),
        }
    }

    fn selected_voice(&self) -> Option<Voice> {
        self.state.lock().ok().and_then(|st| st.selected.clone())
    }

    fn set_rate(&self, rate: f32) {
        if let Ok(mut st) = self.state.lock() {
            st.rate = clamp_rate(rate);
        }
    }

    fn rate(&self) -> f32 {
        self.state.lock().map(|st| st.rate).unwrap_or(1.0)
    }

    fn speak(&self, text: &str, on_complete: OnComplete) {
        if self.flag_current_cancelled() || self.backend.is_speaking() {
            self.backend.cancel();
        }

        if text.trim().is_empty() {
            log::debug!("narration: nothing to speak");
            return;
        }

        let flag = Arc::new(AtomicBool::new(false));
        let (voice, rate) = match self.state.lock() {
            Ok(mut st) => {
                st.current = Some(Arc::clone(&flag));
                (st.selected.clone(), st.rate)
            }
            Err(_) => (None, 1.0),
        };

        let utterance = Utterance {
            text: text.to_string(),
            voice,
            rate,
            pitch: self.pitch,
        };

        self.backend.utter(
            utterance,
            Box::new(move || {
                // Only report speech that ended on its own.
                if !flag.load(Ordering::SeqCst) {
                    on_complete();
                }
            }),
        );
    }

    async fn speak_preview(&self, text: &str, voice_id: &str) {
        let voice = self
            .loaded_voices()
            .await
            .iter()
            .find(|v| v.id == voice_id)
            .cloned();
        let Some(voice) = voice else {
            log::error!("narration: preview voice not found for id: {voice_id}");
            return;
        };

        self.cancel();

        let utterance = Utterance {
            text: text.to_string(),
            voice: Some(voice),
            rate: self.rate(),
            pitch: self.pitch,
        };
        self.backend.utter(utterance, Box::new(|| {}));
    }

    fn pause(&self) {
        if self.backend.is_speaking() && !self.backend.is_paused() {
            self.backend.pause();
        }
    }

    fn resume(&self) {
        if self.backend.is_paused() {
            self.backend.resume();
        }
    }

    fn cancel(&self) {
        self.flag_current_cancelled();
        self.backend.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Backend that records utterances and lets the test end them.
    #[derive(Default)]
    struct ScriptedBackend {
        voices: Vec<Voice>,
        inner: Mutex<Scripted>,
    }

    #[derive(Default)]
    struct Scripted {
        uttered: Vec<Utterance>,
        on_end: Option<OnComplete>,
        paused: bool,
        pause_calls: usize,
        resume_calls: usize,
        cancel_calls: usize,
    }

    impl ScriptedBackend {
        fn with_voices(voices: Vec<Voice>) -> Self {
            Self {
                voices,
                ..Self::default()
            }
        }

        fn finish(&self) {
            let cb = self.inner.lock().unwrap().on_end.take();
            if let Some(cb) = cb {
                cb();
            }
        }

        fn uttered(&self) -> Vec<Utterance> {
            self.inner.lock().unwrap().uttered.clone()
        }
    }

    #[async_trait]
    impl SpeechBackend for ScriptedBackend {
        async fn load_voices(&self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn utter(&self, utterance: Utterance, on_end: OnComplete) {
            let mut st = self.inner.lock().unwrap();
            st.uttered.push(utterance);
            st.on_end = Some(on_end);
        }

        fn is_speaking(&self) -> bool {
            self.inner.lock().unwrap().on_end.is_some()
        }

        fn is_paused(&self) -> bool {
            self.inner.lock().unwrap().paused
        }

        fn pause(&self) {
            let mut st = self.inner.lock().unwrap();
            st.paused = true;
            st.pause_calls += 1;
        }

        fn resume(&self) {
            let mut st = self.inner.lock().unwrap();
            st.paused = false;
            st.resume_calls += 1;
        }

        fn cancel(&self) {
            // Browsers report the end of a cancelled utterance too.
            let cb = {
                let mut st = self.inner.lock().unwrap();
                st.cancel_calls += 1;
                st.paused = false;
                st.on_end.take()
            };
            if let Some(cb) = cb {
                cb();
            }
        }
    }

    fn counter() -> (Arc<AtomicUsize>, OnComplete) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (
            count,
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("de", "Anna", "de-DE", true),
            Voice::new("en", "Alex", "en-US", true),
        ]
    }

    #[test]
    fn natural_end_reports_completion_once() {
        let narrator = SpeechNarrator::new(ScriptedBackend::default());
        let (count, cb) = counter();

        narrator.speak("Once upon a time.", cb);
        narrator.backend().finish();
        narrator.backend().finish();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelled_utterance_never_reports_completion() {
        let narrator = SpeechNarrator::new(ScriptedBackend::default());
        let (count, cb) = counter();

        narrator.speak("Once upon a time.", cb);
        narrator.cancel();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(narrator.backend().inner.lock().unwrap().cancel_calls, 1);
    }

    #[test]
    fn speak_interrupts_previous_utterance_silently() {
        let narrator = SpeechNarrator::new(ScriptedBackend::default());
        let (first, cb1) = counter();
        let (second, cb2) = counter();

        narrator.speak("First.", cb1);
        narrator.speak("Second.", cb2);
        narrator.backend().finish();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn blank_text_is_not_spoken() {
        let narrator = SpeechNarrator::new(ScriptedBackend::default());
        let (_count, cb) = counter();

        narrator.speak("   ", cb);
        assert!(narrator.backend().uttered().is_empty());
    }

    #[test]
    fn utterance_carries_rate_and_pitch() {
        let narrator = SpeechNarrator::new(ScriptedBackend::default());
        narrator.set_rate(25.0);
        let (_count, cb) = counter();

        narrator.speak("Hello.", cb);
        let u = &narrator.backend().uttered()[0];
        assert_eq!(u.rate, 10.0);
        assert_eq!(u.pitch, 1.1);
    }

    #[test]
    fn pause_and_resume_only_in_complementary_state() {
        let narrator = SpeechNarrator::new(ScriptedBackend::default());

        // Nothing speaking: pause is a no-op.
        narrator.pause();
        narrator.resume();
        assert_eq!(narrator.backend().inner.lock().unwrap().pause_calls, 0);
        assert_eq!(narrator.backend().inner.lock().unwrap().resume_calls, 0);

        let (_count, cb) = counter();
        narrator.speak("Hello.", cb);
        narrator.pause();
        narrator.pause();
        narrator.resume();
        narrator.resume();

        let st = narrator.backend().inner.lock().unwrap();
        assert_eq!(st.pause_calls, 1);
        assert_eq!(st.resume_calls, 1);
    }

    #[tokio::test]
    async fn voices_load_once_and_pick_default() {
        let narrator = SpeechNarrator::new(ScriptedBackend::with_voices(voices()));
        assert!(narrator.selected_voice().is_none());

        assert_eq!(narrator.voices().await.len(), 2);
        assert_eq!(narrator.selected_voice().unwrap().id, "en");
    }

    #[tokio::test]
    async fn set_voice_ignores_unknown_ids() {
        let narrator = SpeechNarrator::new(ScriptedBackend::with_voices(voices()));

        narrator.set_voice("de").await;
        assert_eq!(narrator.selected_voice().unwrap().id, "de");

        narrator.set_voice("nope").await;
        assert_eq!(narrator.selected_voice().unwrap().id, "de");
    }

    #[tokio::test]
    async fn preview_uses_requested_voice_and_cancels_story() {
        let narrator = SpeechNarrator::new(ScriptedBackend::with_voices(voices()));
        let (count, cb) = counter();

        narrator.speak("Story line.", cb);
        narrator.speak_preview("This is a sample narration.", "de").await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        let uttered = narrator.backend().uttered();
        assert_eq!(uttered.len(), 2);
        assert_eq!(uttered[1].voice.as_ref().unwrap().id, "de");
    }

    #[tokio::test]
    async fn preview_uses_narration_pitch() {
        let narrator = SpeechNarrator::with_pitch(ScriptedBackend::with_voices(voices()), 1.3);

        narrator.speak_preview("This is a sample narration.", "de").await;

        let uttered = narrator.backend().uttered();
        assert_eq!(uttered.len(), 1);
        assert!((uttered[0].pitch - 1.3).abs() < f32::EPSILON);
    }
}
