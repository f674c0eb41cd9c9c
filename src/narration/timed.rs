//! Headless speech backend that "speaks" for as long as the text would take.
//!
//! [`TimedBackend`] runs each utterance as a tokio task that sleeps for the
//! estimated speech time of the text at the utterance's rate.  Pausing stops
//! the clock; resuming continues with the remaining time; cancelling aborts
//! the task and reports the end immediately.  It needs a running tokio
//! runtime.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::engine::{speech_ms, OnComplete, Voice};
use super::speech::{SpeechBackend, Utterance};

struct ActiveUtterance {
    id: u64,
    paused_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    on_end: Option<OnComplete>,
}

#[derive(Default)]
struct TimedState {
    next_id: u64,
    active: Option<ActiveUtterance>,
}

/// Clock-driven [`SpeechBackend`] for terminals and tests.
pub struct TimedBackend {
    voices: Vec<Voice>,
    state: Arc<Mutex<TimedState>>,
}

impl TimedBackend {
    pub fn new() -> Self {
        Self::with_voices(vec![Voice::new(
            "timed-en",
            "Timed narrator",
            "en-US",
            true,
        )])
    }

    pub fn with_voices(voices: Vec<Voice>) -> Self {
        Self {
            voices,
            state: Arc::new(Mutex::new(TimedState::default())),
        }
    }

    /// Remove the utterance `id` if it is still active and report its end.
    fn finish(state: &Mutex<TimedState>, id: u64) {
        let on_end = match state.lock() {
            Ok(mut st) if st.active.as_ref().is_some_and(|a| a.id == id) => {
                st.active.take().and_then(|a| a.on_end)
            }
            _ => None,
        };
        if let Some(on_end) = on_end {
            on_end();
        }
    }
}

impl Default for TimedBackend {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_clock(total: Duration, mut paused_rx: watch::Receiver<bool>) {
    let mut remaining = total;
    loop {
        if *paused_rx.borrow_and_update() {
            if paused_rx.changed().await.is_err() {
                return;
            }
            continue;
        }

        let started = Instant::now();
        tokio::select! {
            _ = tokio::time::sleep(remaining) => return,
            changed = paused_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                remaining = remaining.saturating_sub(started.elapsed());
            }
        }
    }
}

#[async_trait]
impl SpeechBackend for TimedBackend {
    async fn load_voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn utter(&self, utterance: Utterance, on_end: OnComplete) {
        self.cancel();

        let total = Duration::from_millis(speech_ms(&utterance.text, utterance.rate) as u64);
        let (paused_tx, paused_rx) = watch::channel(false);

        let Ok(mut st) = self.state.lock() else {
            return;
        };
        st.next_id += 1;
        let id = st.next_id;

        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            run_clock(total, paused_rx).await;
            TimedBackend::finish(&state, id);
        });

        log::trace!("timed speech #{id}: {:?} for {total:?}", utterance.text);
        st.active = Some(ActiveUtterance {
            id,
            paused_tx,
            task,
            on_end: Some(on_end),
        });
    }

    fn is_speaking(&self) -> bool {
        self.state.lock().map(|st| st.active.is_some()).unwrap_or(false)
    }

    fn is_paused(&self) -> bool {
        self.state
            .lock()
            .map(|st| st.active.as_ref().is_some_and(|a| *a.paused_tx.borrow()))
            .unwrap_or(false)
    }

    fn pause(&self) {
        if let Ok(st) = self.state.lock() {
            if let Some(active) = st.active.as_ref() {
                let _ = active.paused_tx.send(true);
            }
        }
    }

    fn resume(&self) {
        if let Ok(st) = self.state.lock() {
            if let Some(active) = st.active.as_ref() {
                let _ = active.paused_tx.send(false);
            }
        }
    }

    fn cancel(&self) {
        let active = self.state.lock().ok().and_then(|mut st| st.active.take());
        if let Some(active) = active {
            active.task.abort();
            if let Some(on_end) = active.on_end {
                on_end();
            }
        }
    }
}
