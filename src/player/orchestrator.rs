//! Playback orchestrator — sequences narration, fades and illustrations.
//!
//! [`PlaybackOrchestrator`] owns the [`SharedPlayback`] state and reacts to
//! two kinds of input:
//!
//! * transport commands (`start`, `stop`, `pause`, `resume`,
//!   `replace_lines`), called directly or sent as [`PlayerCommand`]s;
//! * [`PlayerEvent`]s produced by its own asynchronous work (narration
//!   callbacks, the fade-out timer and illustration fetches).
//!
//! # Line cycle
//!
//! ```text
//! begin_line(i)
//!   ├─ line_duration_ms = estimate(text, rate)
//!   ├─ image: attached → show │ provider → fetch (tagged gen, i) │ none
//!   └─ visible = true, FadeIn, narrator.speak(text) ─┐
//!                                                    ▼
//!              NarrationFinished(gen, i) → visible = false, FadeOut, timer
//!                                                    ▼
//!              FadeElapsed(gen, i) → i + 1 < len ? begin_line(i + 1) : stop
//! ```
//!
//! Every event carries the session generation and line index it was issued
//! for.  Stopping, restarting or replacing lines bumps the generation, so
//! late narration callbacks, timers and fetches from an earlier line or
//! session are dropped instead of touching the current one.

use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::narration::Narrator;
use crate::provider::StoryProvider;
use crate::sound::{Sound, SoundEffects};
use crate::story::{illustration_prompt, ImageRef, Line};

use super::state::{Phase, PlaybackSnapshot, PlaybackState, SharedPlayback};

/// Delay between the end of a line's narration and the next line.
pub const DEFAULT_FADE_OUT: Duration = Duration::from_millis(1_000);

// ---------------------------------------------------------------------------
// Commands and events
// ---------------------------------------------------------------------------

/// Transport commands accepted by [`PlaybackOrchestrator::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    Start(Vec<Line>),
    Stop,
    Pause,
    Resume,
    ReplaceLines(Vec<Line>),
}

/// Completions of the orchestrator's own asynchronous work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The utterance for line `index` ended naturally.
    NarrationFinished { generation: u64, index: usize },
    /// The fade-out after line `index` has run its course.
    FadeElapsed { generation: u64, index: usize },
    /// The illustration fetch for line `index` settled.
    ImageResolved {
        generation: u64,
        index: usize,
        image: Option<ImageRef>,
    },
}

// ---------------------------------------------------------------------------
// PlaybackOrchestrator
// ---------------------------------------------------------------------------

/// Drives story playback.
///
/// Must be used inside a tokio runtime: timers and illustration fetches are
/// spawned as tasks.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use visual_storyteller::narration::{SpeechNarrator, TimedBackend};
/// use visual_storyteller::player::{new_shared_playback, PlaybackOrchestrator};
/// use visual_storyteller::sound::LogSounds;
/// use visual_storyteller::story::Line;
///
/// # async fn example() {
/// let orchestrator = PlaybackOrchestrator::new(
///     new_shared_playback(),
///     Arc::new(SpeechNarrator::new(TimedBackend::new())),
///     Arc::new(LogSounds),
/// );
/// let player = orchestrator.spawn();
/// player.start(vec![Line::new("Once upon a time.")]).await;
/// # }
/// ```
pub struct PlaybackOrchestrator {
    state: SharedPlayback,
    narrator: Arc<dyn Narrator>,
    sounds: Arc<dyn SoundEffects>,
    images: Option<Arc<dyn StoryProvider>>,
    fade_out: Duration,
    /// Bumped on every session teardown; tags all asynchronous work.
    generation: u64,
    fade_timer: Option<JoinHandle<()>>,
    /// The fade-out finished while paused; advance on resume.
    advance_on_resume: bool,
    events_tx: mpsc::UnboundedSender<PlayerEvent>,
    events_rx: mpsc::UnboundedReceiver<PlayerEvent>,
}

impl PlaybackOrchestrator {
    /// Create an orchestrator without per-line illustration fetching.
    ///
    /// * `state`    — shared playback state (also read by the front-end).
    /// * `narrator` — speech engine; the orchestrator is its only speaker.
    /// * `sounds`   — interface cue sink.
    pub fn new(
        state: SharedPlayback,
        narrator: Arc<dyn Narrator>,
        sounds: Arc<dyn SoundEffects>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state,
            narrator,
            sounds,
            images: None,
            fade_out: DEFAULT_FADE_OUT,
            generation: 0,
            fade_timer: None,
            advance_on_resume: false,
            events_tx,
            events_rx,
        }
    }

    /// Fetch an illustration for each line without one as it comes up.
    pub fn with_image_provider(mut self, provider: Arc<dyn StoryProvider>) -> Self {
        self.images = Some(provider);
        self
    }

    pub fn with_fade_out(mut self, fade_out: Duration) -> Self {
        self.fade_out = fade_out;
        self
    }

    pub fn state(&self) -> SharedPlayback {
        Arc::clone(&self.state)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.lock().snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    // -----------------------------------------------------------------------
    // Transport commands
    // -----------------------------------------------------------------------

    /// Begin narrating `lines` from the top.  Empty `lines` is a no-op; an
    /// active session is torn down first.
    pub fn start(&mut self, lines: Vec<Line>) {
        if lines.is_empty() {
            log::debug!("player: start ignored, no lines");
            return;
        }

        self.teardown();
        {
            let mut st = self.lock();
            st.lines = lines;
            st.clear_session();
            st.phase = Phase::Playing;
            log::info!("player: starting story ({} lines)", st.lines.len());
        }
        self.sounds.play(Sound::Start);
        self.begin_line();
    }

    /// End the session and return to `Idle`.  No-op when already idle.
    pub fn stop(&mut self) {
        if !self.phase().is_active() {
            return;
        }
        log::info!("player: stopped");
        self.sounds.play(Sound::Stop);
        self.teardown();
    }

    /// Suspend narration.  Only valid while `Playing`.
    pub fn pause(&mut self) {
        {
            let mut st = self.lock();
            if st.phase != Phase::Playing {
                return;
            }
            st.phase = Phase::Paused;
        }
        log::debug!("player: paused");
        self.sounds.play(Sound::Pause);
        self.narrator.pause();
    }

    /// Continue a paused session.  Only valid while `Paused`.
    pub fn resume(&mut self) {
        {
            let mut st = self.lock();
            if st.phase != Phase::Paused {
                return;
            }
            st.phase = Phase::Playing;
        }
        log::debug!("player: resumed");
        self.sounds.play(Sound::Resume);
        self.narrator.resume();

        if std::mem::take(&mut self.advance_on_resume) {
            self.advance();
        }
    }

    /// Swap in a new story without playing it.  An active session is
    /// stopped before the new lines are installed.
    pub fn replace_lines(&mut self, lines: Vec<Line>) {
        if self.phase().is_active() {
            log::debug!("player: lines replaced during playback, stopping");
        }
        self.teardown();
        let mut st = self.lock();
        st.lines = lines;
        st.clear_session();
    }

    pub fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Start(lines) => self.start(lines),
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::Resume => self.resume(),
            PlayerCommand::ReplaceLines(lines) => self.replace_lines(lines),
        }
    }

    // -----------------------------------------------------------------------
    // Asynchronous completions
    // -----------------------------------------------------------------------

    pub fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::NarrationFinished { generation, index } => {
                self.on_narration_finished(generation, index)
            }
            PlayerEvent::FadeElapsed { generation, index } => {
                self.on_fade_elapsed(generation, index)
            }
            PlayerEvent::ImageResolved {
                generation,
                index,
                image,
            } => self.on_image_resolved(generation, index, image),
        }
    }

    /// Wait for the next internal event and apply it.
    pub async fn process_next_event(&mut self) {
        // The orchestrator holds a sender, so the channel never closes.
        if let Some(event) = self.events_rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Apply every event that is already queued; returns how many.
    pub fn process_pending_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    fn on_narration_finished(&mut self, generation: u64, index: usize) {
        {
            let mut st = self.lock();
            // A second report for the same line would schedule a second fade.
            if !self.is_current(&st, generation, index) || !st.visible {
                log::debug!(
                    "player: ignoring stale narration end (gen {generation}, line {index})"
                );
                return;
            }
            st.visible = false;
        }
        self.sounds.play(Sound::FadeOut);

        let tx = self.events_tx.clone();
        let fade_out = self.fade_out;
        self.fade_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(fade_out).await;
            let _ = tx.send(PlayerEvent::FadeElapsed { generation, index });
        }));
    }

    fn on_fade_elapsed(&mut self, generation: u64, index: usize) {
        let phase = {
            let st = self.lock();
            if !self.is_current(&st, generation, index) {
                return;
            }
            st.phase
        };
        self.fade_timer = None;

        if phase == Phase::Paused {
            log::debug!("player: fade finished while paused, holding line {index}");
            self.advance_on_resume = true;
            return;
        }
        self.advance();
    }

    fn on_image_resolved(&mut self, generation: u64, index: usize, image: Option<ImageRef>) {
        let mut st = self.lock();
        if !self.is_current(&st, generation, index) {
            log::debug!("player: discarding illustration for line {index} (no longer current)");
            return;
        }
        st.current_image = image;
        st.image_pending = false;
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `commands` is closed, then stop any active session.
    pub async fn run(mut self, mut commands: mpsc::Receiver<PlayerCommand>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        self.teardown();
        log::info!("player: command channel closed, orchestrator shutting down");
    }

    /// Spawn [`run`](Self::run) on the current runtime and return a handle.
    pub fn spawn(self) -> PlayerHandle {
        let (tx, rx) = mpsc::channel(16);
        let handle = PlayerHandle {
            commands: tx,
            state: self.state(),
        };
        tokio::spawn(self.run(rx));
        handle
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, st: &PlaybackState, generation: u64, index: usize) -> bool {
        generation == self.generation && st.phase.is_active() && st.current_index == index
    }

    /// Cancel everything in flight and reset the session, keeping the lines.
    fn teardown(&mut self) {
        self.generation += 1;
        self.advance_on_resume = false;
        if let Some(timer) = self.fade_timer.take() {
            timer.abort();
        }

        let was_active = {
            let mut st = self.lock();
            let was_active = st.phase.is_active();
            st.clear_session();
            was_active
        };
        if was_active {
            self.narrator.cancel();
        }
    }

    fn advance(&mut self) {
        let finished = {
            let mut st = self.lock();
            st.current_index += 1;
            st.current_index >= st.lines.len()
        };

        if finished {
            log::info!("player: story finished");
            self.teardown();
        } else {
            self.begin_line();
        }
    }

    /// Enter the per-line cycle for the current index.
    fn begin_line(&mut self) {
        let generation = self.generation;
        let (index, line) = {
            let st = self.lock();
            match st.current_line() {
                Some(line) => (st.current_index, line.clone()),
                None => return,
            }
        };

        let duration = self.narrator.estimated_duration_ms(&line.text);
        let fetch = {
            let mut st = self.lock();
            st.line_duration_ms = duration;
            st.visible = true;
            match (&line.image, &self.images) {
                (Some(image), _) => {
                    st.current_image = Some(image.clone());
                    st.image_pending = false;
                    None
                }
                (None, Some(provider)) => {
                    st.current_image = None;
                    st.image_pending = true;
                    Some(Arc::clone(provider))
                }
                (None, None) => {
                    st.current_image = None;
                    st.image_pending = false;
                    None
                }
            }
        };
        log::debug!("player: line {index} ({duration} ms): {:?}", line.text);

        if let Some(provider) = fetch {
            let tx = self.events_tx.clone();
            let prompt = illustration_prompt(&line.text);
            tokio::spawn(async move {
                let image = match provider.generate_image(&prompt).await {
                    Ok(image) => Some(image),
                    Err(e) => {
                        log::warn!("player: illustration for line {index} failed: {e}");
                        None
                    }
                };
                let _ = tx.send(PlayerEvent::ImageResolved {
                    generation,
                    index,
                    image,
                });
            });
        }

        self.sounds.play(Sound::FadeIn);

        let tx = self.events_tx.clone();
        self.narrator.speak(
            &line.text,
            Box::new(move || {
                let _ = tx.send(PlayerEvent::NarrationFinished { generation, index });
            }),
        );
    }
}

// ---------------------------------------------------------------------------
// PlayerHandle
// ---------------------------------------------------------------------------

/// Cloneable front-end handle to a spawned orchestrator.
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<PlayerCommand>,
    state: SharedPlayback,
}

impl PlayerHandle {
    pub async fn send(&self, command: PlayerCommand) {
        if self.commands.send(command).await.is_err() {
            log::warn!("player: orchestrator is gone, command dropped");
        }
    }

    pub async fn start(&self, lines: Vec<Line>) {
        self.send(PlayerCommand::Start(lines)).await;
    }

    pub async fn stop(&self) {
        self.send(PlayerCommand::Stop).await;
    }

    pub async fn pause(&self) {
        self.send(PlayerCommand::Pause).await;
    }

    pub async fn resume(&self) {
        self.send(PlayerCommand::Resume).await;
    }

    pub async fn replace_lines(&self, lines: Vec<Line>) {
        self.send(PlayerCommand::ReplaceLines(lines)).await;
    }

    /// Current read model.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
