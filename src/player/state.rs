//! Playback phase, session state and the presentation read model.
//!
//! [`PlaybackState`] is owned by the orchestrator and shared with the
//! presentation layer through [`SharedPlayback`].  Front-ends should read it
//! through [`PlaybackState::snapshot`] rather than holding the lock.

use std::sync::{Arc, Mutex};

use crate::story::{ImageRef, Line};

/// Line duration reported before any line has been timed.
pub const DEFAULT_LINE_DURATION_MS: u64 = 3_000;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Top-level playback state.
///
/// ```text
/// Idle ──start(lines)──▶ Playing ──pause──▶ Paused
///                        Playing ◀─resume── Paused
/// Playing / Paused ──stop / story end / lines replaced──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No session.
    #[default]
    Idle,
    /// Narrating the current line (or fading between lines).
    Playing,
    /// Narration and line transitions are suspended.
    Paused,
}

impl Phase {
    /// `true` for `Playing` and `Paused`, i.e. a session exists.
    ///
    /// ```
    /// use visual_storyteller::player::Phase;
    ///
    /// assert!(!Phase::Idle.is_active());
    /// assert!(Phase::Playing.is_active());
    /// assert!(Phase::Paused.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        !matches!(self, Phase::Idle)
    }
}

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

/// The orchestrator's session state.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    /// Story lines in narration order.  Replaced wholesale, never edited.
    pub lines: Vec<Line>,
    /// Position in `lines`; `0 ..= lines.len()`.
    pub current_index: usize,
    pub phase: Phase,
    /// Whether the current line is faded in.
    pub visible: bool,
    /// Estimated duration of the current line, for the progress timer.
    pub line_duration_ms: u64,
    /// Illustration for the current line, once known.
    pub current_image: Option<ImageRef>,
    /// An illustration for the current line is still being fetched.
    pub image_pending: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            current_index: 0,
            phase: Phase::Idle,
            visible: false,
            line_duration_ms: DEFAULT_LINE_DURATION_MS,
            current_image: None,
            image_pending: false,
        }
    }
}

impl PlaybackState {
    pub fn current_line(&self) -> Option<&Line> {
        self.lines.get(self.current_index)
    }

    /// Clear everything that belongs to a session, keeping the lines.
    pub(crate) fn clear_session(&mut self) {
        self.phase = Phase::Idle;
        self.current_index = 0;
        self.visible = false;
        self.current_image = None;
        self.image_pending = false;
    }

    /// Copy out the read model.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current_line_text: self
                .current_line()
                .map(|l| l.text.clone())
                .unwrap_or_default(),
            is_playing: self.phase.is_active(),
            is_paused: self.phase == Phase::Paused,
            is_visible: self.visible,
            current_duration_ms: self.line_duration_ms,
            current_image: self.current_image.clone(),
            image_pending: self.image_pending,
            current_index: self.current_index,
            total_lines: self.lines.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackSnapshot
// ---------------------------------------------------------------------------

/// Presentation read model.
///
/// `is_playing` stays `true` while paused so transport controls can offer
/// resume and stop; `is_paused` tells the two apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub current_line_text: String,
    pub is_playing: bool,
    pub is_paused: bool,
    pub is_visible: bool,
    pub current_duration_ms: u64,
    pub current_image: Option<ImageRef>,
    pub image_pending: bool,
    pub current_index: usize,
    pub total_lines: usize,
}

// ---------------------------------------------------------------------------
// SharedPlayback
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`PlaybackState`].
///
/// Cheap to clone (`Arc` clone).  Lock for a short critical section; do
/// **not** hold the lock across `.await` points.
pub type SharedPlayback = Arc<Mutex<PlaybackState>>;

/// Construct a new [`SharedPlayback`] with no lines.
pub fn new_shared_playback() -> SharedPlayback {
    Arc::new(Mutex::new(PlaybackState::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_phase_is_idle() {
        assert_eq!(Phase::default(), Phase::Idle);
        assert!(!Phase::default().is_active());
    }

    #[test]
    fn default_state_is_empty_and_idle() {
        let st = PlaybackState::default();
        assert!(st.lines.is_empty());
        assert_eq!(st.phase, Phase::Idle);
        assert_eq!(st.line_duration_ms, DEFAULT_LINE_DURATION_MS);
        assert!(st.current_line().is_none());
    }

    #[test]
    fn snapshot_reports_paused_as_playing() {
        let mut st = PlaybackState {
            lines: vec![Line::new("One."), Line::new("Two.")],
            current_index: 1,
            phase: Phase::Paused,
            ..PlaybackState::default()
        };
        let snap = st.snapshot();
        assert!(snap.is_playing);
        assert!(snap.is_paused);
        assert_eq!(snap.current_line_text, "Two.");
        assert_eq!(snap.total_lines, 2);

        st.clear_session();
        let snap = st.snapshot();
        assert!(!snap.is_playing);
        assert_eq!(snap.current_index, 0);
        assert_eq!(snap.current_line_text, "One.");
    }

    #[test]
    fn snapshot_past_the_end_has_no_text() {
        let st = PlaybackState {
            lines: vec![Line::new("One.")],
            current_index: 1,
            ..PlaybackState::default()
        };
        assert_eq!(st.snapshot().current_line_text, "");
    }

    #[test]
    fn shared_playback_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedPlayback>();
    }
}
