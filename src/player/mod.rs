//! Story playback.
//!
//! # Architecture
//!
//! ```text
//!  front-end ──PlayerCommand──▶ PlaybackOrchestrator ──speak/pause/cancel──▶ Narrator
//!      ▲                          │        ▲
//!      │                          │        └── PlayerEvent (narration end,
//!      │                          │            fade timer, image fetch)
//!      └──── snapshot() ◀── SharedPlayback
//! ```
//!
//! The orchestrator is the single writer of [`SharedPlayback`]; front-ends
//! read it through [`PlayerHandle::snapshot`].

pub mod orchestrator;
pub mod state;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use orchestrator::{
    PlaybackOrchestrator, PlayerCommand, PlayerEvent, PlayerHandle, DEFAULT_FADE_OUT,
};
pub use state::{
    new_shared_playback, Phase, PlaybackSnapshot, PlaybackState, SharedPlayback,
    DEFAULT_LINE_DURATION_MS,
};
