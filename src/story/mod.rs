//! Stories — lines, sentence segmentation, the generation flow and the
//! saved-story slot.
//!
//! # Quick start
//!
//! ```rust
//! use visual_storyteller::story::{lines_from_sentences, segment};
//!
//! let lines = lines_from_sentences(segment("A cat sat. It slept!"));
//! assert_eq!(lines.len(), 2);
//! assert!(lines[0].image.is_none());
//! ```

pub mod line;
pub mod segment;
pub mod store;
pub mod studio;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use line::{illustration_prompt, lines_from_sentences, ImageRef, Line};
pub use segment::segment;
pub use store::{StoryStore, STORAGE_KEY};
pub use studio::{StoryStudio, StudioError, GENERATION_FAILED};
