//! Saved-story persistence.
//!
//! [`StoryStore`] keeps a single story as a JSON array of [`Line`]s under a
//! fixed key inside a directory-backed key-value store:
//!
//! | Platform | Path |
//! |----------|------|
//! | Windows  | `%LOCALAPPDATA%\visual-storyteller\stories\visual-storyteller-saved-story.json` |
//! | macOS    | `~/Library/Application Support/visual-storyteller/stories/…` |
//! | Linux    | `~/.local/share/visual-storyteller/stories/…` |
//!
//! Failures never reach the caller: they are logged and reported as `false`
//! or `None`.  There is no versioning; an unreadable payload is treated as
//! no saved story.

use std::path::{Path, PathBuf};

use crate::config::AppPaths;
use crate::story::Line;

/// Key under which the story is stored.
pub const STORAGE_KEY: &str = "visual-storyteller-saved-story";

/// Single-slot story persistence.
#[derive(Debug, Clone)]
pub struct StoryStore {
    path: PathBuf,
}

impl StoryStore {
    /// Store rooted at the platform data directory.
    pub fn open_default() -> Self {
        Self::in_dir(&AppPaths::new().stories_dir)
    }

    /// Store rooted at an explicit directory (useful for tests).
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{STORAGE_KEY}.json")),
        }
    }

    /// Persist `lines`, replacing any previously saved story.
    ///
    /// Returns `false` (after logging) when serialisation or the write fails.
    pub fn save(&self, lines: &[Line]) -> bool {
        let data = match serde_json::to_string(lines) {
            Ok(data) => data,
            Err(e) => {
                log::error!("store: failed to serialise story: {e}");
                return false;
            }
        };

        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("store: cannot create {}: {e}", parent.display());
                return false;
            }
        }

        match std::fs::write(&self.path, data) {
            Ok(()) => {
                log::debug!("store: saved {} lines to {}", lines.len(), self.path.display());
                true
            }
            Err(e) => {
                log::error!("store: failed to write {}: {e}", self.path.display());
                false
            }
        }
    }

    /// Load the saved story, or `None` when nothing usable is stored.
    pub fn load(&self) -> Option<Vec<Line>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::error!("store: failed to read {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str::<Vec<Line>>(&data) {
            Ok(mut lines) => {
                // A blank line would never finish narrating.
                let before = lines.len();
                lines.retain(|l| !l.text.trim().is_empty());
                if lines.len() != before {
                    log::warn!("store: dropped {} blank line(s)", before - lines.len());
                }
                Some(lines)
            }
            Err(e) => {
                log::warn!("store: ignoring malformed saved story: {e}");
                None
            }
        }
    }

    /// Whether a story has been saved (regardless of whether it still parses).
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::ImageRef;
    use tempfile::tempdir;

    fn sample() -> Vec<Line> {
        vec![
            Line::new("A fox found a lantern."),
            Line::with_image("It glowed!", ImageRef::jpeg_base64("QUJD")),
        ]
    }

    #[test]
    fn load_without_save_is_none() {
        let dir = tempdir().unwrap();
        let store = StoryStore::in_dir(dir.path());
        assert!(store.load().is_none());
        assert!(!store.exists());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = StoryStore::in_dir(&dir.path().join("nested"));

        assert!(store.save(&sample()));
        assert!(store.exists());
        assert_eq!(store.load(), Some(sample()));
    }

    #[test]
    fn save_replaces_previous_story() {
        let dir = tempdir().unwrap();
        let store = StoryStore::in_dir(dir.path());

        assert!(store.save(&sample()));
        assert!(store.save(&[Line::new("Only one.")]));
        assert_eq!(store.load(), Some(vec![Line::new("Only one.")]));
    }

    #[test]
    fn malformed_payload_is_treated_as_absent() {
        let dir = tempdir().unwrap();
        let store = StoryStore::in_dir(dir.path());
        std::fs::write(dir.path().join(format!("{STORAGE_KEY}.json")), "{not json").unwrap();

        assert!(store.exists());
        assert!(store.load().is_none());
    }

    #[test]
    fn blank_lines_are_dropped_on_load() {
        let dir = tempdir().unwrap();
        let store = StoryStore::in_dir(dir.path());
        std::fs::write(
            dir.path().join(format!("{STORAGE_KEY}.json")),
            r#"[{"text":"  "},{"text":"Next.","imageUrl":null},{"text":""}]"#,
        )
        .unwrap();

        assert_eq!(store.load(), Some(vec![Line::new("Next.")]));
    }

    #[test]
    fn non_array_payload_is_treated_as_absent() {
        let dir = tempdir().unwrap();
        let store = StoryStore::in_dir(dir.path());
        std::fs::write(
            dir.path().join(format!("{STORAGE_KEY}.json")),
            r#"{"text":"not a list"}"#,
        )
        .unwrap();

        assert!(store.load().is_none());
    }
}
