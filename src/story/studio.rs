//! Story Studio — turns a prompt into a playing story.
//!
//! ```text
//! generate(prompt)
//!   ├─ stop playback if a session is active
//!   ├─ provider.generate_text(prompt)  ──▶ segment ──▶ lines
//!   ├─ ImageMode::Eager: one illustration per line, concurrently
//!   └─ player.replace_lines(lines), player.start(lines), GenerateSuccess
//! ```
//!
//! The studio also owns the single saved-story slot.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;

use crate::config::{AppConfig, ImageMode};
use crate::player::PlayerHandle;
use crate::provider::{ProviderError, StoryProvider};
use crate::sound::{Sound, SoundEffects};
use crate::story::{illustration_prompt, lines_from_sentences, segment, Line, StoryStore};

/// Message shown to the user whenever generation fails.
pub const GENERATION_FAILED: &str = "Sorry, I couldn't write a story right now. Please try again.";

/// Errors from [`StoryStudio::generate`].  Both variants display the same
/// user-facing message; the cause is kept for logging.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Sorry, I couldn't write a story right now. Please try again.")]
    Generation(#[from] ProviderError),

    /// The provider answered, but with no sentences to narrate.
    #[error("Sorry, I couldn't write a story right now. Please try again.")]
    EmptyStory,
}

/// Generation, staging and persistence of the current story.
pub struct StoryStudio {
    provider: Arc<dyn StoryProvider>,
    player: PlayerHandle,
    store: StoryStore,
    sounds: Arc<dyn SoundEffects>,
    image_mode: ImageMode,
    auto_start: bool,
    prompt: String,
    staged: Option<Vec<Line>>,
}

impl StoryStudio {
    pub fn new(
        provider: Arc<dyn StoryProvider>,
        player: PlayerHandle,
        store: StoryStore,
        sounds: Arc<dyn SoundEffects>,
    ) -> Self {
        let defaults = AppConfig::default();
        Self {
            provider,
            player,
            store,
            sounds,
            image_mode: defaults.playback.image_mode,
            auto_start: defaults.story.auto_start,
            prompt: defaults.story.prompt,
            staged: None,
        }
    }

    /// Apply the `playback.image_mode` and `story` settings.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.image_mode = config.playback.image_mode;
        self.auto_start = config.story.auto_start;
        self.prompt = config.story.prompt.clone();
        self
    }

    /// The story currently staged for playback, if any.
    pub fn staged(&self) -> Option<&[Line]> {
        self.staged.as_deref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Generate a story from the configured prompt.
    pub async fn generate(&mut self) -> Result<Vec<Line>, StudioError> {
        let prompt = self.prompt.clone();
        self.generate_from(&prompt).await
    }

    /// Generate a story from `prompt`, hand it to the player and (when
    /// `auto_start` is set) start narrating.
    pub async fn generate_from(&mut self, prompt: &str) -> Result<Vec<Line>, StudioError> {
        if self.player.snapshot().is_playing {
            self.player.stop().await;
        }

        let lines = match self.write_story(prompt).await {
            Ok(lines) => lines,
            Err(e) => {
                match &e {
                    StudioError::Generation(cause) => {
                        log::error!("studio: story generation failed: {cause}")
                    }
                    StudioError::EmptyStory => log::warn!("studio: provider returned no sentences"),
                }
                self.staged = None;
                return Err(e);
            }
        };

        log::info!("studio: story ready ({} lines)", lines.len());
        self.staged = Some(lines.clone());
        self.player.replace_lines(lines.clone()).await;
        if self.auto_start {
            self.player.start(lines.clone()).await;
        }
        self.sounds.play(Sound::GenerateSuccess);
        Ok(lines)
    }

    async fn write_story(&self, prompt: &str) -> Result<Vec<Line>, StudioError> {
        let text = self.provider.generate_text(prompt).await?;
        let lines = lines_from_sentences(segment(&text));
        if lines.is_empty() {
            return Err(StudioError::EmptyStory);
        }

        match self.image_mode {
            ImageMode::Eager => Ok(self.illustrate_all(lines).await),
            ImageMode::None | ImageMode::PerLine => Ok(lines),
        }
    }

    /// Fetch one illustration per line concurrently.  A failed fetch leaves
    /// that line without an image.
    async fn illustrate_all(&self, mut lines: Vec<Line>) -> Vec<Line> {
        let mut fetches = JoinSet::new();
        for (index, line) in lines.iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let prompt = illustration_prompt(&line.text);
            fetches.spawn(async move { (index, provider.generate_image(&prompt).await) });
        }

        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((index, Ok(image))) => lines[index].image = Some(image),
                Ok((index, Err(e))) => {
                    log::warn!("studio: illustration for line {index} failed: {e}")
                }
                Err(e) => log::warn!("studio: illustration task failed: {e}"),
            }
        }
        lines
    }

    // -----------------------------------------------------------------------
    // Saved story
    // -----------------------------------------------------------------------

    /// Save the staged story.  `false` when there is nothing to save or the
    /// write fails.
    pub fn save(&self) -> bool {
        match &self.staged {
            Some(lines) => self.store.save(lines),
            None => {
                log::debug!("studio: nothing to save");
                false
            }
        }
    }

    /// Load the saved story into the player without starting it.  Returns
    /// the number of lines loaded.
    pub async fn load_saved(&mut self) -> Option<usize> {
        let lines = self.store.load()?;
        let count = lines.len();
        self.player.replace_lines(lines.clone()).await;
        self.staged = Some(lines);
        log::info!("studio: loaded saved story ({count} lines)");
        Some(count)
    }

    pub fn has_saved(&self) -> bool {
        self.store.exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::narration::{MockNarrator, Narrator};
    use crate::player::{new_shared_playback, PlaybackOrchestrator};
    use crate::provider::ScriptedProvider;
    use crate::sound::RecordedSounds;

    const STORY: &str = "A fox found a lantern. It glowed softly! The forest woke up.";

    struct Rig {
        studio: StoryStudio,
        player: PlayerHandle,
        narrator: Arc<MockNarrator>,
        sounds: Arc<RecordedSounds>,
        provider: Arc<ScriptedProvider>,
        _dir: TempDir,
    }

    fn rig(provider: ScriptedProvider, image_mode: ImageMode) -> Rig {
        let dir = tempdir().unwrap();
        let narrator = Arc::new(MockNarrator::new());
        let sounds = Arc::new(RecordedSounds::new());
        let provider = Arc::new(provider);

        let player = PlaybackOrchestrator::new(
            new_shared_playback(),
            Arc::clone(&narrator) as Arc<dyn Narrator>,
            Arc::clone(&sounds) as Arc<dyn SoundEffects>,
        )
        .spawn();

        let mut config = AppConfig::default();
        config.playback.image_mode = image_mode;
        let studio = StoryStudio::new(
            Arc::clone(&provider) as Arc<dyn StoryProvider>,
            player.clone(),
            StoryStore::in_dir(dir.path()),
            Arc::clone(&sounds) as Arc<dyn SoundEffects>,
        )
        .with_config(&config);

        Rig {
            studio,
            player,
            narrator,
            sounds,
            provider,
            _dir: dir,
        }
    }

    /// Let the spawned player drain its command queue.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn generate_segments_and_starts_playback() {
        let mut rig = rig(ScriptedProvider::story(STORY), ImageMode::None);

        let lines = rig.studio.generate().await.unwrap();
        settle().await;

        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["A fox found a lantern.", "It glowed softly!", "The forest woke up."]
        );
        assert!(lines.iter().all(|l| l.image.is_none()));
        assert_eq!(rig.studio.staged().map(|s| s.len()), Some(3));

        let snap = rig.player.snapshot();
        assert!(snap.is_playing);
        assert_eq!(snap.total_lines, 3);
        assert_eq!(rig.narrator.spoken(), vec!["A fox found a lantern."]);
        assert!(rig.sounds.played().contains(&Sound::GenerateSuccess));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_start_off_only_stages_the_story() {
        let mut rig = rig(ScriptedProvider::story(STORY), ImageMode::None);
        let mut config = AppConfig::default();
        config.story.auto_start = false;
        config.playback.image_mode = ImageMode::None;
        rig.studio = rig.studio.with_config(&config);

        rig.studio.generate().await.unwrap();
        settle().await;

        let snap = rig.player.snapshot();
        assert!(!snap.is_playing);
        assert_eq!(snap.total_lines, 3);
        assert!(rig.narrator.spoken().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn eager_mode_illustrates_every_line() {
        let mut rig = rig(ScriptedProvider::story(STORY), ImageMode::Eager);

        let lines = rig.studio.generate().await.unwrap();

        assert_eq!(rig.provider.image_calls(), 3);
        for line in &lines {
            let expected = format!("img:{}", illustration_prompt(&line.text));
            assert_eq!(line.image.as_ref().map(|i| i.as_str()), Some(expected.as_str()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn eager_mode_tolerates_failed_illustrations() {
        let provider = ScriptedProvider::story(STORY).with_failing_images();
        let mut rig = rig(provider, ImageMode::Eager);

        let lines = rig.studio.generate().await.unwrap();

        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.image.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn per_line_mode_defers_illustrations_to_the_player() {
        let mut rig = rig(ScriptedProvider::story(STORY), ImageMode::PerLine);

        let lines = rig.studio.generate().await.unwrap();

        assert!(lines.iter().all(|l| l.image.is_none()));
        assert_eq!(rig.provider.image_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_failure_clears_staged_story() {
        let mut rig = rig(ScriptedProvider::story(STORY), ImageMode::None);
        rig.studio.generate().await.unwrap();
        assert!(rig.studio.staged().is_some());

        rig.studio.provider = Arc::new(ScriptedProvider::failing()) as Arc<dyn StoryProvider>;
        let err = rig.studio.generate().await.unwrap_err();

        assert!(matches!(err, StudioError::Generation(_)));
        assert_eq!(err.to_string(), GENERATION_FAILED);
        assert!(rig.studio.staged().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_story_is_an_error() {
        let mut rig = rig(ScriptedProvider::story("   "), ImageMode::None);

        let err = rig.studio.generate().await.unwrap_err();

        assert!(matches!(err, StudioError::EmptyStory));
        assert_eq!(err.to_string(), GENERATION_FAILED);
        assert!(!rig.sounds.played().contains(&Sound::GenerateSuccess));
    }

    #[tokio::test(start_paused = true)]
    async fn generating_again_stops_the_current_session() {
        let mut rig = rig(ScriptedProvider::story(STORY), ImageMode::None);
        rig.studio.generate().await.unwrap();
        settle().await;

        rig.studio.generate_from("Another one.").await.unwrap();
        settle().await;

        assert!(rig.sounds.played().contains(&Sound::Stop));
        let snap = rig.player.snapshot();
        assert!(snap.is_playing);
        assert_eq!(snap.current_index, 0);
        assert_eq!(rig.narrator.spoken().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn save_and_load_round_trip_through_the_player() {
        let mut rig = rig(ScriptedProvider::story(STORY), ImageMode::None);
        assert!(!rig.studio.save());
        assert!(!rig.studio.has_saved());

        rig.studio.generate().await.unwrap();
        assert!(rig.studio.save());
        assert!(rig.studio.has_saved());

        rig.player.stop().await;
        settle().await;
        let loaded = rig.studio.load_saved().await;
        settle().await;

        assert_eq!(loaded, Some(3));
        let snap = rig.player.snapshot();
        assert!(!snap.is_playing);
        assert_eq!(snap.total_lines, 3);
        assert_eq!(snap.current_line_text, "A fox found a lantern.");
    }

    #[tokio::test(start_paused = true)]
    async fn load_without_saved_story_is_none() {
        let mut rig = rig(ScriptedProvider::story(STORY), ImageMode::None);
        assert_eq!(rig.studio.load_saved().await, None);
        assert!(rig.studio.staged().is_none());
    }
}
