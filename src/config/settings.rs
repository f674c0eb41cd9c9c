//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ImageMode
// ---------------------------------------------------------------------------

/// Selects when story illustrations are requested.
///
/// | Variant   | When images are fetched                         |
/// |-----------|-------------------------------------------------|
/// | None      | Never; text-only playback                       |
/// | Eager     | All lines, concurrently, before playback starts |
/// | PerLine   | Lazily, as each line comes up during playback   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMode {
    /// No illustrations.
    None,
    /// Illustrate every line up front. Slower start, no mid-story stalls.
    Eager,
    /// Illustrate each line when it is reached. Fast start, per-line wait.
    PerLine,
}

impl Default for ImageMode {
    fn default() -> Self {
        Self::PerLine
    }
}

// ---------------------------------------------------------------------------
// ProviderConfig
// ---------------------------------------------------------------------------

/// Settings for the generative story / image provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Generative Language API.
    pub base_url: String,
    /// API key.  When `None` the `API_KEY` environment variable is consulted.
    pub api_key: Option<String>,
    /// Model used for story text (e.g. `"gemini-2.5-flash"`).
    pub text_model: String,
    /// Model used for illustrations (e.g. `"imagen-4.0-generate-001"`).
    pub image_model: String,
    /// Sampling temperature for story text.
    pub temperature: f32,
    /// Nucleus sampling cut-off for story text.
    pub top_p: f32,
    /// Maximum seconds to wait for a provider response.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: None,
            text_model: "gemini-2.5-flash".into(),
            image_model: "imagen-4.0-generate-001".into(),
            temperature: 0.8,
            top_p: 0.95,
            timeout_secs: 60,
        }
    }
}

impl ProviderConfig {
    /// The configured API key, falling back to the `API_KEY` environment
    /// variable.  Empty strings count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// NarrationConfig
// ---------------------------------------------------------------------------

/// Voice settings applied to the narrator at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationConfig {
    /// Preferred voice id.  `None` lets the narrator pick a default
    /// (a local English voice when available).
    pub voice: Option<String>,
    /// Speaking rate multiplier; clamped to `0.1 ..= 10.0` by the narrator.
    pub rate: f32,
    /// Pitch multiplier passed to every utterance.
    pub pitch: f32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            voice: None,
            rate: 1.0,
            pitch: 1.1,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Timing and illustration settings for the playback orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Delay between the end of a line's narration and the next line, in
    /// milliseconds.  Matches the fade-out animation length.
    pub fade_out_ms: u64,
    /// When illustrations are requested.
    pub image_mode: ImageMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fade_out_ms: 1_000,
            image_mode: ImageMode::default(),
        }
    }
}

impl PlaybackConfig {
    /// The fade-out delay as a [`Duration`].
    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }
}

// ---------------------------------------------------------------------------
// StoryConfig
// ---------------------------------------------------------------------------

/// Settings for the story generation flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryConfig {
    /// Prompt sent to the text model.
    pub prompt: String,
    /// Start narrating as soon as a new story has been generated.
    pub auto_start: bool,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            prompt: "Write a short, enchanting fantasy story for children in about 3-4 sentences."
                .into(),
            auto_start: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use visual_storyteller::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Story / image provider settings.
    pub provider: ProviderConfig,
    /// Narrator voice settings.
    pub narration: NarrationConfig,
    /// Orchestrator timing settings.
    pub playback: PlaybackConfig,
    /// Story generation settings.
    pub story: StoryConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario).
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
