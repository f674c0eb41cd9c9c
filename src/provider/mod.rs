//! Generative content provider for Visual Storyteller.
//!
//! This module provides:
//! * [`StoryProvider`] — async trait for story text and illustrations.
//! * [`GeminiProvider`] — Google Generative Language REST backend.
//! * [`ProviderError`] — error variants for provider calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use visual_storyteller::config::AppConfig;
//! use visual_storyteller::provider::{GeminiProvider, StoryProvider};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let provider = GeminiProvider::from_config(&config.provider);
//!
//!     let story = provider.generate_text(&config.story.prompt).await.unwrap();
//!     println!("{story}");
//! }
//! ```

pub mod gemini;
pub mod generator;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use gemini::GeminiProvider;
pub use generator::{ProviderError, StoryProvider};

#[cfg(test)]
pub use generator::ScriptedProvider;
