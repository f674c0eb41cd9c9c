pub mod config;
pub mod narration;
pub mod player;
pub mod provider;
pub mod sound;
pub mod story;
