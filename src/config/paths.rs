//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\visual-storyteller\
//!   macOS:   ~/Library/Application Support/visual-storyteller/
//!   Linux:   ~/.config/visual-storyteller/
//!
//! Data dir (saved stories):
//!   Windows: %LOCALAPPDATA%\visual-storyteller\
//!   macOS:   ~/Library/Application Support/visual-storyteller/
//!   Linux:   ~/.local/share/visual-storyteller/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory backing the saved-story key-value store.
    pub stories_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "visual-storyteller";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let stories_dir = data_dir.join("stories");

        Self {
            config_dir,
            settings_file,
            stories_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.stories_dir.ends_with("stories"));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
    }
}
