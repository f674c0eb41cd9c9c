//! Story line and image reference types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ImageRef
// ---------------------------------------------------------------------------

/// Opaque reference to an illustration: a URL or a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Build a JPEG data URL from base64-encoded bytes.
    ///
    /// ```
    /// use visual_storyteller::story::ImageRef;
    ///
    /// let img = ImageRef::jpeg_base64("AAAA");
    /// assert_eq!(img.as_str(), "data:image/jpeg;base64,AAAA");
    /// ```
    pub fn jpeg_base64(bytes: &str) -> Self {
        Self(format!("data:image/jpeg;base64,{bytes}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Data URLs are huge; show only the scheme prefix.
        if self.0.starts_with("data:") {
            let head = self.0.split(',').next().unwrap_or("data:");
            write!(f, "{head},… ({} bytes)", self.0.len())
        } else {
            f.write_str(&self.0)
        }
    }
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// One sentence of a story, optionally paired with an illustration.
///
/// Lines are immutable once built; a new story replaces the whole sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    #[serde(rename = "imageUrl", default)]
    pub image: Option<ImageRef>,
}

impl Line {
    /// A text-only line.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    /// A line with an attached illustration.
    pub fn with_image(text: impl Into<String>, image: ImageRef) -> Self {
        Self {
            text: text.into(),
            image: Some(image),
        }
    }
}

/// Prompt used to illustrate a single line of the story.
pub fn illustration_prompt(text: &str) -> String {
    format!(
        "A whimsical, softly lit children's storybook illustration, no text or lettering: {}",
        text.trim()
    )
}

/// Build text-only lines from segmented sentences.  Blank sentences are
/// skipped; the narrator never reports completion for them.
pub fn lines_from_sentences(sentences: Vec<String>) -> Vec<Line> {
    sentences
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .map(Line::new)
        .collect()
}
