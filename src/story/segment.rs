//! Sentence segmentation.
//!
//! A sentence is a run of characters other than `.`, `!` and `?` followed by
//! one or more of those terminators.  Text after the last terminator is
//! dropped unless the input has no terminated sentence at all, in which case
//! the whole trimmed input is returned as one sentence.

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split `text` into trimmed sentences, in order.
///
/// ```
/// use visual_storyteller::story::segment;
///
/// assert!(segment("").is_empty());
/// assert_eq!(segment("Hello world"), vec!["Hello world"]);
/// assert_eq!(segment("A cat sat. It slept!"), vec!["A cat sat.", "It slept!"]);
/// ```
pub fn segment(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if is_terminal(c) {
            // Terminators with no body in front of them never start a match.
            chars.next();
            continue;
        }

        while chars.peek().is_some_and(|&(_, c)| !is_terminal(c)) {
            chars.next();
        }

        let mut end = None;
        while let Some(&(i, c)) = chars.peek() {
            if !is_terminal(c) {
                break;
            }
            end = Some(i + c.len_utf8());
            chars.next();
        }

        match end {
            Some(end) => sentences.push(text[start..end].trim().to_string()),
            // Unterminated tail.
            None => break,
        }
    }

    if sentences.is_empty() {
        return vec![text.trim().to_string()];
    }
    sentences
}
