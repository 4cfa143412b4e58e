//! Content sampling for thematic classification.
//!
//! Only a bounded copy of the archived pages ever leaves this module: bodies
//! are capped on read by the archive client, reduced to visible text here and
//! the combined sample is cut to a fixed number of characters.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::models::{Snapshot, Timeline};

const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "svg"];
const PART_SEPARATOR: &str = "\n\n";

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title").expect("Failed to parse title selector - this is a bug")
});

static META_DESCRIPTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[name='description']")
        .expect("Failed to parse meta description selector - this is a bug")
});

static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("body").expect("Failed to parse body selector - this is a bug")
});

/// Picks up to `count` representative successful captures.
///
/// The earliest and latest 2xx captures are always included (when
/// `count >= 2`); remaining slots are spread evenly between them, so
/// `count = 3` gives earliest, midpoint and latest. Returned in chronological
/// order without duplicates.
pub fn select_representative(timeline: &Timeline, count: usize) -> Vec<&Snapshot> {
    let successful: Vec<&Snapshot> = timeline
        .snapshots()
        .iter()
        .filter(|s| s.is_success())
        .collect();
    if successful.is_empty() || count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![successful[successful.len() - 1]];
    }

    let last = successful.len() - 1;
    let mut indices: Vec<usize> = (0..count)
        .map(|slot| (slot * last + (count - 1) / 2) / (count - 1))
        .collect();
    indices.dedup();

    indices.into_iter().map(|i| successful[i]).collect()
}

/// Reduces an HTML page to its title, meta description and visible body text,
/// with whitespace collapsed. Non-HTML bodies come back as their text.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<String> = Vec::new();

    if let Some(title) = document.select(&TITLE_SELECTOR).next() {
        parts.push(title.text().collect::<String>());
    }
    if let Some(content) = document
        .select(&META_DESCRIPTION_SELECTOR)
        .next()
        .and_then(|meta| meta.value().attr("content"))
    {
        parts.push(content.to_string());
    }

    if let Some(body) = document.select(&BODY_SELECTOR).next() {
        for node in body.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
            });
            if !hidden {
                parts.push(text.to_string());
            }
        }
    }

    collapse_whitespace(&parts.join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The bounded text sent to the classifier for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSample {
    text: String,
    parts: usize,
    truncated: bool,
}

impl ContentSample {
    /// Combines page texts into one sample of at most `max_chars` characters.
    ///
    /// The budget is shared across parts, so one long page cannot crowd out
    /// the others; characters a short page does not need go to the longer ones.
    /// Returns `None` when no part has any text.
    pub fn from_parts<S: AsRef<str>>(parts: &[S], max_chars: usize) -> Option<Self> {
        let texts: Vec<&str> = parts
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .collect();
        if texts.is_empty() || max_chars == 0 {
            return None;
        }

        let separators = PART_SEPARATOR.chars().count() * (texts.len() - 1);
        let mut budget = max_chars.saturating_sub(separators);
        let mut truncated = false;

        // Shortest parts first so their unused share flows to the longer ones
        let mut order: Vec<usize> = (0..texts.len()).collect();
        order.sort_by_key(|&i| texts[i].chars().count());
        let mut kept: Vec<&str> = vec![""; texts.len()];
        for (n, &i) in order.iter().enumerate() {
            let share = budget / (texts.len() - n);
            let piece = truncate_chars(texts[i], share);
            if piece.len() < texts[i].len() {
                truncated = true;
            }
            budget -= piece.chars().count();
            kept[i] = piece;
        }

        let joined = kept.join(PART_SEPARATOR);
        // Separators alone can exceed a tiny budget
        let capped = truncate_chars(&joined, max_chars);
        if capped.len() < joined.len() {
            truncated = true;
        }
        let text = capped.trim().to_string();
        if text.is_empty() {
            return None;
        }

        // A piece counts only if it is non-empty and starts inside the cap
        let cap = capped.chars().count();
        let separator = PART_SEPARATOR.chars().count();
        let mut offset = 0;
        let mut contributing = 0;
        for piece in &kept {
            if !piece.is_empty() && offset < cap {
                contributing += 1;
            }
            offset += piece.chars().count() + separator;
        }

        Some(ContentSample {
            text,
            parts: contributing,
            truncated,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Pages that contributed text.
    pub fn parts(&self) -> usize {
        self.parts
    }

    /// Whether any page text was cut to fit the budget.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}
