//! Thematic classification of archived content.
//!
//! `ThemeClassifier` is the seam to the language-model service. The only
//! implementation shipped here, `LlmClassifier`, talks to an
//! OpenRouter-compatible chat completion API.

mod openrouter;
mod sample;

use async_trait::async_trait;

pub use openrouter::{parse_label, LlmClassifier};
pub use sample::{html_to_text, select_representative, truncate_chars, ContentSample};

use crate::domain::Domain;
use crate::error_handling::ClassificationError;

/// Topic label for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ThematicLabel {
    /// Broad site category, e.g. "E-commerce" or "Blog"
    pub primary_category: String,
    pub main_topics: Vec<String>,
    pub keywords: Vec<String>,
    pub summary: Option<String>,
    /// Model-reported confidence in `[0, 1]`
    pub confidence: f64,
    /// Model that produced the label
    pub model: String,
}

impl ThematicLabel {
    /// Case-insensitive substring match against category, topics and keywords.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        std::iter::once(&self.primary_category)
            .chain(&self.main_topics)
            .chain(&self.keywords)
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Case-insensitive category equality.
    pub fn has_category(&self, category: &str) -> bool {
        self.primary_category.trim().eq_ignore_ascii_case(category.trim())
    }
}

/// Produces a thematic label from a content sample.
#[async_trait]
pub trait ThemeClassifier: Send + Sync {
    /// Classifies `sample`, which was drawn from `domain`'s archived pages.
    ///
    /// Implementations must never send more than the sample's text.
    async fn classify(
        &self,
        domain: &Domain,
        sample: &ContentSample,
    ) -> Result<ThematicLabel, ClassificationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label() -> ThematicLabel {
        ThematicLabel {
            primary_category: "Health".to_string(),
            main_topics: vec!["Sustainable Gardening".to_string()],
            keywords: vec!["compost".to_string(), "permaculture".to_string()],
            summary: None,
            confidence: 0.8,
            model: "test".to_string(),
        }
    }

    #[test]
    fn test_mentions_searches_all_fields() {
        let label = label();
        assert!(label.mentions("health"));
        assert!(label.mentions("GARDEN"));
        assert!(label.mentions("compo"));
        assert!(!label.mentions("finance"));
    }

    #[test]
    fn test_has_category_is_exact() {
        let label = label();
        assert!(label.has_category(" health "));
        assert!(!label.has_category("heal"));
    }
}
