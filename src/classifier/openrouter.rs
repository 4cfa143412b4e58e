//! Chat-completion classifier (OpenRouter-compatible API).

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::sample::truncate_chars;
use super::{ContentSample, ThematicLabel, ThemeClassifier};
use crate::config::{DEFAULT_LABEL_CONFIDENCE, MAX_LABEL_KEYWORDS};
use crate::domain::Domain;
use crate::error_handling::{
    categorize_classifier_error, classification_error_for_status, ClassificationError,
};

const SYSTEM_PROMPT: &str = "You are an expert in website content analysis. \
Analyze the following text from an archived website and provide a concise thematic summary. \
Identify the main topics, keywords (up to 10), and suggest a primary category for the website \
(e.g., E-commerce, Blog, News, Corporate, Technology, Health, etc.). \
Respond only with a JSON object with keys: 'primary_category' (string), \
'main_topics' (list of strings), 'keywords' (list of strings), 'summary' (a brief text summary) \
and 'confidence' (a number between 0 and 1 describing how sure you are of the category).";

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$")
        .expect("Failed to compile code fence regex - this is a bug")
});

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// The JSON object the model is asked to produce.
#[derive(Deserialize)]
struct RawLabel {
    primary_category: Option<String>,
    #[serde(default)]
    main_topics: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    summary: Option<String>,
    confidence: Option<f64>,
}

/// Classifies content through `POST {base_url}/chat/completions`.
///
/// Without an API key every call fails with `ClassificationError::NotConfigured`,
/// which the orchestrator records as a warning.
#[derive(Clone)]
pub struct LlmClassifier {
    client: Arc<reqwest::Client>,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_chars: usize,
}

impl LlmClassifier {
    pub fn new(
        client: Arc<reqwest::Client>,
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        max_chars: usize,
    ) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            log::warn!("Classifier API key is not set, thematic enrichment will be skipped");
        }
        LlmClassifier {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            max_chars,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether a usable API key was supplied.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ThemeClassifier for LlmClassifier {
    async fn classify(
        &self,
        domain: &Domain,
        sample: &ContentSample,
    ) -> Result<ThematicLabel, ClassificationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ClassificationError::NotConfigured)?;
        let text = truncate_chars(sample.text(), self.max_chars);
        if text.trim().is_empty() {
            return Err(ClassificationError::EmptySample);
        }

        let user_content =
            format!("Analyze the following archived website content for domain {domain}:\n\n{text}");
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_content,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| categorize_classifier_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| categorize_classifier_error(&e))?;
        if !status.is_success() {
            return Err(classification_error_for_status(status.as_u16(), &body));
        }

        let reply: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ClassificationError::Malformed(format!("completion envelope: {e}")))?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ClassificationError::Malformed("reply has no content".to_string()))?;

        let label = parse_label(&content, &self.model)?;
        log::debug!(
            "Classified {} as '{}' ({:.2})",
            domain,
            label.primary_category,
            label.confidence
        );
        Ok(label)
    }
}

/// Parses the model's reply into a label.
///
/// Accepts a bare JSON object, one wrapped in a Markdown code fence, or one
/// embedded in surrounding prose. A missing or out-of-range confidence falls
/// back to the default; values between 1 and 100 are read as percentages.
///
/// # Errors
///
/// Returns `ClassificationError::Malformed` if no JSON object can be read or
/// it has no primary category.
pub fn parse_label(content: &str, model: &str) -> Result<ThematicLabel, ClassificationError> {
    let unfenced = CODE_FENCE
        .captures(content)
        .and_then(|c| c.get(1))
        .map_or(content, |m| m.as_str());
    let json = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => {
            return Err(ClassificationError::Malformed(
                "reply contains no JSON object".to_string(),
            ))
        }
    };

    let raw: RawLabel =
        serde_json::from_str(json).map_err(|e| ClassificationError::Malformed(e.to_string()))?;
    let primary_category = raw
        .primary_category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ClassificationError::Malformed("missing primary_category".to_string()))?;

    Ok(ThematicLabel {
        primary_category,
        main_topics: clean_list(raw.main_topics, usize::MAX),
        keywords: clean_list(raw.keywords, MAX_LABEL_KEYWORDS),
        summary: raw
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        confidence: normalize_confidence(raw.confidence),
        model: model.to_string(),
    })
}

fn clean_list(items: Vec<String>, limit: usize) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .take(limit)
        .collect()
}

fn normalize_confidence(value: Option<f64>) -> f64 {
    match value {
        Some(v) if (0.0..=1.0).contains(&v) => v,
        Some(v) if v > 1.0 && v <= 100.0 => v / 100.0,
        _ => DEFAULT_LABEL_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let reply = r#"{"primary_category": "Blog", "main_topics": ["Gardening"],
            "keywords": ["seeds", " compost "], "summary": "A gardening blog.", "confidence": 0.9}"#;
        let label = parse_label(reply, "m").unwrap();
        assert_eq!(label.primary_category, "Blog");
        assert_eq!(label.main_topics, vec!["Gardening"]);
        assert_eq!(label.keywords, vec!["seeds", "compost"]);
        assert_eq!(label.summary.as_deref(), Some("A gardening blog."));
        assert_eq!(label.confidence, 0.9);
        assert_eq!(label.model, "m");
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "```json\n{\"primary_category\": \"News\"}\n```";
        let label = parse_label(reply, "m").unwrap();
        assert_eq!(label.primary_category, "News");
        assert!(label.main_topics.is_empty());
    }

    #[test]
    fn test_parse_json_in_prose() {
        let reply = "Here is the analysis: {\"primary_category\": \"Corporate\"} Hope it helps!";
        assert_eq!(
            parse_label(reply, "m").unwrap().primary_category,
            "Corporate"
        );
    }

    #[test]
    fn test_missing_confidence_defaults() {
        let label = parse_label(r#"{"primary_category": "Health"}"#, "m").unwrap();
        assert_eq!(label.confidence, DEFAULT_LABEL_CONFIDENCE);
    }

    #[test]
    fn test_confidence_normalization() {
        assert_eq!(normalize_confidence(Some(85.0)), 0.85);
        assert_eq!(normalize_confidence(Some(-1.0)), DEFAULT_LABEL_CONFIDENCE);
        assert_eq!(normalize_confidence(Some(f64::NAN)), DEFAULT_LABEL_CONFIDENCE);
        assert_eq!(normalize_confidence(Some(1.0)), 1.0);
    }

    #[test]
    fn test_keywords_capped() {
        let keywords: Vec<String> = (0..25).map(|i| format!("\"k{i}\"")).collect();
        let reply = format!(
            r#"{{"primary_category": "Tech", "keywords": [{}]}}"#,
            keywords.join(",")
        );
        let label = parse_label(&reply, "m").unwrap();
        assert_eq!(label.keywords.len(), MAX_LABEL_KEYWORDS);
        assert_eq!(label.keywords[0], "k0");
    }

    #[test]
    fn test_unparseable_replies() {
        assert!(matches!(
            parse_label("I cannot help with that.", "m"),
            Err(ClassificationError::Malformed(_))
        ));
        assert!(matches!(
            parse_label(r#"{"primary_category": ""}"#, "m"),
            Err(ClassificationError::Malformed(_))
        ));
        assert!(matches!(
            parse_label(r#"{"primary_category": "x", "keywords": "not a list"}"#, "m"),
            Err(ClassificationError::Malformed(_))
        ));
    }
}
