//! Text sentiment resolution.
//!
//! Two strategies are supported:
//!
//! - **Classifier**: a hosted sentiment classifier returns `(label, score)`
//!   candidates. The top candidate must clear the confidence threshold,
//!   otherwise the text is `neutral`. Provider labels are mapped to the
//!   canonical set by substring (`"positive"`, `"negative"`) or by alias
//!   (`LABEL_1`, `LABEL_0`).
//! - **Prompt**: a few-shot prompt is sent to a text-generation endpoint and
//!   the completion is scanned for a label word.
//!
//! Every failure resolves to `neutral`.

use sentiscope_core::{
    InferenceBackend, InferenceOutput, InferenceRequest, LabelScore, SentimentLabel, TextConfig,
    TextStrategy,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Map a provider label onto the canonical set.
fn canonical_label(label: &str, aliases: &HashMap<String, SentimentLabel>) -> SentimentLabel {
    let lower = label.to_lowercase();
    if lower.contains("positive") {
        SentimentLabel::Positive
    } else if lower.contains("negative") {
        SentimentLabel::Negative
    } else {
        aliases
            .get(label)
            .copied()
            .unwrap_or(SentimentLabel::Neutral)
    }
}

/// Pick the top candidate (first seen on ties) and gate it on `threshold`.
#[must_use]
pub fn label_from_candidates(
    candidates: &[LabelScore],
    threshold: f64,
    aliases: &HashMap<String, SentimentLabel>,
) -> SentimentLabel {
    let Some(top) = candidates.iter().fold(None::<&LabelScore>, |best, cur| match best {
        Some(b) if b.score >= cur.score => Some(b),
        _ => Some(cur),
    }) else {
        return SentimentLabel::Neutral;
    };

    if top.score < threshold {
        debug!(label = %top.label, score = top.score, "Low classifier confidence, resolving neutral");
        return SentimentLabel::Neutral;
    }
    canonical_label(&top.label, aliases)
}

/// Few-shot prompt asking a generative model for a one-word verdict.
#[must_use]
pub fn build_prompt(comment: &str) -> String {
    format!(
        r#"Task: Analyze the sentiment of the following social media comment after translating it into English if it is in another language. Classify the sentiment as one of these options: Positive, Negative, or Neutral. Consider the context of the comment and the typical emotions expressed in social media posts.

Example 1:
Comment: "This is amazing! I love it!"
Sentiment: Positive

Example 2:
Comment: "This is terrible. I'm so disappointed."
Sentiment: Negative

Example 3:
Comment: "Okay, I guess."
Sentiment: Neutral

Comment: "{comment}"

Sentiment (Positive, Negative, or Neutral):"#
    )
}

/// Read a verdict out of a completion, ignoring an echoed prompt.
#[must_use]
pub fn label_from_completion(prompt: &str, completion: &str) -> SentimentLabel {
    let answer = completion.strip_prefix(prompt).unwrap_or(completion);
    let lower = answer.to_lowercase();
    if lower.contains("positive") {
        SentimentLabel::Positive
    } else if lower.contains("negative") {
        SentimentLabel::Negative
    } else {
        if !lower.contains("neutral") {
            warn!(completion = %answer.trim(), "Unexpected completion, resolving neutral");
        }
        SentimentLabel::Neutral
    }
}

/// Resolves text (already in the working language) to a sentiment label.
pub struct TextResolver {
    backend: Arc<dyn InferenceBackend>,
    config: TextConfig,
}

impl TextResolver {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: TextConfig) -> Self {
        Self { backend, config }
    }

    /// Resolve `text`. Blank text is `neutral` without any call.
    pub async fn resolve(&self, text: &str) -> SentimentLabel {
        if text.trim().is_empty() {
            return SentimentLabel::Neutral;
        }
        match self.config.strategy {
            TextStrategy::Classifier => self.classify(text).await,
            TextStrategy::Prompt => self.prompt(text).await,
        }
    }

    async fn classify(&self, text: &str) -> SentimentLabel {
        let request = InferenceRequest::ClassifyText {
            text: text.to_string(),
        };
        match self.backend.call(&request).await {
            Ok(InferenceOutput::Labels(candidates)) => label_from_candidates(
                &candidates,
                self.config.confidence_threshold,
                &self.config.aliases,
            ),
            Ok(other) => {
                warn!(output = ?other, "Unexpected text classifier output");
                SentimentLabel::Neutral
            }
            Err(e) => {
                warn!(error = %e, "Text classification failed, resolving neutral");
                SentimentLabel::Neutral
            }
        }
    }

    async fn prompt(&self, text: &str) -> SentimentLabel {
        let prompt = build_prompt(text);
        let request = InferenceRequest::GenerateText {
            prompt: prompt.clone(),
        };
        match self.backend.call(&request).await {
            Ok(InferenceOutput::Text(completion)) => label_from_completion(&prompt, &completion),
            Ok(other) => {
                warn!(output = ?other, "Unexpected text generation output");
                SentimentLabel::Neutral
            }
            Err(e) => {
                warn!(error = %e, "Prompt classification failed, resolving neutral");
                SentimentLabel::Neutral
            }
        }
    }
}
