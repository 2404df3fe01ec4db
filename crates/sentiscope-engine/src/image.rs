//! Image sentiment resolution.
//!
//! An attached image is run through up to three strategies, in order:
//!
//! 1. **Label classification**: the classifier's labels are scanned in
//!    provider order; on each label the negative indicators are checked
//!    before the positive ones.
//! 2. **Captioning**: the generated caption is lower-cased and scanned for
//!    negative words, then positive words.
//! 3. **Zero-shot matching**: the image is scored against fixed candidate
//!    phrases and the best phrase is mapped to a label.
//!
//! The first strategy to produce a conclusive label wins. A strategy whose
//! call fails is skipped silently. When nothing is conclusive the result is
//! `None`, which is distinct from a resolved `neutral`.

use sentiscope_core::{
    ImageConfig, InferenceBackend, InferenceOutput, InferenceRequest, LabelScore, SentimentLabel,
};
use std::sync::Arc;
use tracing::{debug, warn};

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

/// Scan classifier labels in order; negatives are checked first per label.
#[must_use]
pub fn scan_labels(
    labels: &[LabelScore],
    negative: &[String],
    positive: &[String],
) -> Option<SentimentLabel> {
    labels.iter().find_map(|prediction| {
        let label = prediction.label.to_lowercase();
        if contains_any(&label, negative) {
            Some(SentimentLabel::Negative)
        } else if contains_any(&label, positive) {
            Some(SentimentLabel::Positive)
        } else {
            None
        }
    })
}

/// Scan a caption for negative, then positive, words.
#[must_use]
pub fn scan_caption(
    caption: &str,
    negative: &[String],
    positive: &[String],
) -> Option<SentimentLabel> {
    let caption = caption.to_lowercase();
    if contains_any(&caption, negative) {
        Some(SentimentLabel::Negative)
    } else if contains_any(&caption, positive) {
        Some(SentimentLabel::Positive)
    } else {
        None
    }
}

/// Three-strategy image resolver.
pub struct ImageResolver {
    backend: Arc<dyn InferenceBackend>,
    config: ImageConfig,
}

impl ImageResolver {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: ImageConfig) -> Self {
        Self { backend, config }
    }

    /// Whether `image_url` is worth sending anywhere.
    #[must_use]
    pub fn is_usable(&self, image_url: &str) -> bool {
        let url = image_url.trim();
        !url.is_empty()
            && url != "undefined"
            && self
                .config
                .accepted_schemes
                .iter()
                .any(|scheme| url.starts_with(scheme.as_str()))
    }

    /// Resolve the sentiment of an attached image.
    pub async fn resolve(&self, image_url: &str) -> Option<SentimentLabel> {
        if !self.is_usable(image_url) {
            debug!(image_url, "Unusable image reference, no image signal");
            return None;
        }
        let image_url = image_url.trim();

        if let Some(label) = self.by_classification(image_url).await {
            debug!(%label, "Image resolved by label classification");
            return Some(label);
        }
        if let Some(label) = self.by_caption(image_url).await {
            debug!(%label, "Image resolved by captioning");
            return Some(label);
        }
        let label = self.by_zero_shot(image_url).await;
        if label.is_none() {
            debug!("No conclusive sentiment detected in image");
        }
        label
    }

    async fn by_classification(&self, image_url: &str) -> Option<SentimentLabel> {
        let request = InferenceRequest::ClassifyImage {
            image_url: image_url.to_string(),
        };
        match self.backend.call(&request).await {
            Ok(InferenceOutput::Labels(labels)) => scan_labels(
                &labels,
                &self.config.label_negative,
                &self.config.label_positive,
            ),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Image classification failed, trying captioning");
                None
            }
        }
    }

    async fn by_caption(&self, image_url: &str) -> Option<SentimentLabel> {
        let request = InferenceRequest::CaptionImage {
            image_url: image_url.to_string(),
        };
        match self.backend.call(&request).await {
            Ok(InferenceOutput::Text(caption)) => {
                debug!(%caption, "Generated image caption");
                scan_caption(
                    &caption,
                    &self.config.caption_negative,
                    &self.config.caption_positive,
                )
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Image captioning failed, trying zero-shot matching");
                None
            }
        }
    }

    async fn by_zero_shot(&self, image_url: &str) -> Option<SentimentLabel> {
        let request = InferenceRequest::MatchImage {
            image_url: image_url.to_string(),
            candidates: self.config.zero_shot_candidates.clone(),
        };
        let matches = match self.backend.call(&request).await {
            Ok(InferenceOutput::ZeroShot(matches)) => matches,
            Ok(_) => return None,
            Err(e) => {
                warn!(error = %e, "Zero-shot image matching failed");
                return None;
            }
        };

        let phrase = matches.best_match()?;
        debug!(phrase, "Highest matching concept");
        if contains_any(phrase, &self.config.zero_shot_negative) {
            Some(SentimentLabel::Negative)
        } else if contains_any(phrase, &self.config.zero_shot_positive) {
            Some(SentimentLabel::Positive)
        } else if contains_any(phrase, &self.config.zero_shot_neutral) {
            Some(SentimentLabel::Neutral)
        } else {
            None
        }
    }
}
