//! Per-comment resolution pipeline.
//!
//! Text goes through language detection, translation, and the text resolver;
//! the image goes through the image resolver. The two branches run
//! concurrently and meet in [`fuse`].

use crate::fusion::fuse;
use crate::image::ImageResolver;
use crate::language::LanguageStage;
use crate::text::TextResolver;
use sentiscope_core::{Comment, EngineConfig, InferenceBackend, ResolvedSentiment, SentimentLabel};
use std::sync::Arc;
use tracing::debug;

/// Resolves a single comment to a [`ResolvedSentiment`].
pub struct CommentPipeline {
    language: LanguageStage,
    text: TextResolver,
    /// `None` when image analysis is disabled.
    image: Option<ImageResolver>,
}

impl CommentPipeline {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: &EngineConfig) -> Self {
        let image = config
            .image
            .enabled
            .then(|| ImageResolver::new(Arc::clone(&backend), config.image.clone()));
        Self {
            language: LanguageStage::new(Arc::clone(&backend), config.language.clone()),
            text: TextResolver::new(backend, config.text.clone()),
            image,
        }
    }

    /// Resolve one comment. Never fails: every external failure has already
    /// been degraded by the stage that saw it.
    pub async fn resolve(&self, comment: &Comment) -> ResolvedSentiment {
        if comment.is_blank() {
            debug!("Comment has neither text nor image, resolving neutral");
            return ResolvedSentiment {
                text_label: None,
                image_label: None,
                fused_label: SentimentLabel::Neutral,
                failed: false,
            };
        }

        let (text_label, image_label) =
            tokio::join!(self.resolve_text(comment), self.resolve_image(comment));
        let fused_label = fuse(text_label, image_label);
        debug!(
            text = ?text_label,
            image = ?image_label,
            fused = %fused_label,
            "Resolved comment"
        );

        ResolvedSentiment {
            text_label,
            image_label,
            fused_label,
            failed: false,
        }
    }

    async fn resolve_text(&self, comment: &Comment) -> Option<SentimentLabel> {
        let text = comment.usable_text()?;
        let working = self.language.to_working_language(text).await;
        Some(self.text.resolve(&working).await)
    }

    async fn resolve_image(&self, comment: &Comment) -> Option<SentimentLabel> {
        let resolver = self.image.as_ref()?;
        let url = comment.image_url.as_deref()?;
        resolver.resolve(url).await
    }
}
