//! Language detection and translation stage.
//!
//! Detects the language of a comment and translates it into the working
//! language only when needed. Both steps degrade instead of failing: an
//! unusable detection falls back to the working language, and an unusable
//! translation falls back to the original text.

use sentiscope_core::{InferenceBackend, InferenceOutput, InferenceRequest, LanguageConfig};
use std::sync::Arc;
use tracing::{debug, warn};

/// ISO 639-3 codes (as emitted by fastText-style identifiers) for the
/// languages we see most, mapped to their ISO 639-1 form.
const THREE_TO_TWO: &[(&str, &str)] = &[
    ("eng", "en"),
    ("spa", "es"),
    ("fra", "fr"),
    ("deu", "de"),
    ("ita", "it"),
    ("por", "pt"),
    ("nld", "nl"),
    ("rus", "ru"),
    ("hin", "hi"),
    ("ben", "bn"),
    ("urd", "ur"),
    ("arb", "ar"),
    ("ara", "ar"),
    ("zho", "zh"),
    ("cmn", "zh"),
    ("jpn", "ja"),
    ("kor", "ko"),
    ("tur", "tr"),
];

/// Reduce a provider language label to a bare lower-case code.
///
/// `__label__eng_Latn`, `eng_Latn`, `EN` and `en` all become `en`.
#[must_use]
pub fn normalise_language_code(label: &str) -> String {
    let code = label
        .trim()
        .trim_start_matches("__label__")
        .split(['_', '-'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    THREE_TO_TWO
        .iter()
        .find(|(three, _)| *three == code)
        .map(|(_, two)| (*two).to_string())
        .unwrap_or(code)
}

/// Detect-then-translate stage.
pub struct LanguageStage {
    backend: Arc<dyn InferenceBackend>,
    config: LanguageConfig,
}

impl LanguageStage {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: LanguageConfig) -> Self {
        Self { backend, config }
    }

    /// The language the rest of the pipeline expects.
    #[must_use]
    pub fn working_language(&self) -> &str {
        &self.config.working_language
    }

    /// Detect the language of `text`; the first candidate's label wins.
    ///
    /// Any failure yields the working language.
    pub async fn detect_language(&self, text: &str) -> String {
        let request = InferenceRequest::DetectLanguage {
            text: text.to_string(),
        };
        match self.backend.call(&request).await {
            Ok(InferenceOutput::Labels(labels)) => match labels.first() {
                Some(first) if !normalise_language_code(&first.label).is_empty() => {
                    normalise_language_code(&first.label)
                }
                _ => {
                    debug!("Language detection returned no usable label, assuming working language");
                    self.config.working_language.clone()
                }
            },
            Ok(other) => {
                warn!(output = ?other, "Unexpected language detection output");
                self.config.working_language.clone()
            }
            Err(e) => {
                warn!(error = %e, "Language detection failed, assuming working language");
                self.config.working_language.clone()
            }
        }
    }

    /// Translate `text` from `source_language` into the working language.
    ///
    /// No call is made when `source_language` already is the working
    /// language. Any failure returns `text` unchanged.
    pub async fn translate(&self, text: &str, source_language: &str) -> String {
        if normalise_language_code(source_language)
            == normalise_language_code(&self.config.working_language)
        {
            return text.to_string();
        }

        let request = InferenceRequest::Translate {
            text: text.to_string(),
            source_language: source_language.to_string(),
        };
        match self.backend.call(&request).await {
            Ok(InferenceOutput::Text(translated)) if !translated.trim().is_empty() => {
                debug!(source_language, "Translated comment text");
                translated
            }
            Ok(_) => {
                warn!(source_language, "Translation returned nothing usable, keeping original text");
                text.to_string()
            }
            Err(e) => {
                warn!(source_language, error = %e, "Translation failed, keeping original text");
                text.to_string()
            }
        }
    }

    /// Bring `text` into the working language. Pass-through when disabled.
    pub async fn to_working_language(&self, text: &str) -> String {
        if !self.config.enabled {
            return text.to_string();
        }
        let language = self.detect_language(text).await;
        self.translate(text, &language).await
    }
}
