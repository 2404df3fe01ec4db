//! Core types, traits, and errors for sentiscope
//!
//! This crate contains the foundational types shared by the sentiment engine
//! and the HTTP service: the comment and label data model, the inference
//! contract spoken by every external model call, engine configuration, and the
//! error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Unique identifier for a single engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RunId {
    /// Create a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// Version marker attached to a run.
///
/// `sequence` increases monotonically with every run the engine starts, and
/// `fingerprint` is a content hash of the comment set the run was started
/// with. A run may commit its result only while its sequence is the latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generation {
    /// Monotonic run counter.
    pub sequence: u64,
    /// Content hash of the input comment set.
    pub fingerprint: u64,
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:016x}", self.sequence, self.fingerprint)
    }
}

// ---------------------------------------------------------------------------
// Comment model
// ---------------------------------------------------------------------------

/// A user comment on a post: an optional text body and an optional image.
///
/// A comment with neither field set is accepted and resolves to `neutral`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comment {
    /// Comment body.
    #[serde(default, alias = "description")]
    pub text: Option<String>,
    /// Reference to an attached image.
    #[serde(
        default,
        rename = "imageUrl",
        alias = "image_url",
        alias = "imgurl",
        alias = "image"
    )]
    pub image_url: Option<String>,
}

impl Comment {
    /// Create a text-only comment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image_url: None,
        }
    }

    /// Create an image-only comment.
    pub fn image(image_url: impl Into<String>) -> Self {
        Self {
            text: None,
            image_url: Some(image_url.into()),
        }
    }

    /// Attach an image reference.
    #[must_use]
    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// The text body if it contains anything besides whitespace.
    #[must_use]
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// True when neither a text body nor an image reference is present.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.usable_text().is_none()
            && self
                .image_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
    }
}

/// Content hash of an ordered comment set, used as the generation fingerprint.
///
/// Two comment sets with the same length but different content hash
/// differently.
#[must_use]
pub fn fingerprint(comments: &[Comment]) -> u64 {
    let mut hasher = DefaultHasher::new();
    comments.hash(&mut hasher);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// Sentiment labels
// ---------------------------------------------------------------------------

/// Canonical sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// All labels in display order.
    pub const ALL: [SentimentLabel; 3] = [Self::Positive, Self::Negative, Self::Neutral];

    /// Lower-case name of the label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }

    /// True for `positive` and `negative`.
    #[must_use]
    pub fn is_conclusive(self) -> bool {
        self != Self::Neutral
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-comment resolution: the signal from each modality plus the fused label.
///
/// `None` on a modality means "no usable signal", which is distinct from a
/// resolved `neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSentiment {
    /// Label from the text body, if any.
    pub text_label: Option<SentimentLabel>,
    /// Label from the attached image, if conclusive enough to count.
    pub image_label: Option<SentimentLabel>,
    /// Combined label counted in the distribution.
    pub fused_label: SentimentLabel,
    /// The comment's pipeline failed unexpectedly and was counted as neutral.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

impl ResolvedSentiment {
    /// Resolution recorded for a comment whose pipeline failed.
    #[must_use]
    pub fn failure() -> Self {
        Self {
            text_label: None,
            image_label: None,
            fused_label: SentimentLabel::Neutral,
            failed: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Tally of fused labels across a comment set.
///
/// Invariant: `total == counts.values().sum()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    /// Count per canonical label; every label is always present.
    pub counts: BTreeMap<SentimentLabel, u64>,
    /// Number of comments processed.
    pub total: u64,
}

impl Default for Distribution {
    fn default() -> Self {
        Self::new()
    }
}

impl Distribution {
    /// Empty distribution with a zero count for every label.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: SentimentLabel::ALL.iter().map(|l| (*l, 0)).collect(),
            total: 0,
        }
    }

    /// Count one comment under `label`.
    pub fn record(&mut self, label: SentimentLabel) {
        *self.counts.entry(label).or_insert(0) += 1;
        self.total += 1;
    }

    /// Count for a single label.
    #[must_use]
    pub fn count(&self, label: SentimentLabel) -> u64 {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    /// Share of `label` as a percentage rounded to one decimal, `0.0` when empty.
    #[must_use]
    pub fn percentage(&self, label: SentimentLabel) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let raw = self.count(label) as f64 / self.total as f64 * 100.0;
        (raw * 10.0).round() / 10.0
    }

    /// Percentages for every label.
    #[must_use]
    pub fn percentages(&self) -> Percentages {
        Percentages {
            positive: self.percentage(SentimentLabel::Positive),
            negative: self.percentage(SentimentLabel::Negative),
            neutral: self.percentage(SentimentLabel::Neutral),
        }
    }

    /// Check the counting invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.counts.values().sum::<u64>() == self.total
    }
}

impl FromIterator<SentimentLabel> for Distribution {
    fn from_iter<I: IntoIterator<Item = SentimentLabel>>(iter: I) -> Self {
        let mut distribution = Self::new();
        for label in iter {
            distribution.record(label);
        }
        distribution
    }
}

/// Label shares in percent, one decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentages {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

// ---------------------------------------------------------------------------
// Inference contract
// ---------------------------------------------------------------------------

/// External inference endpoint kinds used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    LanguageId,
    Translation,
    TextSentiment,
    TextGeneration,
    ImageClassification,
    ImageCaptioning,
    ZeroShotImage,
}

impl EndpointKind {
    /// Stable name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LanguageId => "language_id",
            Self::Translation => "translation",
            Self::TextSentiment => "text_sentiment",
            Self::TextGeneration => "text_generation",
            Self::ImageClassification => "image_classification",
            Self::ImageCaptioning => "image_captioning",
            Self::ZeroShotImage => "zero_shot_image",
        }
    }
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outbound inference call: endpoint kind plus its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceRequest {
    DetectLanguage { text: String },
    Translate { text: String, source_language: String },
    ClassifyText { text: String },
    GenerateText { prompt: String },
    ClassifyImage { image_url: String },
    CaptionImage { image_url: String },
    MatchImage { image_url: String, candidates: Vec<String> },
}

impl InferenceRequest {
    /// Endpoint this request is sent to.
    #[must_use]
    pub fn endpoint(&self) -> EndpointKind {
        match self {
            Self::DetectLanguage { .. } => EndpointKind::LanguageId,
            Self::Translate { .. } => EndpointKind::Translation,
            Self::ClassifyText { .. } => EndpointKind::TextSentiment,
            Self::GenerateText { .. } => EndpointKind::TextGeneration,
            Self::ClassifyImage { .. } => EndpointKind::ImageClassification,
            Self::CaptionImage { .. } => EndpointKind::ImageCaptioning,
            Self::MatchImage { .. } => EndpointKind::ZeroShotImage,
        }
    }
}

/// A `(label, score)` candidate returned by a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Zero-shot image matching response, normalised from the provider's layouts.
#[derive(Debug, Clone, PartialEq)]
pub enum ZeroShotResponse {
    /// `[{label, score}, ...]`
    ByLabelScorePairs(Vec<LabelScore>),
    /// `[{labels: [...], scores: [...]}]`
    ByParallelArrays { labels: Vec<String>, scores: Vec<f64> },
    /// Anything else.
    Malformed,
}

impl ZeroShotResponse {
    /// Highest-scoring candidate phrase. Ties keep the first one seen;
    /// candidates scoring zero or less never match.
    #[must_use]
    pub fn best_match(&self) -> Option<&str> {
        match self {
            Self::ByLabelScorePairs(pairs) => pairs
                .iter()
                .filter(|ls| ls.score > 0.0)
                .fold(None::<&LabelScore>, |best, cur| match best {
                    Some(b) if b.score >= cur.score => Some(b),
                    _ => Some(cur),
                })
                .map(|ls| ls.label.as_str()),
            Self::ByParallelArrays { labels, scores } => scores
                .iter()
                .zip(labels.iter())
                .filter(|(score, _)| **score > 0.0)
                .fold(None::<(f64, &String)>, |best, (score, label)| match best {
                    Some((b, _)) if b >= *score => best,
                    _ => Some((*score, label)),
                })
                .map(|(_, label)| label.as_str()),
            Self::Malformed => None,
        }
    }
}

/// Normalised payload of a successful inference call.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutput {
    /// Classifier candidates (language id, text sentiment, image labels).
    Labels(Vec<LabelScore>),
    /// Generated text (translation, caption, prompt completion).
    Text(String),
    /// Zero-shot image matches.
    ZeroShot(ZeroShotResponse),
}

/// Failure of a single inference call. Always degraded by the caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceFailure {
    /// The endpoint answered with a non-success status.
    #[error("service returned HTTP {0}")]
    Status(u16),

    /// Connection or transport error.
    #[error("network error: {0}")]
    Network(String),

    /// The call exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The backend does not serve this endpoint.
    #[error("endpoint not supported by this backend")]
    Unsupported,
}

/// Outcome of one inference call.
pub type InferenceResult = std::result::Result<InferenceOutput, ServiceFailure>;

/// Trait for anything that can answer inference calls.
///
/// Implementations must never panic or propagate transport errors: every
/// failure is reported as a [`ServiceFailure`]. No retries are performed.
#[async_trait::async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Issue one call.
    async fn call(&self, request: &InferenceRequest) -> InferenceResult;

    /// Backend name for logs and health output.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Run state and reports
// ---------------------------------------------------------------------------

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// No run in flight.
    Idle,
    /// Processing batch `batch` (1-based) of `batches`.
    Running {
        generation: Generation,
        batch: usize,
        batches: usize,
    },
}

/// Result of one completed, committed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub generation: Generation,
    pub distribution: Distribution,
    /// Per-comment resolutions in input order.
    pub resolved: Vec<ResolvedSentiment>,
    /// Comments whose pipeline failed unexpectedly (also counted as neutral).
    pub failed: usize,
    /// Cooldown delays observed between batches.
    pub cooldowns: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine configuration. Every section has defaults; only the API token is
/// required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Credentials attached to outbound calls.
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Endpoint URLs.
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    /// Per-call timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Text sentiment resolution.
    #[serde(default)]
    pub text: TextConfig,
    /// Language detection and translation.
    #[serde(default)]
    pub language: LanguageConfig,
    /// Image sentiment resolution.
    #[serde(default)]
    pub image: ImageConfig,
    /// Batch scheduling.
    #[serde(default)]
    pub batch: BatchConfig,
}

impl EngineConfig {
    /// Text-only preset: prompt-based classification, no separate language
    /// stage, images ignored, batches of 3 with a 500 ms cooldown.
    #[must_use]
    pub fn text_only() -> Self {
        Self {
            text: TextConfig {
                strategy: TextStrategy::Prompt,
                ..TextConfig::default()
            },
            language: LanguageConfig {
                enabled: false,
                ..LanguageConfig::default()
            },
            image: ImageConfig {
                enabled: false,
                ..ImageConfig::default()
            },
            batch: BatchConfig {
                size: 3,
                cooldown_ms: 500,
            },
            ..Self::default()
        }
    }

    /// Set the API token.
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.credentials.api_token = token.into();
        self
    }

    /// Validate the configuration. Run once at startup.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.api_token.trim().is_empty() {
            return Err(SentimentError::Config(
                "credentials.api_token is required".to_string(),
            ));
        }
        if self.batch.size == 0 {
            return Err(SentimentError::Config(
                "batch.size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.text.confidence_threshold) {
            return Err(SentimentError::Config(format!(
                "text.confidence_threshold must be within [0, 1], got {}",
                self.text.confidence_threshold
            )));
        }
        for (kind, url) in self.endpoints.iter() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SentimentError::Config(format!(
                    "endpoint {kind} has an invalid URL: '{url}'"
                )));
            }
        }
        Ok(())
    }
}

/// Bearer credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Token for the hosted inference endpoints.
    #[serde(default)]
    pub api_token: String,
    /// Token for the translation service; falls back to `api_token`.
    #[serde(default)]
    pub translation_token: Option<String>,
}

impl CredentialsConfig {
    /// Token to present to `endpoint`.
    #[must_use]
    pub fn token_for(&self, endpoint: EndpointKind) -> &str {
        match (endpoint, self.translation_token.as_deref()) {
            (EndpointKind::Translation, Some(token)) if !token.is_empty() => token,
            _ => &self.api_token,
        }
    }
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &str| if s.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("CredentialsConfig")
            .field("api_token", &redact(&self.api_token))
            .field(
                "translation_token",
                &self.translation_token.as_deref().map(redact),
            )
            .finish()
    }
}

/// One URL per endpoint kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_language_id_url")]
    pub language_id: String,
    #[serde(default = "default_translation_url")]
    pub translation: String,
    #[serde(default = "default_text_sentiment_url")]
    pub text_sentiment: String,
    #[serde(default = "default_text_generation_url")]
    pub text_generation: String,
    #[serde(default = "default_image_classification_url")]
    pub image_classification: String,
    #[serde(default = "default_image_captioning_url")]
    pub image_captioning: String,
    #[serde(default = "default_zero_shot_image_url")]
    pub zero_shot_image: String,
}

const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";

fn default_language_id_url() -> String {
    format!("{HF_INFERENCE_BASE}/facebook/fasttext-language-identification")
}

fn default_translation_url() -> String {
    "http://localhost:8000/api/v1/translation/translate".to_string()
}

fn default_text_sentiment_url() -> String {
    format!("{HF_INFERENCE_BASE}/distilbert-base-uncased-finetuned-sst-2-english")
}

fn default_text_generation_url() -> String {
    format!("{HF_INFERENCE_BASE}/google/flan-t5-large")
}

fn default_image_classification_url() -> String {
    format!("{HF_INFERENCE_BASE}/google/vit-base-patch16-224")
}

fn default_image_captioning_url() -> String {
    format!("{HF_INFERENCE_BASE}/nlpconnect/vit-gpt2-image-captioning")
}

fn default_zero_shot_image_url() -> String {
    format!("{HF_INFERENCE_BASE}/openai/clip-vit-base-patch16")
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            language_id: default_language_id_url(),
            translation: default_translation_url(),
            text_sentiment: default_text_sentiment_url(),
            text_generation: default_text_generation_url(),
            image_classification: default_image_classification_url(),
            image_captioning: default_image_captioning_url(),
            zero_shot_image: default_zero_shot_image_url(),
        }
    }
}

impl EndpointsConfig {
    /// URL configured for `kind`.
    #[must_use]
    pub fn url_for(&self, kind: EndpointKind) -> &str {
        match kind {
            EndpointKind::LanguageId => &self.language_id,
            EndpointKind::Translation => &self.translation,
            EndpointKind::TextSentiment => &self.text_sentiment,
            EndpointKind::TextGeneration => &self.text_generation,
            EndpointKind::ImageClassification => &self.image_classification,
            EndpointKind::ImageCaptioning => &self.image_captioning,
            EndpointKind::ZeroShotImage => &self.zero_shot_image,
        }
    }

    /// Every `(kind, url)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (EndpointKind, &str)> {
        [
            EndpointKind::LanguageId,
            EndpointKind::Translation,
            EndpointKind::TextSentiment,
            EndpointKind::TextGeneration,
            EndpointKind::ImageClassification,
            EndpointKind::ImageCaptioning,
            EndpointKind::ZeroShotImage,
        ]
        .into_iter()
        .map(move |kind| (kind, self.url_for(kind)))
    }

    /// Point every endpoint at `base` using its kind name as the path.
    ///
    /// Handy for a self-hosted gateway or a test double.
    #[must_use]
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let url = |kind: EndpointKind| format!("{base}/{}", kind.as_str());
        Self {
            language_id: url(EndpointKind::LanguageId),
            translation: url(EndpointKind::Translation),
            text_sentiment: url(EndpointKind::TextSentiment),
            text_generation: url(EndpointKind::TextGeneration),
            image_classification: url(EndpointKind::ImageClassification),
            image_captioning: url(EndpointKind::ImageCaptioning),
            zero_shot_image: url(EndpointKind::ZeroShotImage),
        }
    }
}

/// Timeouts applied to every outbound call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// How text bodies are classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStrategy {
    /// Hosted sentiment classifier with a confidence floor.
    #[default]
    Classifier,
    /// Few-shot prompt against a text-generation endpoint.
    Prompt,
}

/// Text sentiment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    #[serde(default)]
    pub strategy: TextStrategy,
    /// Winning classifier scores below this resolve to `neutral`.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Provider label ids mapped to canonical labels (exact match).
    #[serde(default = "default_label_aliases")]
    pub aliases: HashMap<String, SentimentLabel>,
}

fn default_confidence_threshold() -> f64 {
    0.65
}

fn default_label_aliases() -> HashMap<String, SentimentLabel> {
    HashMap::from([
        ("LABEL_1".to_string(), SentimentLabel::Positive),
        ("LABEL_0".to_string(), SentimentLabel::Negative),
    ])
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            strategy: TextStrategy::default(),
            confidence_threshold: default_confidence_threshold(),
            aliases: default_label_aliases(),
        }
    }
}

/// Language detection and translation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Language the text classifier expects.
    #[serde(default = "default_working_language")]
    pub working_language: String,
}

fn default_true() -> bool {
    true
}

fn default_working_language() -> String {
    "en".to_string()
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            working_language: default_working_language(),
        }
    }
}

/// Image sentiment settings: URL validation and the keyword sets used by
/// each fallback strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// An image reference must start with one of these.
    #[serde(default = "default_accepted_schemes")]
    pub accepted_schemes: Vec<String>,
    /// Classifier label fragments signalling negative sentiment.
    #[serde(default = "default_label_negative")]
    pub label_negative: Vec<String>,
    /// Classifier label fragments signalling positive sentiment.
    #[serde(default = "default_label_positive")]
    pub label_positive: Vec<String>,
    /// Caption words signalling negative sentiment.
    #[serde(default = "default_caption_negative")]
    pub caption_negative: Vec<String>,
    /// Caption words signalling positive sentiment.
    #[serde(default = "default_caption_positive")]
    pub caption_positive: Vec<String>,
    /// Phrases offered to the zero-shot matcher.
    #[serde(default = "default_zero_shot_candidates")]
    pub zero_shot_candidates: Vec<String>,
    #[serde(default = "default_zero_shot_negative")]
    pub zero_shot_negative: Vec<String>,
    #[serde(default = "default_zero_shot_positive")]
    pub zero_shot_positive: Vec<String>,
    #[serde(default = "default_zero_shot_neutral")]
    pub zero_shot_neutral: Vec<String>,
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

fn default_accepted_schemes() -> Vec<String> {
    strings(&["http://", "https://"])
}

fn default_label_negative() -> Vec<String> {
    strings(&[
        "sarcastic", "ironic", "mocking", "cynical", "angry", "sad", "disgusted", "eye_roll",
    ])
}

fn default_label_positive() -> Vec<String> {
    strings(&["happy", "smiling", "joyful", "laughing", "pleased"])
}

fn default_caption_negative() -> Vec<String> {
    strings(&["angry", "sad", "upset", "crying", "tears", "sarcastic", "ironic"])
}

fn default_caption_positive() -> Vec<String> {
    strings(&["happy", "smiling", "joyful", "laughing", "cheerful"])
}

fn default_zero_shot_candidates() -> Vec<String> {
    strings(&[
        "a happy image",
        "a sad image",
        "a sarcastic meme",
        "a neutral image",
    ])
}

fn default_zero_shot_negative() -> Vec<String> {
    strings(&["sarcastic", "sad"])
}

fn default_zero_shot_positive() -> Vec<String> {
    strings(&["happy"])
}

fn default_zero_shot_neutral() -> Vec<String> {
    strings(&["neutral"])
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            accepted_schemes: default_accepted_schemes(),
            label_negative: default_label_negative(),
            label_positive: default_label_positive(),
            caption_negative: default_caption_negative(),
            caption_positive: default_caption_positive(),
            zero_shot_candidates: default_zero_shot_candidates(),
            zero_shot_negative: default_zero_shot_negative(),
            zero_shot_positive: default_zero_shot_positive(),
            zero_shot_neutral: default_zero_shot_neutral(),
        }
    }
}

/// Batch scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Comments resolved concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub size: usize,
    /// Pause between batches.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_batch_size() -> usize {
    2
}

fn default_cooldown_ms() -> u64 {
    1_000
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `text` (human-readable) or `json` (structured).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum SentimentError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A newer run started before this one could commit.
    #[error("Run superseded: generation {generation} is no longer the latest")]
    Superseded {
        /// Generation of the discarded run.
        generation: Generation,
    },

    /// Unexpected failure inside a comment's pipeline.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// Convenience alias for `std::result::Result<T, SentimentError>`.
pub type Result<T> = std::result::Result<T, SentimentError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_distribution_reports_zero_percentages() {
        let d = Distribution::new();
        assert_eq!(d.total, 0);
        for label in SentimentLabel::ALL {
            assert_eq!(d.count(label), 0);
            assert_eq!(d.percentage(label), 0.0);
        }
        assert!(d.is_consistent());
    }

    #[test]
    fn test_distribution_percentages_round_to_one_decimal() {
        let d: Distribution = [
            SentimentLabel::Positive,
            SentimentLabel::Negative,
            SentimentLabel::Neutral,
        ]
        .into_iter()
        .collect();

        let p = d.percentages();
        assert_eq!(p.positive, 33.3);
        assert_eq!(p.negative, 33.3);
        assert_eq!(p.neutral, 33.3);
        assert_eq!(d.total, 3);
    }

    #[test]
    fn test_distribution_serializes_every_label() {
        let mut d = Distribution::new();
        d.record(SentimentLabel::Positive);
        d.record(SentimentLabel::Positive);

        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["counts"]["positive"], 2);
        assert_eq!(json["counts"]["negative"], 0);
        assert_eq!(json["counts"]["neutral"], 0);
        assert_eq!(json["total"], 2);
        assert_eq!(d.percentage(SentimentLabel::Positive), 100.0);
    }

    #[test]
    fn test_comment_accepts_source_field_names() {
        let c: Comment =
            serde_json::from_str(r#"{"description": "nice", "imgurl": "https://x/y.png"}"#)
                .unwrap();
        assert_eq!(c.text.as_deref(), Some("nice"));
        assert_eq!(c.image_url.as_deref(), Some("https://x/y.png"));

        let c: Comment = serde_json::from_str(r#"{"text": "ok", "imageUrl": null}"#).unwrap();
        assert_eq!(c.text.as_deref(), Some("ok"));
        assert!(c.image_url.is_none());
    }

    #[test]
    fn test_comment_blankness() {
        assert!(Comment::default().is_blank());
        assert!(Comment::text("   ").is_blank());
        assert!(!Comment::text("hi").is_blank());
        assert!(!Comment::image("not-a-url").is_blank());
        assert_eq!(Comment::text("  \n").usable_text(), None);
    }

    #[test]
    fn test_fingerprint_sees_content_changes_at_constant_length() {
        let a = vec![Comment::text("great"), Comment::text("bad")];
        let b = vec![Comment::text("great"), Comment::text("awful")];
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_zero_shot_best_match_pairs_first_wins_ties() {
        let r = ZeroShotResponse::ByLabelScorePairs(vec![
            LabelScore::new("a happy image", 0.4),
            LabelScore::new("a sad image", 0.4),
            LabelScore::new("a neutral image", 0.2),
        ]);
        assert_eq!(r.best_match(), Some("a happy image"));
    }

    #[test]
    fn test_zero_shot_best_match_parallel_arrays() {
        let r = ZeroShotResponse::ByParallelArrays {
            labels: vec!["a happy image".into(), "a sarcastic meme".into()],
            scores: vec![0.1, 0.9],
        };
        assert_eq!(r.best_match(), Some("a sarcastic meme"));
        assert_eq!(ZeroShotResponse::Malformed.best_match(), None);
        assert_eq!(ZeroShotResponse::ByLabelScorePairs(vec![]).best_match(), None);
    }

    #[test]
    fn test_zero_shot_all_zero_scores_match_nothing() {
        let pairs = ZeroShotResponse::ByLabelScorePairs(vec![
            LabelScore::new("a happy image", 0.0),
            LabelScore::new("a sad image", 0.0),
        ]);
        assert_eq!(pairs.best_match(), None);

        let arrays = ZeroShotResponse::ByParallelArrays {
            labels: vec!["a happy image".into(), "a sad image".into()],
            scores: vec![0.0, 0.3],
        };
        assert_eq!(arrays.best_match(), Some("a sad image"));
    }

    #[test]
    fn test_default_config_requires_token() {
        let config = EngineConfig::default();
        assert!(matches!(config.validate(), Err(SentimentError::Config(_))));
        assert!(config.with_api_token("hf_test").validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_batch_and_bad_threshold() {
        let mut config = EngineConfig::default().with_api_token("t");
        config.batch.size = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default().with_api_token("t");
        config.text.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default().with_api_token("t");
        config.endpoints.translation = "ftp://nowhere".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_text_only_preset() {
        let config = EngineConfig::text_only();
        assert_eq!(config.text.strategy, TextStrategy::Prompt);
        assert!(!config.image.enabled);
        assert!(!config.language.enabled);
        assert_eq!(config.batch.size, 3);
        assert_eq!(config.batch.cooldown_ms, 500);
    }

    #[test]
    fn test_config_yaml_defaults_fill_missing_sections() {
        let yaml = r#"
credentials:
  api_token: "hf_abc"
batch:
  size: 4
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.batch.size, 4);
        assert_eq!(config.batch.cooldown_ms, 1_000);
        assert_eq!(config.text.confidence_threshold, 0.65);
        assert_eq!(
            config.text.aliases.get("LABEL_1"),
            Some(&SentimentLabel::Positive)
        );
        assert_eq!(config.image.zero_shot_candidates.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = CredentialsConfig {
            api_token: "hf_secret".to_string(),
            translation_token: None,
        };
        let out = format!("{creds:?}");
        assert!(!out.contains("hf_secret"));
        assert_eq!(creds.token_for(EndpointKind::Translation), "hf_secret");

        let creds = CredentialsConfig {
            api_token: "hf_secret".to_string(),
            translation_token: Some("local".to_string()),
        };
        assert_eq!(creds.token_for(EndpointKind::Translation), "local");
        assert_eq!(creds.token_for(EndpointKind::TextSentiment), "hf_secret");
    }

    #[test]
    fn test_endpoints_with_base_url() {
        let e = EndpointsConfig::with_base_url("http://127.0.0.1:9000/");
        assert_eq!(
            e.url_for(EndpointKind::ZeroShotImage),
            "http://127.0.0.1:9000/zero_shot_image"
        );
        assert_eq!(e.iter().count(), 7);
    }

    #[test]
    fn test_run_state_serialization() {
        let state = RunState::Running {
            generation: Generation {
                sequence: 2,
                fingerprint: 7,
            },
            batch: 1,
            batches: 3,
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["batch"], 1);
        assert_eq!(serde_json::to_value(RunState::Idle).unwrap()["state"], "idle");
    }

    #[test]
    fn test_resolved_failure_serialization() {
        let json = serde_json::to_value(ResolvedSentiment::failure()).unwrap();
        assert_eq!(json["fused_label"], "neutral");
        assert_eq!(json["failed"], true);

        let ok = ResolvedSentiment {
            text_label: Some(SentimentLabel::Positive),
            image_label: None,
            fused_label: SentimentLabel::Positive,
            failed: false,
        };
        let json = serde_json::to_value(ok).unwrap();
        assert!(json.get("failed").is_none());
        assert!(json["image_label"].is_null());
    }
}
