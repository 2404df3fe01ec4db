//! Normalisation of provider response bodies.
//!
//! Hosted inference endpoints answer in several loosely specified layouts
//! (flat or nested label lists, single objects or one-element arrays, two
//! zero-shot layouts). Everything is parsed here into an
//! [`InferenceOutput`] so that resolvers never branch on response shape.

use sentiscope_core::{
    EndpointKind, InferenceOutput, InferenceResult, LabelScore, ServiceFailure, ZeroShotResponse,
};
use serde::Deserialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// `[[{label, score}]]` (one list per input) or `[{label, score}]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelListShape {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

#[derive(Deserialize)]
struct Generated {
    generated_text: String,
}

#[derive(Deserialize)]
struct Translated {
    translation_text: String,
}

/// A payload that arrives either bare or wrapped in a one-element array.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrList<T> {
    List(Vec<T>),
    One(T),
}

impl<T> OneOrList<T> {
    fn into_first(self) -> Option<T> {
        match self {
            Self::List(items) => items.into_iter().next(),
            Self::One(item) => Some(item),
        }
    }
}

#[derive(Deserialize)]
struct ParallelArrays {
    labels: Vec<String>,
    scores: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a successful response body for `kind`.
///
/// Bodies that are not JSON, or that do not carry the fields the endpoint
/// promises, become [`ServiceFailure::Malformed`]. Zero-shot bodies with an
/// unknown layout are the one exception: they are reported as
/// [`ZeroShotResponse::Malformed`] so the caller sees the tagged variant.
pub fn parse_output(kind: EndpointKind, body: &[u8]) -> InferenceResult {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ServiceFailure::Malformed(format!("{kind}: invalid JSON: {e}")))?;

    match kind {
        EndpointKind::LanguageId
        | EndpointKind::TextSentiment
        | EndpointKind::ImageClassification => parse_labels(kind, value),
        EndpointKind::Translation => parse_first::<Translated>(kind, value)
            .map(|t| InferenceOutput::Text(t.translation_text)),
        EndpointKind::TextGeneration | EndpointKind::ImageCaptioning => {
            parse_first::<Generated>(kind, value).map(|g| InferenceOutput::Text(g.generated_text))
        }
        EndpointKind::ZeroShotImage => Ok(InferenceOutput::ZeroShot(parse_zero_shot(value))),
    }
}

fn parse_labels(kind: EndpointKind, value: Value) -> InferenceResult {
    let shape: LabelListShape = serde_json::from_value(value)
        .map_err(|e| ServiceFailure::Malformed(format!("{kind}: expected label list: {e}")))?;
    let labels = match shape {
        LabelListShape::Nested(lists) => lists.into_iter().next().unwrap_or_default(),
        LabelListShape::Flat(list) => list,
    };
    Ok(InferenceOutput::Labels(labels))
}

fn parse_first<T: for<'de> Deserialize<'de>>(
    kind: EndpointKind,
    value: Value,
) -> Result<T, ServiceFailure> {
    serde_json::from_value::<OneOrList<T>>(value)
        .map_err(|e| ServiceFailure::Malformed(format!("{kind}: unexpected shape: {e}")))?
        .into_first()
        .ok_or_else(|| ServiceFailure::Malformed(format!("{kind}: empty response")))
}

/// Classify a zero-shot body into its tagged layout.
pub fn parse_zero_shot(value: Value) -> ZeroShotResponse {
    if let Ok(pairs) = serde_json::from_value::<Vec<LabelScore>>(value.clone()) {
        return ZeroShotResponse::ByLabelScorePairs(pairs);
    }
    match serde_json::from_value::<OneOrList<ParallelArrays>>(value) {
        Ok(shape) => match shape.into_first() {
            Some(ParallelArrays { labels, scores }) if labels.len() == scores.len() => {
                ZeroShotResponse::ByParallelArrays { labels, scores }
            }
            _ => ZeroShotResponse::Malformed,
        },
        Err(_) => ZeroShotResponse::Malformed,
    }
}
