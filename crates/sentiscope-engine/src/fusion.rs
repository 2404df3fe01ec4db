//! Fusion of text and image signals into one label.

use sentiscope_core::SentimentLabel;

/// Combine the text and image signals of one comment.
///
/// Rules, first match wins:
///
/// 1. positive text with a negative image is sarcasm → `negative`
/// 2. both present and equal → that label
/// 3. both present otherwise → the text label, even when it is `neutral`
/// 4. only one present → that label
/// 5. neither → `neutral`
///
/// Only the positive-text / negative-image pairing is treated as sarcasm;
/// negative text with a positive image falls under rule 3. An image label
/// only decides the comment when no text signal exists at all.
#[must_use]
pub fn fuse(text: Option<SentimentLabel>, image: Option<SentimentLabel>) -> SentimentLabel {
    use SentimentLabel::{Negative, Neutral, Positive};

    match (text, image) {
        (Some(Positive), Some(Negative)) => Negative,
        (Some(t), Some(i)) if t == i => t,
        (Some(t), Some(_)) => t,
        (None, Some(i)) => i,
        (Some(t), None) => t,
        (None, None) => Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SentimentLabel::{Negative, Neutral, Positive};

    #[test]
    fn test_sarcasm_override() {
        assert_eq!(fuse(Some(Positive), Some(Negative)), Negative);
    }

    #[test]
    fn test_inverse_pairing_is_not_sarcasm() {
        assert_eq!(fuse(Some(Negative), Some(Positive)), Negative);
    }

    #[test]
    fn test_agreement() {
        for label in SentimentLabel::ALL {
            assert_eq!(fuse(Some(label), Some(label)), label);
        }
    }

    #[test]
    fn test_resolved_neutral_text_outranks_conclusive_image() {
        assert_eq!(fuse(Some(Neutral), Some(Positive)), Neutral);
        assert_eq!(fuse(Some(Neutral), Some(Negative)), Neutral);
    }

    #[test]
    fn test_missing_text_defers_to_image() {
        assert_eq!(fuse(None, Some(Negative)), Negative);
        assert_eq!(fuse(None, Some(Neutral)), Neutral);
    }

    #[test]
    fn test_text_wins_over_neutral_image() {
        assert_eq!(fuse(Some(Positive), Some(Neutral)), Positive);
        assert_eq!(fuse(Some(Negative), Some(Neutral)), Negative);
    }

    #[test]
    fn test_single_modality_and_none() {
        assert_eq!(fuse(None, Some(Positive)), Positive);
        assert_eq!(fuse(Some(Negative), None), Negative);
        assert_eq!(fuse(None, None), Neutral);
    }
}
