use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("score must be within 0..=100, got {0}")]
    OutOfRange(i64),
}

//
// ─── SCORE ────────────────────────────────────────────────────────────────────
//

/// Pronunciation score reported by the assessment service, 0 to 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 100;

    /// # Errors
    ///
    /// Returns `ScoreError::OutOfRange` when `value` exceeds 100.
    pub fn new(value: u8) -> Result<Self, ScoreError> {
        if value > Self::MAX {
            return Err(ScoreError::OutOfRange(i64::from(value)));
        }
        Ok(Self(value))
    }

    /// Clamp a wire value into range. The service occasionally reports
    /// fractional or slightly out-of-range scores; fractions are dropped so
    /// a threshold check never passes on rounding alone.
    #[must_use]
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() || value <= 0.0 {
            return Self(0);
        }
        if value >= f64::from(Self::MAX) {
            return Self(Self::MAX);
        }
        // In range, so the cast only drops the fraction.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(value.floor() as u8)
    }

    #[must_use]
    pub fn zero() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── ASSESSMENT ───────────────────────────────────────────────────────────────
//

/// Structured grading of one utterance (or the text of an issued quest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// The sentence in Korean script.
    pub korean: String,
    /// Phonetic transliteration.
    pub romanized: String,
    pub english_meaning: String,
    pub grammar_note: String,
    pub context_note: String,
    pub score: Score,
    /// Whether the recognized speech matched the intended meaning.
    pub content_match: bool,
}

impl Assessment {
    /// Same text, but with the score reset. Used for issued quests, which are
    /// prompts rather than graded attempts.
    #[must_use]
    pub fn unscored(mut self) -> Self {
        self.score = Score::zero();
        self.content_match = false;
        self
    }
}

//
// ─── RENDERED CLIP ────────────────────────────────────────────────────────────
//

/// Server-rendered speech for one AI turn, already decoded from base64.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedClip {
    bytes: Arc<[u8]>,
    mime: String,
}

impl RenderedClip {
    pub const DEFAULT_MIME: &'static str = "audio/mpeg";

    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    #[must_use]
    pub fn mp3(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(bytes, Self::DEFAULT_MIME)
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for RenderedClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedClip")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_rejects_over_one_hundred() {
        assert_eq!(Score::new(100).unwrap().value(), 100);
        assert_eq!(Score::new(101), Err(ScoreError::OutOfRange(101)));
    }

    #[test]
    fn saturating_clamps_wire_values() {
        assert_eq!(Score::saturating(-3.0).value(), 0);
        assert_eq!(Score::saturating(44.6).value(), 44);
        assert_eq!(Score::saturating(29.99).value(), 29);
        assert_eq!(Score::saturating(180.0).value(), 100);
        assert_eq!(Score::saturating(f64::NAN).value(), 0);
    }

    #[test]
    fn clip_debug_hides_payload() {
        let clip = RenderedClip::mp3(vec![1_u8, 2, 3]);
        assert_eq!(format!("{clip:?}"), "RenderedClip { mime: \"audio/mpeg\", len: 3 }");
    }
}
