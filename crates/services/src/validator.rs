use quest_core::model::AudioBlob;
use tracing::debug;

use crate::error::VoiceError;

/// Cheap local check that a recording holds more than a click or silence.
///
/// Byte size is only a proxy for "some speech was captured"; the real check
/// happens server-side. It exists to avoid spending a round trip on an
/// accidental tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtteranceValidator {
    min_bytes: usize,
}

impl Default for UtteranceValidator {
    fn default() -> Self {
        Self { min_bytes: 500 }
    }
}

impl UtteranceValidator {
    #[must_use]
    pub fn new(min_bytes: usize) -> Self {
        Self { min_bytes }
    }

    #[must_use]
    pub fn min_bytes(&self) -> usize {
        self.min_bytes
    }

    /// # Errors
    ///
    /// Returns `VoiceError::TooShort` for empty blobs and blobs under the
    /// minimum size.
    pub fn validate(&self, blob: &AudioBlob) -> Result<(), VoiceError> {
        let size = blob.len();
        if size == 0 || size < self.min_bytes {
            debug!(size, min = self.min_bytes, "utterance rejected as too short");
            return Err(VoiceError::TooShort {
                size,
                min: self.min_bytes,
            });
        }
        Ok(())
    }
}
