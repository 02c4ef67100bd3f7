use chrono::{DateTime, Utc};

use crate::model::Encoding;

/// Audio buffered for one utterance while the microphone is open.
///
/// Fragments arrive with no size contract: on a timer, or all at once when
/// the device stops. Order of arrival is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    encoding: Encoding,
    chunks: Vec<Vec<u8>>,
    started_at: DateTime<Utc>,
}

impl RecordingSession {
    #[must_use]
    pub fn new(encoding: Encoding, started_at: DateTime<Utc>) -> Self {
        Self {
            encoding,
            chunks: Vec::new(),
            started_at,
        }
    }

    /// Buffer a fragment. Empty fragments are dropped.
    pub fn push_fragment(&mut self, fragment: Vec<u8>) {
        if !fragment.is_empty() {
            self.chunks.push(fragment);
        }
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Concatenate the buffered fragments into a single payload.
    #[must_use]
    pub fn into_blob(self) -> AudioBlob {
        let mut bytes = Vec::with_capacity(self.byte_len());
        for chunk in self.chunks {
            bytes.extend_from_slice(&chunk);
        }
        AudioBlob {
            encoding: self.encoding,
            bytes,
        }
    }
}

/// One finished utterance, ready for validation and upload.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioBlob {
    encoding: Encoding,
    bytes: Vec<u8>,
}

impl AudioBlob {
    #[must_use]
    pub fn new(encoding: Encoding, bytes: Vec<u8>) -> Self {
        Self { encoding, bytes }
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl std::fmt::Debug for AudioBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioBlob")
            .field("encoding", &self.encoding)
            .field("len", &self.bytes.len())
            .finish()
    }
}
