//! Capture negotiation: pick an encoding, open the microphone, buffer audio.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use quest_core::Clock;
use quest_core::model::{AudioBlob, Encoding, RecordingSession};

use crate::error::{CaptureError, VoiceError};

/// A microphone (or anything that can stand in for one).
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the device can record in `encoding`. Must not touch hardware.
    fn supports(&self, encoding: Encoding) -> bool;

    /// Open the device. May wait on a permission prompt.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::PermissionDenied` when access is refused, or
    /// another `CaptureError` when the device cannot start.
    async fn open(&self, encoding: Encoding) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// A live capture. Owns the hardware until released.
#[async_trait]
pub trait CaptureStream: Send {
    /// Fragments delivered since the last call, in arrival order.
    fn take_fragments(&mut self) -> Vec<Vec<u8>>;

    /// Stop the device and return whatever it still held.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError` if the device failed while flushing.
    async fn finish(&mut self) -> Result<Vec<Vec<u8>>, CaptureError>;

    /// Release the hardware. Must be idempotent.
    fn release(&mut self);
}

/// An open recording: the buffered audio plus the stream feeding it.
///
/// Dropping the handle releases the device, so an abandoned recording never
/// keeps the microphone open.
pub struct RecordingHandle {
    recording: RecordingSession,
    stream: Option<Box<dyn CaptureStream>>,
}

impl RecordingHandle {
    #[must_use]
    pub fn new(recording: RecordingSession, stream: Box<dyn CaptureStream>) -> Self {
        Self {
            recording,
            stream: Some(stream),
        }
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.recording.encoding()
    }

    #[must_use]
    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.recording.started_at()
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.recording.byte_len()
    }

    /// Pull fragments the device has delivered so far.
    pub fn poll(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            for fragment in stream.take_fragments() {
                self.recording.push_fragment(fragment);
            }
        }
    }

    /// Stop the device and hand back the finished utterance.
    ///
    /// The device is released whether or not flushing succeeded; a failed
    /// flush only loses the unflushed tail.
    pub async fn close(mut self) -> AudioBlob {
        self.poll();
        if let Some(mut stream) = self.stream.take() {
            match stream.finish().await {
                Ok(fragments) => {
                    for fragment in fragments {
                        self.recording.push_fragment(fragment);
                    }
                }
                Err(err) => warn!(%err, "capture flush failed; keeping buffered audio"),
            }
            stream.release();
        }
        let encoding = self.recording.encoding();
        let started_at = self.recording.started_at();
        let recording =
            std::mem::replace(&mut self.recording, RecordingSession::new(encoding, started_at));
        let blob = recording.into_blob();
        info!(encoding = %blob.encoding(), bytes = blob.len(), "capture closed");
        blob
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            debug!("recording dropped while open; releasing device");
            stream.release();
        }
    }
}

impl std::fmt::Debug for RecordingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingHandle")
            .field("recording", &self.recording)
            .field("open", &self.stream.is_some())
            .finish()
    }
}

/// Chooses an encoding from a priority list and opens the backend with it.
#[derive(Clone)]
pub struct CaptureNegotiator {
    backend: Arc<dyn CaptureBackend>,
    priority: Vec<Encoding>,
    clock: Clock,
}

impl CaptureNegotiator {
    #[must_use]
    pub fn new(backend: Arc<dyn CaptureBackend>, priority: Vec<Encoding>, clock: Clock) -> Self {
        Self {
            backend,
            priority,
            clock,
        }
    }

    /// First encoding in priority order the backend supports.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::NoSupportedFormat` when nothing matches.
    pub fn negotiate(&self) -> Result<Encoding, VoiceError> {
        self.priority
            .iter()
            .copied()
            .find(|encoding| self.backend.supports(*encoding))
            .ok_or(VoiceError::NoSupportedFormat)
    }

    /// Negotiate, then open the device.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::NoSupportedFormat` without touching hardware when
    /// negotiation fails, `VoiceError::PermissionDenied` when access is
    /// refused, or `VoiceError::Capture` for other device failures.
    pub async fn open_capture(&self) -> Result<RecordingHandle, VoiceError> {
        let encoding = self.negotiate()?;
        debug!(backend = self.backend.name(), %encoding, "opening capture");
        let stream = self.backend.open(encoding).await?;
        let recording = RecordingSession::new(encoding, self.clock.now());
        info!(backend = self.backend.name(), %encoding, "capture opened");
        Ok(RecordingHandle::new(recording, stream))
    }

    /// Stop, concatenate and release. See [`RecordingHandle::close`].
    pub async fn close_capture(&self, handle: RecordingHandle) -> AudioBlob {
        handle.close().await
    }
}
