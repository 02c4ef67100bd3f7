//! Shared error types for the services crate.

use thiserror::Error;

/// Failures reported by a capture backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("microphone access was denied")]
    PermissionDenied,
    #[error("no input device available")]
    NoDevice,
    #[error("encoding {0} is not supported by this device")]
    Unsupported(quest_core::model::Encoding),
    #[error("capture device failed: {0}")]
    Device(String),
}

/// Errors surfaced by the voice session and its collaborators.
///
/// None of these is fatal: each maps to a transient notice and leaves the
/// transcript untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VoiceError {
    #[error("microphone access was denied")]
    PermissionDenied,
    #[error("no supported recording format")]
    NoSupportedFormat,
    #[error("recording too short ({size} bytes, need at least {min})")]
    TooShort { size: usize, min: usize },
    #[error("server error: {message}")]
    Server { message: String },
    #[error(transparent)]
    Network(#[from] reqwest::Error),
    #[error(transparent)]
    Capture(CaptureError),
    #[error("an assessment is already in progress")]
    Busy,
    #[error("a recording is already open")]
    AlreadyRecording,
    #[error("no recording is open")]
    NotRecording,
}

impl From<CaptureError> for VoiceError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied => VoiceError::PermissionDenied,
            other => VoiceError::Capture(other),
        }
    }
}

impl VoiceError {
    /// A failure reported by the assessment service itself.
    pub fn server(message: impl Into<String>) -> Self {
        VoiceError::Server {
            message: message.into(),
        }
    }

    /// Short message suitable for a toast or banner.
    #[must_use]
    pub fn notice(&self) -> String {
        match self {
            VoiceError::PermissionDenied => "Mic Error: microphone access was denied".into(),
            VoiceError::NoSupportedFormat => "Audio recording is not supported here".into(),
            VoiceError::TooShort { .. } => "Too short. Hold the button while you speak.".into(),
            VoiceError::Server { message } => message.clone(),
            VoiceError::Network(_) => "Network error. Please try again.".into(),
            VoiceError::Capture(err) => format!("Mic Error: {err}"),
            VoiceError::Busy => "Still analyzing the last recording".into(),
            VoiceError::AlreadyRecording => "Already listening".into(),
            VoiceError::NotRecording => "Not recording".into(),
        }
    }

    /// `false` when retrying cannot help on this device.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            VoiceError::NoSupportedFormat
                | VoiceError::Capture(CaptureError::NoDevice | CaptureError::Unsupported(_))
        )
    }
}
