use services::VoiceError;

/// A transient notice shown above the controls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewError {
    Voice { message: String, recoverable: bool },
}

impl ViewError {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ViewError::Voice { message, .. } => message,
        }
    }

    /// `false` once the feature cannot work on this device.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            ViewError::Voice { recoverable, .. } => *recoverable,
        }
    }
}

impl From<&VoiceError> for ViewError {
    fn from(err: &VoiceError) -> Self {
        ViewError::Voice {
            message: err.notice(),
            recoverable: err.is_recoverable(),
        }
    }
}
