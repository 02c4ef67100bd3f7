use std::sync::Arc;

use tracing::info;

use quest_core::model::{ThemeId, Username};

use crate::assessment::{AssessmentApi, HttpAssessmentClient};
use crate::capture::{CaptureBackend, CaptureNegotiator};
use crate::config::VoiceConfig;
use crate::error::VoiceError;
use crate::sessions::{VoiceLoopService, VoiceSession};
use crate::Clock;

/// Assembles app-facing services for one learner and theme.
#[derive(Clone)]
pub struct AppServices {
    theme_id: ThemeId,
    username: Username,
    voice_loop: Arc<VoiceLoopService>,
}

impl AppServices {
    /// Build services that talk to the assessment server over HTTP.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Network` if the HTTP client cannot be built.
    pub fn new_http(
        config: VoiceConfig,
        backend: Arc<dyn CaptureBackend>,
        clock: Clock,
        theme_id: ThemeId,
        username: Username,
    ) -> Result<Self, VoiceError> {
        let api = Arc::new(HttpAssessmentClient::new(config.clone())?);
        info!(api = %config.api_base_url, backend = backend.name(), "voice services ready");
        Ok(Self::with_api(config, backend, api, clock, theme_id, username))
    }

    /// Build services around any assessment backend.
    #[must_use]
    pub fn with_api(
        config: VoiceConfig,
        backend: Arc<dyn CaptureBackend>,
        api: Arc<dyn AssessmentApi>,
        clock: Clock,
        theme_id: ThemeId,
        username: Username,
    ) -> Self {
        let negotiator =
            CaptureNegotiator::new(backend, config.encoding_priority.clone(), clock.clone());
        let voice_loop = Arc::new(VoiceLoopService::new(config, clock, negotiator, api));
        Self {
            theme_id,
            username,
            voice_loop,
        }
    }

    #[must_use]
    pub fn theme_id(&self) -> &ThemeId {
        &self.theme_id
    }

    #[must_use]
    pub fn username(&self) -> &Username {
        &self.username
    }

    #[must_use]
    pub fn voice_loop(&self) -> Arc<VoiceLoopService> {
        Arc::clone(&self.voice_loop)
    }

    /// A fresh session for the configured learner and theme.
    #[must_use]
    pub fn new_session(&self) -> VoiceSession {
        self.voice_loop
            .new_session(self.theme_id.clone(), self.username.clone())
    }
}
