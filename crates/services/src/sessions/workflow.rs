use std::sync::Arc;

use tracing::debug;

use quest_core::Clock;
use quest_core::model::{AudioBlob, ThemeId, Username};

use super::service::{CaptureOpened, ExchangeOutcome, QuestOutcome, StopOutcome, VoiceSession};
use crate::assessment::AssessmentApi;
use crate::capture::CaptureNegotiator;
use crate::config::VoiceConfig;
use crate::error::VoiceError;

/// Drives a [`VoiceSession`] through device and network waits.
///
/// Each method is the straight-line composition of the session's sync steps.
/// A UI that must not hold the session across an await calls those steps
/// itself, using [`VoiceLoopService::negotiator`] and
/// [`VoiceLoopService::api`] in between.
#[derive(Clone)]
pub struct VoiceLoopService {
    config: VoiceConfig,
    clock: Clock,
    negotiator: CaptureNegotiator,
    api: Arc<dyn AssessmentApi>,
}

impl VoiceLoopService {
    #[must_use]
    pub fn new(
        config: VoiceConfig,
        clock: Clock,
        negotiator: CaptureNegotiator,
        api: Arc<dyn AssessmentApi>,
    ) -> Self {
        Self {
            config,
            clock,
            negotiator,
            api,
        }
    }

    #[must_use]
    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[must_use]
    pub fn negotiator(&self) -> &CaptureNegotiator {
        &self.negotiator
    }

    #[must_use]
    pub fn api(&self) -> Arc<dyn AssessmentApi> {
        Arc::clone(&self.api)
    }

    /// A fresh session for `theme_id`, configured from this service.
    #[must_use]
    pub fn new_session(&self, theme_id: ThemeId, username: Username) -> VoiceSession {
        VoiceSession::new(theme_id, username, &self.config, self.clock.clone())
    }

    /// Negotiate an encoding and open the microphone.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Busy`/`AlreadyRecording` when the session cannot
    /// record now, or the device error (`PermissionDenied`,
    /// `NoSupportedFormat`, `Capture`).
    pub async fn start_capture(&self, session: &mut VoiceSession) -> Result<(), VoiceError> {
        let ticket = session.start_capture_request()?;
        let opened = self.negotiator.open_capture().await;
        match session.capture_opened(ticket, opened)? {
            CaptureOpened::Recording | CaptureOpened::Stale => Ok(()),
            CaptureOpened::StopRequested(handle) => {
                // Nothing else can reach the session while we hold it, but
                // honour a stop if one was recorded.
                let blob = self.negotiator.close_capture(handle).await;
                self.submit_blob(session, blob).await.map(|_| ())
            }
        }
    }

    /// Close the microphone and submit what it captured.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::NotRecording` with no open capture,
    /// `VoiceError::TooShort` for undersized recordings, or the request error.
    pub async fn stop_and_submit(
        &self,
        session: &mut VoiceSession,
    ) -> Result<ExchangeOutcome, VoiceError> {
        match session.take_recording_for_stop()? {
            StopOutcome::Close(handle) => {
                let blob = self.negotiator.close_capture(handle).await;
                self.submit_blob(session, blob).await
            }
            StopOutcome::Deferred => Ok(ExchangeOutcome::Deferred),
        }
    }

    /// Validate and upload a finished utterance.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::TooShort` without a network call for undersized
    /// blobs, `VoiceError::Busy` while another request is in flight, or the
    /// request error. The transcript only changes on success.
    pub async fn submit_blob(
        &self,
        session: &mut VoiceSession,
        blob: AudioBlob,
    ) -> Result<ExchangeOutcome, VoiceError> {
        let ticket = session.begin_submission(blob)?;
        let result = self.api.submit(ticket.blob(), ticket.context()).await;
        debug!(ok = result.is_ok(), "assessment returned");
        session.finish_submission(ticket, result)
    }

    /// Ask the server for a challenge sentence and make it the pending quest.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Busy` while another request is in flight, or the
    /// request error.
    pub async fn request_quest(
        &self,
        session: &mut VoiceSession,
    ) -> Result<QuestOutcome, VoiceError> {
        let ticket = session.begin_quest_request()?;
        let result = self.api.issue_quest(ticket.context()).await;
        session.finish_quest(ticket, result)
    }
}
