//! Boundary with the assessment backend.

mod http;
mod wire;

use async_trait::async_trait;

use quest_core::model::{Assessment, AudioBlob, RenderedClip, ThemeId, Username};

use crate::error::VoiceError;

pub use http::{HttpAssessmentClient, TalkRequest};

/// Who is talking, about what, and which quest (if any) they are attempting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub theme_id: ThemeId,
    pub username: Username,
    pub quest_target: Option<String>,
}

/// A graded utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentResult {
    /// What the server heard.
    pub user_text: String,
    pub assessment: Assessment,
    pub clip: RenderedClip,
}

/// A target sentence proposed by the server, with its rendered speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestIssue {
    pub assessment: Assessment,
    pub clip: RenderedClip,
}

impl QuestIssue {
    /// The sentence the learner has to say.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.assessment.korean
    }
}

#[async_trait]
pub trait AssessmentApi: Send + Sync {
    /// Upload one utterance for grading.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Network` for transport failures and
    /// `VoiceError::Server` for error responses or incomplete payloads.
    async fn submit(
        &self,
        blob: &AudioBlob,
        context: &SessionContext,
    ) -> Result<AssessmentResult, VoiceError>;

    /// Ask the server for a new challenge sentence.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`AssessmentApi::submit`].
    async fn issue_quest(&self, context: &SessionContext) -> Result<QuestIssue, VoiceError>;
}
