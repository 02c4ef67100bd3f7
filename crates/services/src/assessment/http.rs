use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

use quest_core::model::AudioBlob;

use super::wire::{self, QuestRequest};
use super::{AssessmentApi, AssessmentResult, QuestIssue, SessionContext};
use crate::config::VoiceConfig;
use crate::error::VoiceError;

/// Multipart payload for one `/talk` upload, built before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalkRequest {
    pub file_name: String,
    pub content_type: &'static str,
    pub audio: Vec<u8>,
    pub fields: Vec<(&'static str, String)>,
}

impl TalkRequest {
    /// `quest_target` is only sent while a quest is pending.
    #[must_use]
    pub fn new(blob: &AudioBlob, context: &SessionContext) -> Self {
        let encoding = blob.encoding();
        let mut fields = vec![
            ("theme_id", context.theme_id.as_str().to_string()),
            ("username", context.username.as_str().to_string()),
        ];
        if let Some(target) = &context.quest_target {
            fields.push(("quest_target", target.clone()));
        }
        Self {
            file_name: encoding.upload_file_name(),
            content_type: encoding.content_type(),
            audio: blob.bytes().to_vec(),
            fields,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// # Errors
    ///
    /// Returns `VoiceError::Network` if the content type is rejected.
    pub fn into_form(self) -> Result<Form, VoiceError> {
        let file = Part::bytes(self.audio)
            .file_name(self.file_name)
            .mime_str(self.content_type)?;
        let mut form = Form::new().part("file", file);
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        Ok(form)
    }
}

/// `AssessmentApi` over HTTP: multipart `/talk` and JSON `/quest`.
#[derive(Clone)]
pub struct HttpAssessmentClient {
    client: Client,
    config: VoiceConfig,
}

impl HttpAssessmentClient {
    /// # Errors
    ///
    /// Returns `VoiceError::Network` if the HTTP client cannot be built.
    pub fn new(config: VoiceConfig) -> Result<Self, VoiceError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }
}

#[async_trait]
impl AssessmentApi for HttpAssessmentClient {
    async fn submit(
        &self,
        blob: &AudioBlob,
        context: &SessionContext,
    ) -> Result<AssessmentResult, VoiceError> {
        let request = TalkRequest::new(blob, context);
        debug!(
            file = %request.file_name,
            bytes = request.audio.len(),
            quest = context.quest_target.is_some(),
            "uploading utterance"
        );

        let response = self
            .client
            .post(self.config.endpoint("talk"))
            .multipart(request.into_form()?)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            warn!(%status, "assessment request rejected");
            return Err(wire::status_error(status, &body));
        }

        let result = wire::parse_talk(&body)?;
        info!(
            score = %result.assessment.score,
            content_match = result.assessment.content_match,
            "utterance assessed"
        );
        Ok(result)
    }

    async fn issue_quest(&self, context: &SessionContext) -> Result<QuestIssue, VoiceError> {
        let payload = QuestRequest {
            username: context.username.as_str(),
            theme_id: context.theme_id.as_str(),
        };

        let response = self
            .client
            .post(self.config.endpoint("quest"))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            warn!(%status, "quest request rejected");
            return Err(wire::status_error(status, &body));
        }

        let quest = wire::parse_quest(&body)?;
        info!(target_len = quest.target().chars().count(), "quest issued");
        Ok(quest)
    }
}
