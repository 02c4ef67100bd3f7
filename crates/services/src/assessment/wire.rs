use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use quest_core::model::{Assessment, RenderedClip, Score};

use super::{AssessmentResult, QuestIssue};
use crate::error::VoiceError;

#[derive(Debug, Serialize)]
pub(super) struct QuestRequest<'a> {
    pub username: &'a str,
    pub theme_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TalkResponse {
    #[serde(default)]
    user_text: Option<String>,
    #[serde(default)]
    structured_data: Option<StructuredData>,
    #[serde(default)]
    audio_base64: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuestResponse {
    #[serde(default)]
    quest_data: Option<StructuredData>,
    #[serde(default)]
    audio_base64: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StructuredData {
    #[serde(default)]
    korean: String,
    #[serde(default)]
    romanized: String,
    #[serde(default)]
    english: String,
    #[serde(default)]
    grammar: String,
    #[serde(default, alias = "expl")]
    context: String,
    #[serde(default)]
    tech_score: f64,
    #[serde(default)]
    content_match: bool,
}

impl From<StructuredData> for Assessment {
    fn from(data: StructuredData) -> Self {
        Assessment {
            korean: data.korean,
            romanized: data.romanized,
            english_meaning: data.english,
            grammar_note: data.grammar,
            context_note: data.context,
            score: Score::saturating(data.tech_score),
            content_match: data.content_match,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorOnly {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Map a non-success status to a server error, preferring the body's own
/// message when it has one.
pub(super) fn status_error(status: StatusCode, body: &[u8]) -> VoiceError {
    let parsed = serde_json::from_slice::<ErrorOnly>(body).ok();
    let message = parsed.and_then(|body| {
        body.error.or_else(|| {
            body.detail.map(|detail| match detail {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            })
        })
    });
    VoiceError::server(message.unwrap_or_else(|| format!("server returned status {status}")))
}

pub(super) fn parse_talk(body: &[u8]) -> Result<AssessmentResult, VoiceError> {
    let response: TalkResponse = serde_json::from_slice(body)
        .map_err(|err| VoiceError::server(format!("malformed assessment response: {err}")))?;
    if let Some(message) = response.error {
        return Err(VoiceError::server(message));
    }
    let clip = decode_clip(response.audio_base64.as_deref())?;
    let data = response
        .structured_data
        .ok_or_else(|| VoiceError::server("assessment response has no structured_data"))?;
    Ok(AssessmentResult {
        user_text: response.user_text.unwrap_or_default(),
        assessment: data.into(),
        clip,
    })
}

pub(super) fn parse_quest(body: &[u8]) -> Result<QuestIssue, VoiceError> {
    let response: QuestResponse = serde_json::from_slice(body)
        .map_err(|err| VoiceError::server(format!("malformed quest response: {err}")))?;
    if let Some(message) = response.error {
        return Err(VoiceError::server(message));
    }
    let clip = decode_clip(response.audio_base64.as_deref())?;
    let data = response
        .quest_data
        .ok_or_else(|| VoiceError::server("quest response has no quest_data"))?;
    if data.korean.trim().is_empty() {
        return Err(VoiceError::server("quest response has no target sentence"));
    }
    let assessment = Assessment::from(data).unscored();
    Ok(QuestIssue { assessment, clip })
}

/// Decode the inline clip. Accepts bare base64 or a `data:` URI.
fn decode_clip(raw: Option<&str>) -> Result<RenderedClip, VoiceError> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| VoiceError::server("response is missing the rendered audio"))?;

    let (mime, payload) = match raw.strip_prefix("data:") {
        Some(uri) => {
            let (header, payload) = uri
                .split_once(',')
                .ok_or_else(|| VoiceError::server("rendered audio is not a valid data URI"))?;
            let mime = header
                .strip_suffix(";base64")
                .filter(|mime| !mime.is_empty())
                .unwrap_or(RenderedClip::DEFAULT_MIME);
            (mime, payload)
        }
        None => (RenderedClip::DEFAULT_MIME, raw),
    };

    let bytes = STANDARD
        .decode(payload)
        .map_err(|err| VoiceError::server(format!("rendered audio is not valid base64: {err}")))?;
    if bytes.is_empty() {
        return Err(VoiceError::server("response is missing the rendered audio"));
    }
    Ok(RenderedClip::new(bytes, mime))
}

#[cfg(test)]
mod tests {
    use quest_core::model::SuccessPolicy;

    use super::*;

    const CLIP_B64: &str = "SUQzBAAAAAAA"; // "ID3\x04\0\0\0\0\0"

    #[test]
    fn talk_response_maps_all_fields() {
        let body = format!(
            r#"{{
                "user_text": "안녕하세요",
                "structured_data": {{
                    "korean": "안녕하세요",
                    "romanized": "annyeonghaseyo",
                    "english": "Hello",
                    "grammar": "-세요 is a polite ending",
                    "expl": "Used when meeting someone",
                    "tech_score": 45,
                    "content_match": true
                }},
                "audio_base64": "{CLIP_B64}"
            }}"#
        );
        let result = parse_talk(body.as_bytes()).unwrap();
        assert_eq!(result.user_text, "안녕하세요");
        assert_eq!(result.assessment.score.value(), 45);
        assert!(result.assessment.content_match);
        assert_eq!(result.assessment.context_note, "Used when meeting someone");
        assert_eq!(result.clip.mime(), "audio/mpeg");
        assert_eq!(&result.clip.bytes()[..3], b"ID3");
    }

    fn talk_with_score(score: &str) -> Vec<u8> {
        format!(
            r#"{{"user_text": "주세요", "structured_data": {{"korean": "주세요",
                "tech_score": {score}, "content_match": true}}, "audio_base64": "{CLIP_B64}"}}"#
        )
        .into_bytes()
    }

    #[test]
    fn fractional_score_below_threshold_is_not_a_success() {
        let policy = SuccessPolicy::default();

        let near = parse_talk(&talk_with_score("29.6")).unwrap();
        assert_eq!(near.assessment.score.value(), 29);
        assert!(!policy.is_success(Some("주세요"), true, near.assessment.score));

        let exact = parse_talk(&talk_with_score("30.0")).unwrap();
        assert_eq!(exact.assessment.score.value(), 30);
        assert!(policy.is_success(Some("주세요"), true, exact.assessment.score));
    }

    #[test]
    fn error_field_wins() {
        let err = parse_talk(br#"{"error": "STT failed"}"#).unwrap_err();
        assert!(matches!(err, VoiceError::Server { ref message } if message == "STT failed"));
    }

    #[test]
    fn missing_clip_is_a_server_error() {
        let body = br#"{"user_text": "hi", "structured_data": {"korean": "hi", "tech_score": 80, "content_match": true}}"#;
        assert!(matches!(parse_talk(body), Err(VoiceError::Server { .. })));

        let body = br#"{"user_text": "hi", "structured_data": {"korean": "hi"}, "audio_base64": ""}"#;
        assert!(matches!(parse_talk(body), Err(VoiceError::Server { .. })));
    }

    #[test]
    fn malformed_json_is_a_server_error() {
        assert!(matches!(parse_talk(b"<html>"), Err(VoiceError::Server { .. })));
    }

    #[test]
    fn data_uri_clip_keeps_its_mime() {
        let clip = decode_clip(Some(&format!("data:audio/wav;base64,{CLIP_B64}"))).unwrap();
        assert_eq!(clip.mime(), "audio/wav");
    }

    #[test]
    fn quest_response_is_unscored() {
        let body = format!(
            r#"{{"quest_data": {{"korean": "안녕하세요", "romanized": "annyeonghaseyo",
                "english": "Hello", "grammar": "g", "context": "c", "tech_score": 90,
                "content_match": true}}, "audio_base64": "{CLIP_B64}"}}"#
        );
        let quest = parse_quest(body.as_bytes()).unwrap();
        assert_eq!(quest.target(), "안녕하세요");
        assert_eq!(quest.assessment.score.value(), 0);
        assert!(!quest.assessment.content_match);
    }

    #[test]
    fn quest_without_sentence_is_rejected() {
        let body = format!(r#"{{"quest_data": {{"korean": " "}}, "audio_base64": "{CLIP_B64}"}}"#);
        assert!(matches!(parse_quest(body.as_bytes()), Err(VoiceError::Server { .. })));
    }

    #[test]
    fn status_error_uses_detail_when_present() {
        let err = status_error(StatusCode::UNPROCESSABLE_ENTITY, br#"{"detail": "file missing"}"#);
        assert_eq!(err.notice(), "file missing");

        let err = status_error(StatusCode::BAD_GATEWAY, b"");
        assert_eq!(err.notice(), "server returned status 502 Bad Gateway");
    }
}
