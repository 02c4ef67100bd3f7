use std::env;
use std::time::Duration;

use quest_core::model::{Celebration, DEFAULT_ENCODING_PRIORITY, Encoding, Score};

/// Tunable policy for a voice session.
///
/// The size and score thresholds have drifted over time, so they are read
/// from the environment instead of being baked in.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceConfig {
    pub api_base_url: String,
    pub min_utterance_bytes: usize,
    pub success_min_score: Score,
    pub celebration: chrono::Duration,
    pub request_timeout: Duration,
    pub encoding_priority: Vec<Encoding>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            min_utterance_bytes: 500,
            success_min_score: Score::saturating(30.0),
            celebration: chrono::Duration::milliseconds(Celebration::DEFAULT_MILLIS),
            request_timeout: Duration::from_secs(60),
            encoding_priority: DEFAULT_ENCODING_PRIORITY.to_vec(),
        }
    }
}

impl VoiceConfig {
    /// Read overrides from `QUESTK_*` variables. Unset or unparsable values
    /// keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = env::var("QUESTK_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
        {
            config.api_base_url = url.trim().to_string();
        }
        if let Some(bytes) = parse_var::<usize>("QUESTK_MIN_UTTERANCE_BYTES") {
            config.min_utterance_bytes = bytes;
        }
        if let Some(score) = parse_var::<f64>("QUESTK_SUCCESS_MIN_SCORE") {
            // Scores are stored whole, so a fractional threshold rounds up.
            config.success_min_score = Score::saturating(score.ceil());
        }
        if let Some(ms) = parse_var::<i64>("QUESTK_CELEBRATION_MS") {
            config.celebration = chrono::Duration::milliseconds(ms.max(0));
        }
        if let Some(secs) = parse_var::<u64>("QUESTK_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs.max(1));
        }
        config
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_min_utterance_bytes(mut self, bytes: usize) -> Self {
        self.min_utterance_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_success_min_score(mut self, score: Score) -> Self {
        self.success_min_score = score;
        self
    }

    #[must_use]
    pub fn with_celebration(mut self, duration: chrono::Duration) -> Self {
        self.celebration = duration;
        self
    }

    #[must_use]
    pub fn with_encoding_priority(mut self, priority: Vec<Encoding>) -> Self {
        self.encoding_priority = priority;
        self
    }

    /// `api_base_url` joined with `path`, without doubled slashes.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|raw| raw.trim().parse().ok())
}
