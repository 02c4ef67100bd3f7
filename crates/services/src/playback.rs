//! Speech output: on-device synthesis and server-rendered clips.
//!
//! Only one thing speaks at a time. Starting either channel silences the
//! other.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use quest_core::model::{RenderedClip, TurnId};

//
// ─── LANGUAGE & SPEED ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Korean,
    English,
}

impl Language {
    /// BCP-47 tag handed to the synthesizer.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Language::Korean => "ko-KR",
            Language::English => "en-US",
        }
    }

    #[must_use]
    pub fn primary_subtag(self) -> &'static str {
        match self {
            Language::Korean => "ko",
            Language::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Playback rates offered for rendered clips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlaybackSpeed {
    Half,
    #[default]
    Normal,
    OneAndHalf,
    Double,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 4] = [
        PlaybackSpeed::Half,
        PlaybackSpeed::Normal,
        PlaybackSpeed::OneAndHalf,
        PlaybackSpeed::Double,
    ];

    #[must_use]
    pub fn rate(self) -> f32 {
        match self {
            PlaybackSpeed::Half => 0.5,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::OneAndHalf => 1.5,
            PlaybackSpeed::Double => 2.0,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PlaybackSpeed::Half => "0.5x",
            PlaybackSpeed::Normal => "1x",
            PlaybackSpeed::OneAndHalf => "1.5x",
            PlaybackSpeed::Double => "2x",
        }
    }
}

//
// ─── BACKENDS ─────────────────────────────────────────────────────────────────
//

/// A voice the synthesizer can use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    /// Language tag as reported by the platform, e.g. `en-US` or `en_GB`.
    pub lang: String,
}

/// One utterance handed to the synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub lang: Language,
    pub rate: f32,
    /// Preferred voice name. `None` leaves the choice to the platform.
    pub voice: Option<String>,
}

/// On-device text-to-speech.
pub trait SpeechSynthesizer: Send + Sync {
    /// Voices known right now. May be empty until the platform has loaded
    /// them.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Stop any utterance in progress.
    fn cancel(&self);

    fn speak(&self, request: &SpeechRequest);
}

/// Player for server-rendered clips, one slot per AI turn.
pub trait ClipPlayer: Send + Sync {
    fn play(&self, turn: TurnId, clip: &RenderedClip, speed: PlaybackSpeed);

    /// Stop every clip except the one belonging to `turn`.
    fn stop_others(&self, turn: TurnId);

    fn stop_all(&self);
}

//
// ─── CONTROLLER ───────────────────────────────────────────────────────────────
//

/// Routes speech requests to the right backend, cancelling whatever was
/// already speaking.
#[derive(Clone)]
pub struct PlaybackController {
    synth: Arc<dyn SpeechSynthesizer>,
    clips: Arc<dyn ClipPlayer>,
}

impl PlaybackController {
    #[must_use]
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, clips: Arc<dyn ClipPlayer>) -> Self {
        Self { synth, clips }
    }

    /// Speak `text` on-device, replacing anything currently audible.
    ///
    /// Returns the request that was issued.
    pub fn cancel_and_speak(
        &self,
        text: &str,
        lang: Language,
        speed: PlaybackSpeed,
    ) -> SpeechRequest {
        self.clips.stop_all();
        self.synth.cancel();

        let voice = select_voice(&self.synth.voices(), lang).map(|voice| voice.name.clone());
        let request = SpeechRequest {
            text: text.to_string(),
            lang,
            rate: speed.rate(),
            voice,
        };
        debug!(lang = %lang, voice = ?request.voice, "speaking");
        self.synth.speak(&request);
        request
    }

    /// Play a turn's rendered clip at `speed`, replacing anything currently
    /// audible.
    pub fn play_clip(&self, turn: TurnId, clip: &RenderedClip, speed: PlaybackSpeed) {
        self.synth.cancel();
        self.clips.stop_all();
        debug!(%turn, rate = speed.rate(), "playing clip");
        self.clips.play(turn, clip, speed);
    }

    /// A clip was started from its own player controls. Synthesis and the
    /// other clips go quiet so only that clip is audible.
    pub fn clip_started(&self, turn: TurnId) {
        self.synth.cancel();
        self.clips.stop_others(turn);
        debug!(%turn, "clip started from its controls");
    }

    pub fn stop_all(&self) {
        self.synth.cancel();
        self.clips.stop_all();
    }
}

/// First voice whose primary language subtag matches `lang`.
#[must_use]
pub fn select_voice(voices: &[VoiceInfo], lang: Language) -> Option<&VoiceInfo> {
    let wanted = lang.tag().to_ascii_lowercase();
    let exact = voices
        .iter()
        .find(|voice| voice.lang.replace('_', "-").to_ascii_lowercase() == wanted);
    exact.or_else(|| {
        voices.iter().find(|voice| {
            voice
                .lang
                .split(['-', '_'])
                .next()
                .is_some_and(|primary| primary.eq_ignore_ascii_case(lang.primary_subtag()))
        })
    })
}
