use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use quest_core::model::{AiTurn, RenderedClip, Turn, TurnId};
use services::{Language, PlaybackSpeed, RecordingState, TurnView, VoiceSession};

pub const QUEST_MEANING_PREFIX: &str = "🔥 Quest: ";
pub const QUEST_TIP: &str = "Click 'Give me a Quest' below to verify your pronunciation!";

/// `data:` URI for an `<audio>` source.
#[must_use]
pub fn clip_data_uri(clip: &RenderedClip) -> String {
    format!("data:{};base64,{}", clip.mime(), STANDARD.encode(clip.bytes()))
}

#[must_use]
pub fn clip_dom_id(turn: TurnId) -> String {
    format!("turn-clip-{}", turn.value())
}

/// Everything the chat screen can ask for.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatIntent {
    PressMic,
    ReleaseMic,
    RequestQuest,
    /// Replay a turn's rendered clip at `speed`.
    PlayClip { turn: TurnId, speed: PlaybackSpeed },
    /// The learner started a turn's clip from its player controls.
    ClipStarted(TurnId),
    /// Read a turn's Korean sentence on-device.
    SpeakSentence(TurnId),
    /// Read a grammar or context note in English.
    SpeakNote(String),
    ToggleLanguage(TurnId),
    DismissNotice,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AiBadge {
    Challenge,
    Success,
}

impl AiBadge {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AiBadge::Challenge => "CHALLENGE",
            AiBadge::Success => "🎉 SUCCESS!",
        }
    }

    #[must_use]
    pub fn class(self) -> &'static str {
        match self {
            AiBadge::Challenge => "badge-quest-label",
            AiBadge::Success => "badge-success",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AiCardVm {
    pub id: TurnId,
    pub score: u8,
    pub badge: Option<AiBadge>,
    pub korean: String,
    pub romanized: String,
    pub meaning: String,
    pub grammar: String,
    pub context: String,
    pub show_tip: bool,
    pub is_quest: bool,
    pub display_language: Language,
    pub clip_speed: PlaybackSpeed,
    pub clip_dom_id: String,
    pub clip_src: String,
}

impl AiCardVm {
    #[must_use]
    pub fn from_turn(turn: &AiTurn, view: TurnView) -> Self {
        let assessment = &turn.assessment;
        let badge = if turn.is_quest_issuance() {
            Some(AiBadge::Challenge)
        } else if turn.is_success() {
            Some(AiBadge::Success)
        } else {
            None
        };
        let meaning = if turn.is_quest_issuance() {
            format!("{QUEST_MEANING_PREFIX}{}", assessment.english_meaning)
        } else {
            assessment.english_meaning.clone()
        };
        Self {
            id: turn.id,
            score: turn.score().value(),
            badge,
            korean: assessment.korean.clone(),
            romanized: assessment.romanized.clone(),
            meaning,
            grammar: assessment.grammar_note.clone(),
            context: assessment.context_note.clone(),
            show_tip: !turn.is_quest_issuance(),
            is_quest: turn.is_quest_issuance(),
            display_language: view.display_language,
            clip_speed: view.clip_speed,
            clip_dom_id: clip_dom_id(turn.id),
            clip_src: clip_data_uri(&turn.clip),
        }
    }

    #[must_use]
    pub fn korean_first(&self) -> bool {
        self.display_language == Language::Korean
    }

    /// Label for the button that flips the display language.
    #[must_use]
    pub fn toggle_label(&self) -> &'static str {
        if self.korean_first() { "EN" } else { "한" }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TurnCardVm {
    User { id: TurnId, text: String },
    Ai(AiCardVm),
}

impl TurnCardVm {
    #[must_use]
    pub fn id(&self) -> TurnId {
        match self {
            TurnCardVm::User { id, .. } => *id,
            TurnCardVm::Ai(card) => card.id,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatVm {
    pub cards: Vec<TurnCardVm>,
    pub analyzing: bool,
    pub listening: bool,
    pub quest_target: Option<String>,
    pub celebrating: bool,
}

impl ChatVm {
    #[must_use]
    pub fn mic_label(&self) -> &'static str {
        if self.listening { "Listening..." } else { "🎙️ Hold" }
    }

    #[must_use]
    pub fn mic_class(&self) -> &'static str {
        if self.listening { "rec-on" } else { "rec-off" }
    }
}

#[must_use]
pub fn map_chat(session: &VoiceSession) -> ChatVm {
    let cards = session
        .transcript()
        .turns()
        .iter()
        .map(|turn| match turn {
            Turn::User(user) => TurnCardVm::User {
                id: user.id,
                text: user.text.clone(),
            },
            Turn::Ai(ai) => TurnCardVm::Ai(AiCardVm::from_turn(ai, session.turn_view(ai.id))),
        })
        .collect();
    let state = session.recording_state();
    ChatVm {
        cards,
        analyzing: state.is_busy(),
        listening: matches!(state, RecordingState::Opening | RecordingState::Recording),
        quest_target: session.quest().target().map(str::to_string),
        celebrating: session.celebration_active(),
    }
}
