use crate::playback::{Language, PlaybackSpeed};

/// Per-turn presentation state kept by the session, keyed by turn id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnView {
    /// Which line is shown first: the Korean sentence or its meaning.
    pub display_language: Language,
    pub clip_speed: PlaybackSpeed,
}

impl Default for TurnView {
    fn default() -> Self {
        Self {
            display_language: Language::Korean,
            clip_speed: PlaybackSpeed::Normal,
        }
    }
}

impl TurnView {
    /// Flip between Korean-first and English-first. Returns the new language.
    pub fn toggle_language(&mut self) -> Language {
        self.display_language = match self.display_language {
            Language::Korean => Language::English,
            Language::English => Language::Korean,
        };
        self.display_language
    }
}
