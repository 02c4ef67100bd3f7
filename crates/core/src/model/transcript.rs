use crate::model::{AiTurn, AiTurnKind, Assessment, RenderedClip, Turn, TurnId, UserTurn};

/// Append-only log of the conversation.
///
/// Insertion order is the only ordering. Turns are never edited or removed;
/// the only way in is through the `append_*` methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
    next_id: u64,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> TurnId {
        let id = TurnId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a user utterance together with its graded reply.
    ///
    /// Both turns are pushed in one call so a caller cannot leave a user turn
    /// without its reply.
    pub fn append_exchange(
        &mut self,
        user_text: impl Into<String>,
        assessment: Assessment,
        clip: RenderedClip,
        kind: AiTurnKind,
    ) -> (TurnId, TurnId) {
        let user_id = self.allocate_id();
        let ai_id = self.allocate_id();
        self.turns.reserve(2);
        self.turns.push(Turn::User(UserTurn {
            id: user_id,
            text: user_text.into(),
        }));
        self.turns.push(Turn::Ai(AiTurn {
            id: ai_id,
            assessment,
            clip,
            kind,
        }));
        (user_id, ai_id)
    }

    /// Append an AI turn with no user utterance before it (quest issuance).
    pub fn append_ai(
        &mut self,
        assessment: Assessment,
        clip: RenderedClip,
        kind: AiTurnKind,
    ) -> TurnId {
        let id = self.allocate_id();
        self.turns.push(Turn::Ai(AiTurn {
            id,
            assessment,
            clip,
            kind,
        }));
        id
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        // Ids are dense and ordered, but look up by value to stay correct
        // if that ever changes.
        self.turns.iter().find(|turn| turn.id() == id)
    }

    #[must_use]
    pub fn last_ai(&self) -> Option<&AiTurn> {
        self.turns.iter().rev().find_map(Turn::as_ai)
    }

    pub fn ai_turns(&self) -> impl Iterator<Item = &AiTurn> {
        self.turns.iter().filter_map(Turn::as_ai)
    }
}
