use crate::model::{Assessment, RenderedClip, Score, TurnId};

/// How an AI turn came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTurnKind {
    /// A graded reply to a user utterance.
    Reply,
    /// A target sentence proposed by the server. Never graded.
    QuestIssuance,
    /// A graded reply that satisfied the pending quest.
    QuestSuccess,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTurn {
    pub id: TurnId,
    /// Speech as recognized by the server.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiTurn {
    pub id: TurnId,
    pub assessment: Assessment,
    pub clip: RenderedClip,
    pub kind: AiTurnKind,
}

impl AiTurn {
    #[must_use]
    pub fn score(&self) -> Score {
        self.assessment.score
    }

    #[must_use]
    pub fn content_match(&self) -> bool {
        self.assessment.content_match
    }

    #[must_use]
    pub fn is_quest_issuance(&self) -> bool {
        self.kind == AiTurnKind::QuestIssuance
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.kind == AiTurnKind::QuestSuccess
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    User(UserTurn),
    Ai(AiTurn),
}

impl Turn {
    #[must_use]
    pub fn id(&self) -> TurnId {
        match self {
            Turn::User(turn) => turn.id,
            Turn::Ai(turn) => turn.id,
        }
    }

    #[must_use]
    pub fn as_ai(&self) -> Option<&AiTurn> {
        match self {
            Turn::Ai(turn) => Some(turn),
            Turn::User(_) => None,
        }
    }

    #[must_use]
    pub fn as_user(&self) -> Option<&UserTurn> {
        match self {
            Turn::User(turn) => Some(turn),
            Turn::Ai(_) => None,
        }
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        matches!(self, Turn::User(_))
    }
}
