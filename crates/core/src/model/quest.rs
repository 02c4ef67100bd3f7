use chrono::{DateTime, Duration, Utc};

use crate::model::{AiTurnKind, Assessment, Score};

//
// ─── SUCCESS POLICY ───────────────────────────────────────────────────────────
//

/// Rule deciding whether a graded reply completes the pending quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessPolicy {
    min_score: Score,
}

impl Default for SuccessPolicy {
    fn default() -> Self {
        Self {
            min_score: Score::saturating(30.0),
        }
    }
}

impl SuccessPolicy {
    #[must_use]
    pub fn new(min_score: Score) -> Self {
        Self { min_score }
    }

    #[must_use]
    pub fn min_score(&self) -> Score {
        self.min_score
    }

    /// Pure predicate: a quest must be pending, the content must match and
    /// the score must reach the minimum.
    #[must_use]
    pub fn is_success(&self, quest_target: Option<&str>, content_match: bool, score: Score) -> bool {
        quest_target.is_some() && content_match && score >= self.min_score
    }

    /// Kind of the AI turn produced for `assessment` while `quest_target`
    /// was pending.
    #[must_use]
    pub fn classify(&self, quest_target: Option<&str>, assessment: &Assessment) -> AiTurnKind {
        if self.is_success(quest_target, assessment.content_match, assessment.score) {
            AiTurnKind::QuestSuccess
        } else {
            AiTurnKind::Reply
        }
    }
}

//
// ─── QUEST STATE ──────────────────────────────────────────────────────────────
//

/// Challenge mode: either idle, or waiting for the learner to say `target`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QuestState {
    #[default]
    NoQuest,
    Pending {
        target: String,
    },
}

impl QuestState {
    #[must_use]
    pub fn pending(target: impl Into<String>) -> Self {
        Self::Pending {
            target: target.into(),
        }
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            QuestState::NoQuest => None,
            QuestState::Pending { target } => Some(target.as_str()),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, QuestState::Pending { .. })
    }

    /// Apply the outcome of one graded reply. Only a success leaves the
    /// pending state; anything else keeps the same target active.
    pub fn apply(&mut self, kind: AiTurnKind) {
        if kind == AiTurnKind::QuestSuccess {
            *self = QuestState::NoQuest;
        }
    }
}

//
// ─── CELEBRATION ──────────────────────────────────────────────────────────────
//

/// Transient success effect. Expires on its own after `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Celebration {
    started_at: DateTime<Utc>,
    duration: Duration,
}

impl Celebration {
    pub const DEFAULT_MILLIS: i64 = 4_000;

    #[must_use]
    pub fn new(started_at: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            started_at,
            duration,
        }
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.started_at + self.duration
    }

    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now >= self.started_at && now < self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn graded(score: u8, content_match: bool) -> Assessment {
        Assessment {
            korean: "안녕하세요".into(),
            romanized: "annyeonghaseyo".into(),
            english_meaning: "Hello".into(),
            grammar_note: String::new(),
            context_note: String::new(),
            score: Score::new(score).unwrap(),
            content_match,
        }
    }

    #[test]
    fn predicate_matches_truth_table() {
        let policy = SuccessPolicy::default();
        for target in [None, Some("안녕하세요")] {
            for content_match in [false, true] {
                for score in [0_u8, 29, 30, 31, 100] {
                    let expected = target.is_some() && content_match && score >= 30;
                    assert_eq!(
                        policy.is_success(target, content_match, Score::new(score).unwrap()),
                        expected,
                        "target={target:?} match={content_match} score={score}"
                    );
                }
            }
        }
    }

    #[test]
    fn failed_attempt_keeps_target() {
        let policy = SuccessPolicy::default();
        let mut quest = QuestState::pending("안녕하세요");
        let kind = policy.classify(quest.target(), &graded(20, true));
        quest.apply(kind);
        assert_eq!(kind, AiTurnKind::Reply);
        assert_eq!(quest.target(), Some("안녕하세요"));
    }

    #[test]
    fn success_clears_quest() {
        let policy = SuccessPolicy::default();
        let mut quest = QuestState::pending("안녕하세요");
        let kind = policy.classify(quest.target(), &graded(35, true));
        quest.apply(kind);
        assert_eq!(kind, AiTurnKind::QuestSuccess);
        assert_eq!(quest, QuestState::NoQuest);
    }

    #[test]
    fn no_quest_never_succeeds() {
        let policy = SuccessPolicy::default();
        let kind = policy.classify(None, &graded(100, true));
        assert_eq!(kind, AiTurnKind::Reply);
    }

    #[test]
    fn custom_threshold_is_respected() {
        let policy = SuccessPolicy::new(Score::new(50).unwrap());
        assert!(!policy.is_success(Some("x"), true, Score::new(49).unwrap()));
        assert!(policy.is_success(Some("x"), true, Score::new(50).unwrap()));
    }

    #[test]
    fn celebration_expires_after_duration() {
        let now = fixed_now();
        let celebration = Celebration::new(now, Duration::milliseconds(Celebration::DEFAULT_MILLIS));
        assert!(celebration.is_active(now));
        assert!(celebration.is_active(now + Duration::milliseconds(3_999)));
        assert!(!celebration.is_active(now + Duration::seconds(4)));
        assert_eq!(celebration.expires_at(), now + Duration::seconds(4));
    }
}
