use std::collections::HashMap;

use chrono::Duration;
use tracing::{debug, info, warn};

use quest_core::Clock;
use quest_core::model::{
    AiTurnKind, AudioBlob, Celebration, QuestState, SuccessPolicy, ThemeId, Transcript, TurnId,
    Username,
};

use super::view::TurnView;
use crate::assessment::{AssessmentResult, QuestIssue, SessionContext};
use crate::capture::RecordingHandle;
use crate::config::VoiceConfig;
use crate::error::VoiceError;
use crate::playback::{Language, PlaybackSpeed};
use crate::validator::UtteranceValidator;

//
// ─── STATES & TICKETS ─────────────────────────────────────────────────────────
//

#[derive(Debug)]
enum Phase {
    Idle,
    /// Waiting on the device (and possibly a permission prompt).
    Opening { stop_requested: bool },
    Recording(RecordingHandle),
    /// Handle taken for stopping; its blob has not been submitted yet.
    Stopping,
    Submitting,
    RequestingQuest,
}

/// What the session is doing right now, as shown to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Opening,
    Recording,
    Stopping,
    Submitting,
    RequestingQuest,
}

impl RecordingState {
    /// A network call is in flight.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, RecordingState::Submitting | RecordingState::RequestingQuest)
    }
}

/// Issued when a capture starts opening; redeemed by
/// [`VoiceSession::capture_opened`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTicket {
    generation: u64,
}

/// A validated utterance ready to upload, with the context snapshot it is
/// uploaded under.
#[derive(Debug)]
pub struct SubmissionTicket {
    generation: u64,
    blob: AudioBlob,
    context: SessionContext,
}

impl SubmissionTicket {
    #[must_use]
    pub fn blob(&self) -> &AudioBlob {
        &self.blob
    }

    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }
}

#[derive(Debug, Clone)]
pub struct QuestTicket {
    generation: u64,
    context: SessionContext,
}

impl QuestTicket {
    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }
}

#[derive(Debug)]
pub enum CaptureOpened {
    Recording,
    /// Stop was pressed while the device was opening. The caller closes the
    /// handle and submits it.
    StopRequested(RecordingHandle),
    /// The session was closed meanwhile; the device has been released.
    Stale,
}

#[derive(Debug)]
pub enum StopOutcome {
    /// Close this handle and submit the blob.
    Close(RecordingHandle),
    /// The device is still opening; the stop is applied once it opens.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Appended {
        user: TurnId,
        ai: TurnId,
        kind: AiTurnKind,
        celebration: Option<Celebration>,
    },
    /// Stop was recorded before the device finished opening.
    Deferred,
    /// The response arrived after the session was closed and was dropped.
    Stale,
}

impl ExchangeOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ExchangeOutcome::Appended {
                kind: AiTurnKind::QuestSuccess,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestOutcome {
    Issued { turn: TurnId, target: String },
    Stale,
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

/// One voice conversation: transcript, quest mode and recorder state.
///
/// Every transition is synchronous. Network and device waits happen between
/// a `begin_*`/`*_request` call and its matching `finish_*`/`*_opened`, so
/// the owner never holds the session across an await. Each ticket remembers
/// the session generation it was issued under; after [`VoiceSession::close`]
/// old tickets are ignored.
#[derive(Debug)]
pub struct VoiceSession {
    theme_id: ThemeId,
    username: Username,
    transcript: Transcript,
    quest: QuestState,
    policy: SuccessPolicy,
    validator: UtteranceValidator,
    phase: Phase,
    turn_views: HashMap<TurnId, TurnView>,
    celebration: Option<Celebration>,
    celebration_duration: Duration,
    celebrations_started: usize,
    generation: u64,
    clock: Clock,
}

impl VoiceSession {
    #[must_use]
    pub fn new(theme_id: ThemeId, username: Username, config: &VoiceConfig, clock: Clock) -> Self {
        Self {
            theme_id,
            username,
            transcript: Transcript::new(),
            quest: QuestState::NoQuest,
            policy: SuccessPolicy::new(config.success_min_score),
            validator: UtteranceValidator::new(config.min_utterance_bytes),
            phase: Phase::Idle,
            turn_views: HashMap::new(),
            celebration: None,
            celebration_duration: config.celebration,
            celebrations_started: 0,
            generation: 0,
            clock,
        }
    }

    #[must_use]
    pub fn theme_id(&self) -> &ThemeId {
        &self.theme_id
    }

    #[must_use]
    pub fn username(&self) -> &Username {
        &self.username
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub fn quest(&self) -> &QuestState {
        &self.quest
    }

    #[must_use]
    pub fn policy(&self) -> SuccessPolicy {
        self.policy
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Snapshot of what the next upload is sent with.
    #[must_use]
    pub fn context(&self) -> SessionContext {
        SessionContext {
            theme_id: self.theme_id.clone(),
            username: self.username.clone(),
            quest_target: self.quest.target().map(str::to_string),
        }
    }

    #[must_use]
    pub fn recording_state(&self) -> RecordingState {
        match self.phase {
            Phase::Idle => RecordingState::Idle,
            Phase::Opening { .. } => RecordingState::Opening,
            Phase::Recording(_) => RecordingState::Recording,
            Phase::Stopping => RecordingState::Stopping,
            Phase::Submitting => RecordingState::Submitting,
            Phase::RequestingQuest => RecordingState::RequestingQuest,
        }
    }

    fn ensure_idle(&self) -> Result<(), VoiceError> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Submitting | Phase::RequestingQuest => Err(VoiceError::Busy),
            Phase::Opening { .. } | Phase::Recording(_) | Phase::Stopping => {
                Err(VoiceError::AlreadyRecording)
            }
        }
    }

    // ─── capture ───

    /// Claim the recorder before opening the device.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Busy` while a request is in flight and
    /// `VoiceError::AlreadyRecording` while a capture is open.
    pub fn start_capture_request(&mut self) -> Result<CaptureTicket, VoiceError> {
        self.ensure_idle()?;
        self.phase = Phase::Opening {
            stop_requested: false,
        };
        Ok(CaptureTicket {
            generation: self.generation,
        })
    }

    /// Hand over the result of opening the device.
    ///
    /// # Errors
    ///
    /// Returns the open error; the recorder goes back to idle.
    pub fn capture_opened(
        &mut self,
        ticket: CaptureTicket,
        opened: Result<RecordingHandle, VoiceError>,
    ) -> Result<CaptureOpened, VoiceError> {
        let stop_requested = match self.phase {
            Phase::Opening { stop_requested } if ticket.generation == self.generation => {
                stop_requested
            }
            _ => {
                debug!("capture opened for a closed session; releasing");
                return Ok(CaptureOpened::Stale);
            }
        };

        match opened {
            Err(err) => {
                self.phase = Phase::Idle;
                warn!(%err, "capture failed to open");
                Err(err)
            }
            Ok(handle) if stop_requested => {
                self.phase = Phase::Stopping;
                Ok(CaptureOpened::StopRequested(handle))
            }
            Ok(handle) => {
                self.phase = Phase::Recording(handle);
                Ok(CaptureOpened::Recording)
            }
        }
    }

    /// Pull buffered fragments from the open device. Returns the bytes
    /// captured so far, or `None` once nothing is recording.
    pub fn poll_recording(&mut self) -> Option<usize> {
        match &mut self.phase {
            Phase::Recording(handle) => {
                handle.poll();
                Some(handle.byte_len())
            }
            _ => None,
        }
    }

    /// Take the open recording so it can be closed.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::NotRecording` when no capture is open or opening.
    pub fn take_recording_for_stop(&mut self) -> Result<StopOutcome, VoiceError> {
        match std::mem::replace(&mut self.phase, Phase::Stopping) {
            Phase::Recording(handle) => Ok(StopOutcome::Close(handle)),
            Phase::Opening { .. } => {
                self.phase = Phase::Opening {
                    stop_requested: true,
                };
                Ok(StopOutcome::Deferred)
            }
            other => {
                self.phase = other;
                Err(VoiceError::NotRecording)
            }
        }
    }

    // ─── submission ───

    /// Validate a finished utterance and claim the request slot for it.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::TooShort` for undersized blobs (the recorder goes
    /// back to idle), `VoiceError::Busy` while another request is in flight,
    /// or `VoiceError::AlreadyRecording` while a capture is open.
    pub fn begin_submission(&mut self, blob: AudioBlob) -> Result<SubmissionTicket, VoiceError> {
        match self.phase {
            Phase::Idle | Phase::Stopping => {}
            Phase::Submitting | Phase::RequestingQuest => return Err(VoiceError::Busy),
            Phase::Opening { .. } | Phase::Recording(_) => {
                return Err(VoiceError::AlreadyRecording);
            }
        }

        if let Err(err) = self.validator.validate(&blob) {
            self.phase = Phase::Idle;
            return Err(err);
        }

        self.phase = Phase::Submitting;
        let context = self.context();
        info!(
            bytes = blob.len(),
            encoding = %blob.encoding(),
            quest = context.quest_target.is_some(),
            "submitting utterance"
        );
        Ok(SubmissionTicket {
            generation: self.generation,
            blob,
            context,
        })
    }

    /// Apply the assessment for `ticket`.
    ///
    /// On success the user turn and its reply are appended together, the
    /// quest is resolved and, on a quest success, one celebration starts.
    ///
    /// # Errors
    ///
    /// Returns the request error unchanged. The transcript is not touched.
    pub fn finish_submission(
        &mut self,
        ticket: SubmissionTicket,
        result: Result<AssessmentResult, VoiceError>,
    ) -> Result<ExchangeOutcome, VoiceError> {
        if ticket.generation != self.generation {
            debug!("dropping assessment for a closed session");
            return Ok(ExchangeOutcome::Stale);
        }
        self.phase = Phase::Idle;

        let result = result.inspect_err(|err| warn!(%err, "assessment failed"))?;
        let assessment = result.assessment;
        let kind = self
            .policy
            .classify(ticket.context.quest_target.as_deref(), &assessment);

        let score = assessment.score;
        let (user, ai) =
            self.transcript
                .append_exchange(result.user_text, assessment, result.clip, kind);
        self.turn_views.insert(ai, TurnView::default());
        self.quest.apply(kind);

        let celebration = (kind == AiTurnKind::QuestSuccess).then(|| {
            let celebration = Celebration::new(self.clock.now(), self.celebration_duration);
            self.celebration = Some(celebration);
            self.celebrations_started += 1;
            celebration
        });

        info!(%score, success = celebration.is_some(), turns = self.transcript.len(), "exchange appended");
        Ok(ExchangeOutcome::Appended {
            user,
            ai,
            kind,
            celebration,
        })
    }

    // ─── quest ───

    /// Claim the request slot for a new quest.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Busy` while a request is in flight and
    /// `VoiceError::AlreadyRecording` while a capture is open.
    pub fn begin_quest_request(&mut self) -> Result<QuestTicket, VoiceError> {
        self.ensure_idle()?;
        self.phase = Phase::RequestingQuest;
        Ok(QuestTicket {
            generation: self.generation,
            context: self.context(),
        })
    }

    /// Append the issued quest and make its sentence the pending target.
    /// A quest issued while another is pending replaces it.
    ///
    /// # Errors
    ///
    /// Returns the request error unchanged. Quest state is not touched.
    pub fn finish_quest(
        &mut self,
        ticket: QuestTicket,
        result: Result<QuestIssue, VoiceError>,
    ) -> Result<QuestOutcome, VoiceError> {
        if ticket.generation != self.generation {
            debug!("dropping quest for a closed session");
            return Ok(QuestOutcome::Stale);
        }
        self.phase = Phase::Idle;

        let issue = result.inspect_err(|err| warn!(%err, "quest request failed"))?;
        let target = issue.target().to_string();
        let turn = self.transcript.append_ai(
            issue.assessment.unscored(),
            issue.clip,
            AiTurnKind::QuestIssuance,
        );
        self.turn_views.insert(turn, TurnView::default());
        if let Some(previous) = self.quest.target() {
            debug!(previous, "replacing pending quest");
        }
        self.quest = QuestState::pending(target.clone());
        info!(%turn, "quest pending");
        Ok(QuestOutcome::Issued { turn, target })
    }

    // ─── celebration ───

    #[must_use]
    pub fn celebration(&self) -> Option<Celebration> {
        self.celebration
    }

    #[must_use]
    pub fn celebration_active(&self) -> bool {
        self.celebration
            .is_some_and(|celebration| celebration.is_active(self.clock.now()))
    }

    /// Drop an elapsed celebration. Returns `true` if one was dropped.
    pub fn expire_celebration(&mut self) -> bool {
        let now = self.clock.now();
        match self.celebration {
            Some(celebration) if !celebration.is_active(now) => {
                self.celebration = None;
                true
            }
            _ => false,
        }
    }

    /// Number of celebrations started over the session's lifetime.
    #[must_use]
    pub fn celebrations_started(&self) -> usize {
        self.celebrations_started
    }

    // ─── turn views ───

    #[must_use]
    pub fn turn_view(&self, turn: TurnId) -> TurnView {
        self.turn_views.get(&turn).copied().unwrap_or_default()
    }

    pub fn toggle_display_language(&mut self, turn: TurnId) -> Language {
        self.turn_views.entry(turn).or_default().toggle_language()
    }

    pub fn set_clip_speed(&mut self, turn: TurnId, speed: PlaybackSpeed) {
        self.turn_views.entry(turn).or_default().clip_speed = speed;
    }

    // ─── teardown ───

    /// Release the microphone and invalidate every outstanding ticket.
    /// The transcript and quest survive.
    pub fn close(&mut self) {
        self.generation += 1;
        if matches!(self.phase, Phase::Recording(_)) {
            info!("closing session with an open capture");
        }
        // Dropping the handle releases the device.
        self.phase = Phase::Idle;
        self.celebration = None;
    }

    /// [`VoiceSession::close`], then start over with an empty transcript.
    pub fn reset(&mut self) {
        self.close();
        self.transcript = Transcript::new();
        self.quest = QuestState::NoQuest;
        self.turn_views.clear();
    }
}
