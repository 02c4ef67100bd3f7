#![forbid(unsafe_code)]

pub mod app_services;
pub mod assessment;
pub mod capture;
pub mod config;
pub mod error;
pub mod playback;
pub mod sessions;
pub mod validator;

pub use quest_core::Clock;

pub use app_services::AppServices;
pub use assessment::{
    AssessmentApi, AssessmentResult, HttpAssessmentClient, QuestIssue, SessionContext,
};
pub use capture::{CaptureBackend, CaptureNegotiator, CaptureStream, RecordingHandle};
pub use config::VoiceConfig;
pub use error::{CaptureError, VoiceError};
pub use playback::{
    ClipPlayer, Language, PlaybackController, PlaybackSpeed, SpeechRequest, SpeechSynthesizer,
    VoiceInfo,
};
pub use sessions::{
    CaptureOpened, CaptureTicket, ExchangeOutcome, QuestOutcome, QuestTicket, RecordingState,
    StopOutcome, SubmissionTicket, TurnView, VoiceLoopService, VoiceSession,
};
pub use validator::UtteranceValidator;
