mod service;
mod view;
mod workflow;

// Public API of the voice session subsystem.
pub use service::{
    CaptureOpened, CaptureTicket, ExchangeOutcome, QuestOutcome, QuestTicket, RecordingState,
    StopOutcome, SubmissionTicket, VoiceSession,
};
pub use view::TurnView;
pub use workflow::VoiceLoopService;
