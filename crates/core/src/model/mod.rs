mod assessment;
mod encoding;
mod ids;
mod quest;
mod recording;
mod transcript;
mod turn;

pub use assessment::{Assessment, RenderedClip, Score, ScoreError};
pub use encoding::{DEFAULT_ENCODING_PRIORITY, Encoding};
pub use ids::{IdentError, ParseIdError, ThemeId, TurnId, Username};
pub use quest::{Celebration, QuestState, SuccessPolicy};
pub use recording::{AudioBlob, RecordingSession};
pub use transcript::Transcript;
pub use turn::{AiTurn, AiTurnKind, Turn, UserTurn};
