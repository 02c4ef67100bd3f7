use std::sync::Mutex;

use dioxus::document::eval;
use serde::Deserialize;
use tracing::debug;

use quest_core::model::{RenderedClip, TurnId};
use services::{ClipPlayer, PlaybackSpeed, SpeechRequest, SpeechSynthesizer, VoiceInfo};

use super::scripts::{
    CANCEL_SPEECH, LIST_VOICES, STOP_ALL_CLIPS, play_clip_script, speak_script,
    stop_other_clips_script,
};
use crate::vm::{clip_data_uri, clip_dom_id};

#[derive(Debug, Deserialize)]
struct WebviewVoice {
    name: String,
    lang: String,
}

/// `speechSynthesis` in the hosting webview.
///
/// The voice list loads asynchronously in most engines, so it is cached here
/// and refreshed with [`WebviewSynthesizer::refresh_voices`].
#[derive(Debug, Default)]
pub struct WebviewSynthesizer {
    voices: Mutex<Vec<VoiceInfo>>,
}

impl WebviewSynthesizer {
    pub async fn refresh_voices(&self) {
        match eval(LIST_VOICES).join::<Vec<WebviewVoice>>().await {
            Ok(found) => {
                debug!(count = found.len(), "webview voices loaded");
                let found = found
                    .into_iter()
                    .map(|voice| VoiceInfo {
                        name: voice.name,
                        lang: voice.lang,
                    })
                    .collect();
                match self.voices.lock() {
                    Ok(mut guard) => *guard = found,
                    Err(poisoned) => *poisoned.into_inner() = found,
                }
            }
            Err(err) => debug!(?err, "voice list unavailable"),
        }
    }
}

impl SpeechSynthesizer for WebviewSynthesizer {
    fn voices(&self) -> Vec<VoiceInfo> {
        match self.voices.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn cancel(&self) {
        let _ = eval(CANCEL_SPEECH);
    }

    fn speak(&self, request: &SpeechRequest) {
        let _ = eval(&speak_script(request));
    }
}

/// Plays rendered clips through the `<audio>` element of each turn.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebviewClipPlayer;

impl ClipPlayer for WebviewClipPlayer {
    fn play(&self, turn: TurnId, clip: &RenderedClip, speed: PlaybackSpeed) {
        let js = play_clip_script(&clip_dom_id(turn), &clip_data_uri(clip), speed.rate());
        let _ = eval(&js);
    }

    fn stop_others(&self, turn: TurnId) {
        let _ = eval(&stop_other_clips_script(&clip_dom_id(turn)));
    }

    fn stop_all(&self) {
        let _ = eval(STOP_ALL_CLIPS);
    }
}
