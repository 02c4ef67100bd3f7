use std::sync::Arc;

use quest_core::model::{ThemeId, Username};
use services::{PlaybackController, VoiceLoopService, VoiceSession};

use crate::platform::{WebviewClipPlayer, WebviewSynthesizer};

pub trait UiApp: Send + Sync {
    fn theme_id(&self) -> ThemeId;
    fn username(&self) -> Username;

    fn voice_loop(&self) -> Arc<VoiceLoopService>;
}

#[derive(Clone)]
pub struct AppContext {
    theme_id: ThemeId,
    username: Username,
    voice_loop: Arc<VoiceLoopService>,
    playback: PlaybackController,
    webview_voices: Option<Arc<WebviewSynthesizer>>,
}

impl AppContext {
    /// Context whose speech goes through the webview.
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        let synth = Arc::new(WebviewSynthesizer::default());
        let playback = PlaybackController::new(
            Arc::clone(&synth) as Arc<dyn services::SpeechSynthesizer>,
            Arc::new(WebviewClipPlayer),
        );
        let mut context = Self::with_playback(app, playback);
        context.webview_voices = Some(synth);
        context
    }

    /// Context with caller-supplied speech backends.
    #[must_use]
    pub fn with_playback(app: &Arc<dyn UiApp>, playback: PlaybackController) -> Self {
        Self {
            theme_id: app.theme_id(),
            username: app.username(),
            voice_loop: app.voice_loop(),
            playback,
            webview_voices: None,
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
    pub fn voice_loop(&self) -> Arc<VoiceLoopService> {
        Arc::clone(&self.voice_loop)
    }

    #[must_use]
    pub fn playback(&self) -> PlaybackController {
        self.playback.clone()
    }

    #[must_use]
    pub fn new_session(&self) -> VoiceSession {
        self.voice_loop
            .new_session(self.theme_id.clone(), self.username.clone())
    }

    /// Ask the webview which voices it has. No-op for injected backends.
    pub async fn refresh_voices(&self) {
        if let Some(synth) = &self.webview_voices {
            synth.refresh_voices().await;
        }
    }
}

// This context is provided by the application composition root (e.g. `crates/app`).

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
