#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::rc::Rc;
use std::time::Duration;

use dioxus::document::eval;
use dioxus::prelude::*;
use dioxus_router::use_navigator;
use rand::Rng;
use tracing::{debug, trace};

use quest_core::model::{AudioBlob, Celebration, Turn};
use services::{
    CaptureOpened, ExchangeOutcome, Language, PlaybackSpeed, QuestOutcome, StopOutcome,
    VoiceError, VoiceLoopService, VoiceSession,
};

use crate::context::AppContext;
use crate::platform::scroll_to_end_script;
use crate::routes::Route;
use crate::vm::{AiCardVm, ChatIntent, QUEST_TIP, TurnCardVm, map_chat};

use super::ViewError;

const CHAT_END_ID: &str = "chat-end";
const FRAGMENT_POLL: Duration = Duration::from_millis(250);
const CONFETTI_PIECES: usize = 50;
const CONFETTI_COLORS: [&str; 5] = ["#a864fd", "#29cdff", "#78ff44", "#ff718d", "#fdff6a"];

#[component]
pub fn ChatView() -> Element {
    let ctx = use_context::<AppContext>();
    let navigator = use_navigator();
    let voice_loop = ctx.voice_loop();
    let playback = ctx.playback();
    let theme_label = ctx.theme_id().to_string();

    let session = use_signal({
        let ctx = ctx.clone();
        move || ctx.new_session()
    });
    let notice = use_signal(|| None::<ViewError>);

    use_future({
        let ctx = ctx.clone();
        move || {
            let ctx = ctx.clone();
            async move { ctx.refresh_voices().await }
        }
    });

    use_drop({
        let playback = playback.clone();
        move || {
            let mut session = session;
            playback.stop_all();
            if let Ok(mut session) = session.try_write() {
                session.close();
            }
        }
    });

    let dispatch = use_callback(move |intent: ChatIntent| {
        let mut session = session;
        let mut notice = notice;
        match intent {
            ChatIntent::PressMic => {
                let started = session.write().start_capture_request();
                let ticket = match started {
                    Ok(ticket) => ticket,
                    Err(err) => {
                        report(notice, &err);
                        return;
                    }
                };
                notice.set(None);
                playback.stop_all();
                let voice_loop = voice_loop.clone();
                spawn(async move {
                    let opened = voice_loop.negotiator().open_capture().await;
                    let opened = session.write().capture_opened(ticket, opened);
                    match opened {
                        Ok(CaptureOpened::Recording) => poll_fragments(session).await,
                        Ok(CaptureOpened::Stale) => {}
                        Ok(CaptureOpened::StopRequested(handle)) => {
                            let blob = voice_loop.negotiator().close_capture(handle).await;
                            submit(session, notice, &voice_loop, blob).await;
                        }
                        Err(err) => report(notice, &err),
                    }
                });
            }
            ChatIntent::ReleaseMic => {
                let stop = session.write().take_recording_for_stop();
                match stop {
                    Ok(StopOutcome::Close(handle)) => {
                        let voice_loop = voice_loop.clone();
                        spawn(async move {
                            let blob = voice_loop.negotiator().close_capture(handle).await;
                            submit(session, notice, &voice_loop, blob).await;
                        });
                    }
                    Ok(StopOutcome::Deferred) => debug!("stop deferred until the microphone opens"),
                    Err(VoiceError::NotRecording) => {}
                    Err(err) => report(notice, &err),
                }
            }
            ChatIntent::RequestQuest => {
                let begun = session.write().begin_quest_request();
                let ticket = match begun {
                    Ok(ticket) => ticket,
                    Err(err) => {
                        report(notice, &err);
                        return;
                    }
                };
                notice.set(None);
                let api = voice_loop.api();
                spawn(async move {
                    let result = api.issue_quest(ticket.context()).await;
                    let finished = session.write().finish_quest(ticket, result);
                    match finished {
                        Ok(QuestOutcome::Issued { turn, .. }) => debug!(%turn, "quest shown"),
                        Ok(QuestOutcome::Stale) => {}
                        Err(err) => report(notice, &err),
                    }
                });
            }
            ChatIntent::PlayClip { turn, speed } => {
                session.write().set_clip_speed(turn, speed);
                let clip = session
                    .read()
                    .transcript()
                    .get(turn)
                    .and_then(Turn::as_ai)
                    .map(|ai| ai.clip.clone());
                if let Some(clip) = clip {
                    playback.play_clip(turn, &clip, speed);
                }
            }
            ChatIntent::ClipStarted(turn) => playback.clip_started(turn),
            ChatIntent::SpeakSentence(turn) => {
                let (text, speed) = {
                    let session = session.read();
                    let text = session
                        .transcript()
                        .get(turn)
                        .and_then(Turn::as_ai)
                        .map(|ai| ai.assessment.korean.clone());
                    (text, session.turn_view(turn).clip_speed)
                };
                if let Some(text) = text {
                    playback.cancel_and_speak(&text, Language::Korean, speed);
                }
            }
            ChatIntent::SpeakNote(text) => {
                playback.cancel_and_speak(&text, Language::English, PlaybackSpeed::Normal);
            }
            ChatIntent::ToggleLanguage(turn) => {
                session.write().toggle_display_language(turn);
            }
            ChatIntent::DismissNotice => notice.set(None),
        }
    });

    #[cfg(test)]
    {
        let mut registered = use_signal(|| false);
        if !registered() {
            registered.set(true);
            if let Some(handles) = try_consume_context::<ChatTestHandles>() {
                handles.register(dispatch, session);
            }
        }
    }

    use_effect(move || {
        // Subscribe to transcript growth and the analyzing line.
        let guard = session.read();
        let _ = (guard.transcript().len(), guard.recording_state());
        drop(guard);
        let _ = eval(&scroll_to_end_script(CHAT_END_ID));
    });

    let vm = map_chat(&session.read());
    let notice_value = notice.read().clone();
    let mic_blocked = vm.analyzing
        || notice_value
            .as_ref()
            .is_some_and(|notice| !notice.is_recoverable());

    rsx! {
        div { class: "screen chat-screen",
            if vm.celebrating {
                Confetti {}
            }
            header { class: "q-header",
                button {
                    class: "btn-back",
                    r#type: "button",
                    onclick: move |_| {
                        let _ = navigator.push(Route::Home {});
                    },
                    "←"
                }
                h2 { "{theme_label}" }
                if let Some(target) = vm.quest_target.as_ref() {
                    span { class: "quest-target", "Target: {target}" }
                }
            }
            div { class: "chat-body",
                for card in vm.cards.iter().cloned() {
                    TurnCard { key: "{card.id()}", card, on_intent: dispatch }
                }
                if vm.analyzing {
                    div { class: "loading-bar", "Analyzing..." }
                }
                div { id: CHAT_END_ID }
            }
            if let Some(err) = notice_value {
                div { class: "notice", role: "alert",
                    p { "{err.message()}" }
                    if err.is_recoverable() {
                        button {
                            class: "btn-dismiss",
                            r#type: "button",
                            onclick: move |_| dispatch.call(ChatIntent::DismissNotice),
                            "Dismiss"
                        }
                    }
                }
            }
            div { class: "bottom-area",
                button {
                    class: "btn-quest-mode",
                    r#type: "button",
                    disabled: vm.analyzing || vm.listening,
                    onclick: move |_| dispatch.call(ChatIntent::RequestQuest),
                    "🛡️ Give me a Quest"
                }
                div { class: "mic-wrapper",
                    button {
                        class: "mic-btn {vm.mic_class()}",
                        r#type: "button",
                        disabled: mic_blocked,
                        onmousedown: move |_| dispatch.call(ChatIntent::PressMic),
                        onmouseup: move |_| dispatch.call(ChatIntent::ReleaseMic),
                        onmouseleave: move |_| dispatch.call(ChatIntent::ReleaseMic),
                        ontouchstart: move |_| dispatch.call(ChatIntent::PressMic),
                        ontouchend: move |_| dispatch.call(ChatIntent::ReleaseMic),
                        "{vm.mic_label()}"
                    }
                }
            }
        }
    }
}

fn report(mut notice: Signal<Option<ViewError>>, err: &VoiceError) {
    notice.set(Some(ViewError::from(err)));
}

async fn submit(
    mut session: Signal<VoiceSession>,
    notice: Signal<Option<ViewError>>,
    voice_loop: &VoiceLoopService,
    blob: AudioBlob,
) {
    let begun = session.write().begin_submission(blob);
    let ticket = match begun {
        Ok(ticket) => ticket,
        Err(err) => {
            report(notice, &err);
            return;
        }
    };
    let api = voice_loop.api();
    let result = api.submit(ticket.blob(), ticket.context()).await;
    let finished = session.write().finish_submission(ticket, result);
    match finished {
        Ok(ExchangeOutcome::Appended {
            celebration: Some(celebration),
            ..
        }) => schedule_celebration_end(session, celebration),
        Ok(_) => {}
        Err(err) => report(notice, &err),
    }
}

/// Buffer timer-delivered fragments until the recording is taken for stop.
async fn poll_fragments(mut session: Signal<VoiceSession>) {
    loop {
        tokio::time::sleep(FRAGMENT_POLL).await;
        let polled = match session.try_write() {
            Ok(mut session) => session.poll_recording(),
            Err(_) => None,
        };
        match polled {
            Some(bytes) => trace!(bytes, "recording"),
            None => break,
        }
    }
}

fn schedule_celebration_end(mut session: Signal<VoiceSession>, celebration: Celebration) {
    let wait = celebration.duration().to_std().unwrap_or_default();
    spawn(async move {
        tokio::time::sleep(wait).await;
        if let Ok(mut session) = session.try_write() {
            session.expire_celebration();
        }
    });
}

#[component]
fn TurnCard(card: TurnCardVm, on_intent: EventHandler<ChatIntent>) -> Element {
    match card {
        TurnCardVm::User { text, .. } => rsx! {
            div { class: "msg user",
                div { class: "user-bubble", "{text}" }
            }
        },
        TurnCardVm::Ai(card) => rsx! {
            AiCard { card, on_intent }
        },
    }
}

fn rate_class(speed: PlaybackSpeed, selected: PlaybackSpeed) -> &'static str {
    if speed == selected { "rate rate--active" } else { "rate" }
}

#[component]
fn AiCard(card: AiCardVm, on_intent: EventHandler<ChatIntent>) -> Element {
    let id = card.id;
    let card_class = if card.is_quest {
        "ai-card quest-highlight"
    } else {
        "ai-card"
    };

    rsx! {
        div { class: "msg ai",
            div { class: card_class,
                div { class: "ai-header",
                    div { class: "tech-badge",
                        span { "📡 Score" }
                        strong { "{card.score}" }
                    }
                    if let Some(badge) = card.badge {
                        span { class: badge.class(), "{badge.label()}" }
                    }
                    button {
                        class: "btn-lang",
                        r#type: "button",
                        onclick: move |_| on_intent.call(ChatIntent::ToggleLanguage(id)),
                        "{card.toggle_label()}"
                    }
                }
                div { class: "card-content",
                    div { class: "main-sent",
                        if card.korean_first() {
                            div { class: "kor", "{card.korean}" }
                            div { class: "rom", "{card.romanized}" }
                        } else {
                            div { class: "eng", "{card.meaning}" }
                            div { class: "kor kor--secondary", "{card.korean}" }
                        }
                    }
                    div { class: "tts-controls",
                        for speed in PlaybackSpeed::ALL {
                            button {
                                key: "{speed.label()}",
                                class: rate_class(speed, card.clip_speed),
                                r#type: "button",
                                onclick: move |_| on_intent.call(ChatIntent::PlayClip { turn: id, speed }),
                                "{speed.label()}"
                            }
                        }
                        button {
                            class: "btn-play",
                            r#type: "button",
                            onclick: move |_| on_intent.call(ChatIntent::SpeakSentence(id)),
                            "🔊"
                        }
                    }
                    div { class: "info-box",
                        if card.korean_first() {
                            InfoRow { label: "Meaning", text: card.meaning.clone(), speakable: false, on_intent }
                        }
                        InfoRow { label: "Grammar", text: card.grammar.clone(), speakable: true, on_intent }
                        InfoRow { label: "Context", text: card.context.clone(), speakable: true, on_intent }
                    }
                    if card.show_tip {
                        p { class: "quest-guide",
                            "📣 "
                            b { "Tip:" }
                            " {QUEST_TIP}"
                        }
                    }
                    div { class: "audio-control-box",
                        audio {
                            id: "{card.clip_dom_id}",
                            class: "turn-clip au-player",
                            src: "{card.clip_src}",
                            controls: true,
                            onplay: move |_| on_intent.call(ChatIntent::ClipStarted(id)),
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn InfoRow(
    label: &'static str,
    text: String,
    speakable: bool,
    on_intent: EventHandler<ChatIntent>,
) -> Element {
    if text.trim().is_empty() {
        return rsx! {};
    }
    let spoken = text.clone();
    rsx! {
        div { class: "info-row",
            span { class: "label", "{label}" }
            p { class: "info-text", "{text}" }
            if speakable {
                button {
                    class: "btn-mini-play",
                    r#type: "button",
                    onclick: move |_| on_intent.call(ChatIntent::SpeakNote(spoken.clone())),
                    "🔊"
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct ConfettiPiece {
    left: f32,
    color: &'static str,
    delay: f32,
    duration: f32,
}

impl ConfettiPiece {
    fn style(&self) -> String {
        format!(
            "left: {:.1}%; background-color: {}; animation-delay: {:.2}s; animation-duration: {:.2}s;",
            self.left, self.color, self.delay, self.duration
        )
    }
}

fn confetti_pieces() -> Vec<ConfettiPiece> {
    let mut rng = rand::rng();
    (0..CONFETTI_PIECES)
        .map(|_| ConfettiPiece {
            left: rng.random_range(0.0..100.0),
            color: CONFETTI_COLORS[rng.random_range(0..CONFETTI_COLORS.len())],
            delay: rng.random_range(0.0..3.0),
            duration: rng.random_range(3.0..5.0),
        })
        .collect()
}

#[component]
fn Confetti() -> Element {
    let pieces = use_hook(confetti_pieces);
    rsx! {
        div { class: "confetti-container", aria_hidden: "true",
            for (index, piece) in pieces.iter().enumerate() {
                div { key: "{index}", class: "confetti-piece", style: piece.style() }
            }
        }
    }
}

#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct ChatTestHandles {
    dispatch: Rc<RefCell<Option<Callback<ChatIntent>>>>,
    session: Rc<RefCell<Option<Signal<VoiceSession>>>>,
}

#[cfg(test)]
impl ChatTestHandles {
    pub(crate) fn register(&self, dispatch: Callback<ChatIntent>, session: Signal<VoiceSession>) {
        *self.dispatch.borrow_mut() = Some(dispatch);
        *self.session.borrow_mut() = Some(session);
    }

    pub(crate) fn dispatch(&self) -> Callback<ChatIntent> {
        (*self.dispatch.borrow()).expect("chat dispatch registered")
    }

    pub(crate) fn session(&self) -> Signal<VoiceSession> {
        (*self.session.borrow()).expect("chat session registered")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confetti_uses_the_palette() {
        let pieces = confetti_pieces();
        assert_eq!(pieces.len(), CONFETTI_PIECES);
        for piece in &pieces {
            assert!(CONFETTI_COLORS.contains(&piece.color));
            assert!((0.0..100.0).contains(&piece.left));
            assert!((3.0..5.0).contains(&piece.duration));
        }
    }

    #[test]
    fn active_rate_is_marked() {
        assert_eq!(
            rate_class(PlaybackSpeed::Half, PlaybackSpeed::Half),
            "rate rate--active"
        );
        assert_eq!(rate_class(PlaybackSpeed::Half, PlaybackSpeed::Normal), "rate");
    }
}
