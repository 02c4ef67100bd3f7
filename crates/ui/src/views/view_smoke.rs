use dioxus::prelude::ReadableExt;
use chrono::Duration;
use quest_core::model::TurnId;
use quest_core::time::fixed_clock;
use services::{PlaybackSpeed, VoiceConfig, VoiceError};

use super::test_harness::{
    PlaybackEvent, ViewHarness, ViewKind, graded, quest, setup_view_harness,
    setup_view_harness_with,
};
use crate::vm::ChatIntent;

async fn hold_and_release(harness: &mut ViewHarness) {
    harness.send(ChatIntent::PressMic);
    harness.settle().await;
    harness.send(ChatIntent::ReleaseMic);
    harness.settle().await;
}

fn last_ai_turn(harness: &ViewHarness) -> TurnId {
    let session = harness.chat_handles.session();
    harness
        .dom
        .in_runtime(|| session.read().transcript().last_ai().map(|ai| ai.id))
        .expect("ai turn")
}

#[tokio::test(flavor = "current_thread")]
async fn home_view_smoke_renders_theme_and_learner() {
    let mut harness = setup_view_harness(ViewKind::Home, 2000);
    harness.rebuild();
    let html = harness.render();
    assert!(html.contains("QUEST K"), "missing brand in {html}");
    assert!(html.contains("Theme: cafe"), "missing theme in {html}");
    assert!(html.contains("Learner: mina"), "missing learner in {html}");
    assert!(html.contains("Start talking"), "missing chat link in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn chat_view_smoke_renders_controls() {
    let mut harness = setup_view_harness(ViewKind::Chat, 2000);
    harness.rebuild();
    let html = harness.render();
    assert!(html.contains("🎙️ Hold"), "missing mic button in {html}");
    assert!(html.contains("Give me a Quest"), "missing quest button in {html}");
    assert!(!html.contains("Analyzing..."), "idle screen shows loading in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn hold_to_talk_renders_exchange() {
    let mut harness = setup_view_harness(ViewKind::Chat, 2000);
    harness.api.queue_talk(Ok(graded("안녕하세요", 45)));
    harness.rebuild();

    harness.send(ChatIntent::PressMic);
    harness.settle().await;
    assert!(harness.render().contains("Listening..."));

    harness.send(ChatIntent::ReleaseMic);
    harness.settle().await;

    let html = harness.render();
    assert_eq!(harness.api.submitted(), 1);
    assert!(html.contains("user-bubble"), "missing user turn in {html}");
    assert!(html.contains("📡 Score"), "missing score badge in {html}");
    assert!(html.contains("45"), "missing score in {html}");
    assert!(html.contains("Tip:"), "missing tip in {html}");
    assert!(html.contains("data:audio/mpeg;base64,"), "missing clip in {html}");
    assert!(html.contains("🎙️ Hold"), "mic did not reset in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn short_recording_shows_notice_without_request() {
    let mut harness = setup_view_harness(ViewKind::Chat, 2000);
    harness.mic.set_utterance_bytes(300);
    harness.rebuild();

    harness.send(ChatIntent::PressMic);
    harness.settle().await;
    harness.send(ChatIntent::ReleaseMic);
    harness.settle().await;

    let html = harness.render();
    assert_eq!(harness.api.submitted(), 0);
    assert!(html.contains("Too short"), "missing notice in {html}");
    assert!(!html.contains("user-bubble"), "short clip reached transcript in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn quest_then_success_celebrates() {
    let mut harness = setup_view_harness(ViewKind::Chat, 2000);
    harness.api.queue_quest(Ok(quest("주세요")));
    harness.api.queue_talk(Ok(graded("주세요", 80)));
    harness.rebuild();

    harness.send(ChatIntent::RequestQuest);
    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("CHALLENGE"), "missing quest badge in {html}");
    assert!(html.contains("🔥 Quest: Please give me"), "missing quest meaning in {html}");
    assert!(html.contains("Target: 주세요"), "missing target in {html}");

    harness.send(ChatIntent::PressMic);
    harness.settle().await;
    harness.send(ChatIntent::ReleaseMic);
    harness.settle().await;

    let html = harness.render();
    assert!(html.contains("🎉 SUCCESS!"), "missing success badge in {html}");
    assert!(html.contains("confetti-container"), "missing confetti in {html}");
    assert!(!html.contains("Target:"), "quest still pending in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn failed_exchange_keeps_screen_usable() {
    let mut harness = setup_view_harness(ViewKind::Chat, 2000);
    harness.api.queue_talk(Err(VoiceError::server("STT failed")));
    harness.rebuild();

    hold_and_release(&mut harness).await;

    let html = harness.render();
    assert!(html.contains("STT failed"), "missing notice in {html}");
    assert!(html.contains("Dismiss"), "server notice should be dismissable in {html}");
    assert!(!html.contains("user-bubble"), "failed exchange reached transcript in {html}");

    harness.send(ChatIntent::DismissNotice);
    assert!(!harness.render().contains("STT failed"));
}

#[tokio::test(flavor = "current_thread")]
async fn rate_button_replays_clip_at_speed() {
    let mut harness = setup_view_harness(ViewKind::Chat, 2000);
    harness.api.queue_talk(Ok(graded("안녕하세요", 45)));
    harness.rebuild();
    hold_and_release(&mut harness).await;
    let ai_turn = last_ai_turn(&harness);
    harness.playback.take();

    harness.send(ChatIntent::PlayClip {
        turn: ai_turn,
        speed: PlaybackSpeed::Half,
    });
    harness.send(ChatIntent::SpeakSentence(ai_turn));

    assert_eq!(
        harness.playback.take(),
        vec![
            PlaybackEvent::Cancelled,
            PlaybackEvent::StoppedAll,
            PlaybackEvent::Played {
                turn: ai_turn,
                speed: PlaybackSpeed::Half,
            },
            PlaybackEvent::StoppedAll,
            PlaybackEvent::Cancelled,
            PlaybackEvent::Spoke {
                text: "안녕하세요".into(),
                rate: 0.5,
            },
        ]
    );
    assert!(harness.render().contains("rate rate--active"));
}

#[tokio::test(flavor = "current_thread")]
async fn clip_started_from_its_controls_silences_speech() {
    let mut harness = setup_view_harness(ViewKind::Chat, 2000);
    harness.api.queue_talk(Ok(graded("안녕하세요", 45)));
    harness.rebuild();
    hold_and_release(&mut harness).await;
    let ai_turn = last_ai_turn(&harness);

    harness.send(ChatIntent::SpeakSentence(ai_turn));
    harness.playback.take();
    harness.send(ChatIntent::ClipStarted(ai_turn));

    assert_eq!(
        harness.playback.take(),
        vec![
            PlaybackEvent::Cancelled,
            PlaybackEvent::StoppedOthers(ai_turn),
        ]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn celebration_clears_itself_after_its_duration() {
    let config = VoiceConfig::default().with_celebration(Duration::milliseconds(1_000));
    let mut harness = setup_view_harness_with(ViewKind::Chat, 2000, config, fixed_clock());
    harness.api.queue_quest(Ok(quest("주세요")));
    harness.api.queue_talk(Ok(graded("주세요", 80)));
    harness.rebuild();

    harness.send(ChatIntent::RequestQuest);
    harness.settle().await;
    hold_and_release(&mut harness).await;
    assert!(harness.render().contains("confetti-container"));

    harness.clock.advance(Duration::seconds(5));
    let session = harness.chat_handles.session();
    for _ in 0..60 {
        harness.drive_async().await;
        if harness.dom.in_runtime(|| session.read().celebration().is_none()) {
            break;
        }
    }

    assert!(harness.dom.in_runtime(|| session.read().celebration().is_none()));
    let html = harness.render();
    assert!(!html.contains("confetti-container"), "confetti still shown in {html}");
    assert!(html.contains("🎉 SUCCESS!"), "success card should stay in {html}");
}
