use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use dioxus_router::{Routable, Router};
use quest_core::model::{
    Assessment, AudioBlob, Encoding, RenderedClip, Score, ThemeId, TurnId, Username,
};
use quest_core::time::fixed_clock;
use services::{
    AppServices, AssessmentApi, AssessmentResult, CaptureBackend, CaptureError, CaptureStream,
    ClipPlayer, Clock, PlaybackController, PlaybackSpeed, QuestIssue, SessionContext,
    SpeechRequest, SpeechSynthesizer, VoiceConfig, VoiceError, VoiceInfo, VoiceLoopService,
};

use crate::context::{AppContext, UiApp};
use crate::views::{ChatTestHandles, ChatView, HomeView};

#[derive(Default)]
pub struct ScriptedApi {
    talk: Mutex<VecDeque<Result<AssessmentResult, VoiceError>>>,
    quests: Mutex<VecDeque<Result<QuestIssue, VoiceError>>>,
    submitted: Mutex<usize>,
}

impl ScriptedApi {
    pub fn queue_talk(&self, result: Result<AssessmentResult, VoiceError>) {
        self.talk.lock().unwrap().push_back(result);
    }

    pub fn queue_quest(&self, result: Result<QuestIssue, VoiceError>) {
        self.quests.lock().unwrap().push_back(result);
    }

    pub fn submitted(&self) -> usize {
        *self.submitted.lock().unwrap()
    }
}

#[async_trait]
impl AssessmentApi for ScriptedApi {
    async fn submit(
        &self,
        _blob: &AudioBlob,
        _context: &SessionContext,
    ) -> Result<AssessmentResult, VoiceError> {
        *self.submitted.lock().unwrap() += 1;
        self.talk
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(VoiceError::server("no scripted response")))
    }

    async fn issue_quest(&self, _context: &SessionContext) -> Result<QuestIssue, VoiceError> {
        self.quests
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(VoiceError::server("no scripted quest")))
    }
}

struct OneShotStream {
    bytes: Vec<u8>,
}

#[async_trait]
impl CaptureStream for OneShotStream {
    fn take_fragments(&mut self) -> Vec<Vec<u8>> {
        Vec::new()
    }

    async fn finish(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
        Ok(vec![std::mem::take(&mut self.bytes)])
    }

    fn release(&mut self) {}
}

pub struct TestMic {
    utterance_bytes: Mutex<usize>,
}

impl TestMic {
    pub fn set_utterance_bytes(&self, bytes: usize) {
        *self.utterance_bytes.lock().unwrap() = bytes;
    }
}

#[async_trait]
impl CaptureBackend for TestMic {
    fn name(&self) -> &str {
        "test-mic"
    }

    fn supports(&self, encoding: Encoding) -> bool {
        encoding == Encoding::Wav
    }

    async fn open(&self, _encoding: Encoding) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let bytes = *self.utterance_bytes.lock().unwrap();
        Ok(Box::new(OneShotStream {
            bytes: vec![7; bytes],
        }))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    Cancelled,
    Spoke { text: String, rate: f32 },
    Played { turn: TurnId, speed: PlaybackSpeed },
    StoppedOthers(TurnId),
    StoppedAll,
}

#[derive(Default)]
pub struct PlaybackLog {
    events: Mutex<Vec<PlaybackEvent>>,
}

impl PlaybackLog {
    fn push(&self, event: PlaybackEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Events since the last call.
    pub fn take(&self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl SpeechSynthesizer for PlaybackLog {
    fn voices(&self) -> Vec<VoiceInfo> {
        Vec::new()
    }

    fn cancel(&self) {
        self.push(PlaybackEvent::Cancelled);
    }

    fn speak(&self, request: &SpeechRequest) {
        self.push(PlaybackEvent::Spoke {
            text: request.text.clone(),
            rate: request.rate,
        });
    }
}

impl ClipPlayer for PlaybackLog {
    fn play(&self, turn: TurnId, _clip: &RenderedClip, speed: PlaybackSpeed) {
        self.push(PlaybackEvent::Played { turn, speed });
    }

    fn stop_others(&self, turn: TurnId) {
        self.push(PlaybackEvent::StoppedOthers(turn));
    }

    fn stop_all(&self) {
        self.push(PlaybackEvent::StoppedAll);
    }
}

#[derive(Clone)]
struct TestApp {
    services: AppServices,
}

impl UiApp for TestApp {
    fn theme_id(&self) -> ThemeId {
        self.services.theme_id().clone()
    }

    fn username(&self) -> Username {
        self.services.username().clone()
    }

    fn voice_loop(&self) -> Arc<VoiceLoopService> {
        self.services.voice_loop()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Home,
    Chat,
}

#[derive(Props, Clone)]
struct ViewHarnessProps {
    app: Arc<TestApp>,
    playback: Arc<PlaybackLog>,
    view: ViewKind,
    chat_handles: ChatTestHandles,
}

impl PartialEq for ViewHarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for ViewHarnessProps {}

#[component]
fn ViewRouterHarness(props: ViewHarnessProps) -> Element {
    let app: Arc<dyn UiApp> = props.app.clone();
    let playback = PlaybackController::new(props.playback.clone(), props.playback.clone());
    use_context_provider(|| AppContext::with_playback(&app, playback));
    use_context_provider(|| props.view);
    use_context_provider(|| props.chat_handles.clone());
    rsx! { Router::<TestRoute> {} }
}

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum TestRoute {
    #[route("/")]
    Root {},
}

#[component]
fn Root() -> Element {
    let view = use_context::<ViewKind>();
    match view {
        ViewKind::Home => rsx! { HomeView {} },
        ViewKind::Chat => rsx! { ChatView {} },
    }
}

pub struct ViewHarness {
    pub dom: VirtualDom,
    pub api: Arc<ScriptedApi>,
    pub mic: Arc<TestMic>,
    pub playback: Arc<PlaybackLog>,
    pub clock: Clock,
    pub chat_handles: ChatTestHandles,
}

impl ViewHarness {
    pub fn rebuild(&mut self) {
        self.dom.rebuild_in_place();
        drive_dom(&mut self.dom);
    }

    pub async fn drive_async(&mut self) {
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            self.dom.wait_for_work(),
        )
        .await;
        self.dom.render_immediate(&mut NoOpMutations);
        self.dom.process_events();
    }

    /// Drive until spawned capture and network tasks have run.
    pub async fn settle(&mut self) {
        for _ in 0..6 {
            self.drive_async().await;
        }
    }

    pub fn send(&mut self, intent: crate::vm::ChatIntent) {
        let dispatch = self.chat_handles.dispatch();
        self.dom.in_runtime(|| dispatch.call(intent));
        drive_dom(&mut self.dom);
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }
}

pub fn drive_dom(dom: &mut VirtualDom) {
    dom.process_events();
    dom.render_immediate(&mut NoOpMutations);
    dom.process_events();
}

pub fn setup_view_harness(view: ViewKind, utterance_bytes: usize) -> ViewHarness {
    setup_view_harness_with(view, utterance_bytes, VoiceConfig::default(), fixed_clock())
}

pub fn setup_view_harness_with(
    view: ViewKind,
    utterance_bytes: usize,
    config: VoiceConfig,
    clock: Clock,
) -> ViewHarness {
    let api = Arc::new(ScriptedApi::default());
    let mic = Arc::new(TestMic {
        utterance_bytes: Mutex::new(utterance_bytes),
    });
    let playback = Arc::new(PlaybackLog::default());
    let services = AppServices::with_api(
        config,
        mic.clone(),
        api.clone(),
        clock.clone(),
        ThemeId::new("cafe").unwrap(),
        Username::new("mina").unwrap(),
    );
    let chat_handles = ChatTestHandles::default();

    let dom = VirtualDom::new_with_props(
        ViewRouterHarness,
        ViewHarnessProps {
            app: Arc::new(TestApp { services }),
            playback: Arc::clone(&playback),
            view,
            chat_handles: chat_handles.clone(),
        },
    );

    ViewHarness {
        dom,
        api,
        mic,
        playback,
        clock,
        chat_handles,
    }
}

pub fn graded(korean: &str, score: u8) -> AssessmentResult {
    AssessmentResult {
        user_text: "안녕하세요".into(),
        assessment: Assessment {
            korean: korean.into(),
            romanized: "annyeonghaseyo".into(),
            english_meaning: "Hello".into(),
            grammar_note: "-세요 is a polite ending".into(),
            context_note: "Greeting a barista".into(),
            score: Score::new(score).unwrap(),
            content_match: true,
        },
        clip: RenderedClip::mp3(vec![0xFF_u8; 16]),
    }
}

pub fn quest(target: &str) -> QuestIssue {
    QuestIssue {
        assessment: Assessment {
            korean: target.into(),
            romanized: "juseyo".into(),
            english_meaning: "Please give me".into(),
            grammar_note: String::new(),
            context_note: String::new(),
            score: Score::new(0).unwrap(),
            content_match: false,
        },
        clip: RenderedClip::mp3(vec![0xAB_u8; 8]),
    }
}
