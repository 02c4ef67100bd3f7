use services::SpeechRequest;

pub(super) const CANCEL_SPEECH: &str = "window.speechSynthesis && window.speechSynthesis.cancel();";

/// Resolves with `[{ name, lang }]` once the platform has loaded its voices,
/// or whatever it has after a short wait.
pub(super) const LIST_VOICES: &str = r"
    const synth = window.speechSynthesis;
    if (!synth) return [];
    const read = () => synth.getVoices().map((v) => ({ name: v.name, lang: v.lang }));
    const now = read();
    if (now.length) return now;
    return await new Promise((resolve) => {
        synth.onvoiceschanged = () => resolve(read());
        setTimeout(() => resolve(read()), 1500);
    });
";

pub(super) const STOP_ALL_CLIPS: &str = r#"(function() {
    document.querySelectorAll("audio.turn-clip").forEach((a) => {
        a.pause();
        a.currentTime = 0;
    });
    const stray = window.__questClips || {};
    Object.values(stray).forEach((a) => {
        a.pause();
        a.currentTime = 0;
    });
})();"#;

pub(super) fn speak_script(request: &SpeechRequest) -> String {
    let text = &request.text;
    let lang = request.lang.tag();
    let rate = request.rate;
    let voice = request.voice.as_deref().unwrap_or_default();
    format!(
        r"(function() {{
            const synth = window.speechSynthesis;
            if (!synth) return;
            synth.cancel();
            const u = new SpeechSynthesisUtterance({text:?});
            u.lang = {lang:?};
            u.rate = {rate};
            const wanted = {voice:?};
            if (wanted) {{
                const match = synth.getVoices().find((v) => v.name === wanted);
                if (match) u.voice = match;
            }}
            synth.speak(u);
        }})();"
    )
}

/// Restart the clip element for a turn at `rate`. Falls back to a detached
/// `Audio` when the element is not mounted.
pub(super) fn play_clip_script(dom_id: &str, src: &str, rate: f32) -> String {
    format!(
        r"(function() {{
            const id = {dom_id:?};
            const pool = window.__questClips || (window.__questClips = {{}});
            let a = document.getElementById(id);
            if (!a) {{
                a = pool[id] || (pool[id] = new Audio({src:?}));
            }}
            a.pause();
            a.currentTime = 0;
            a.playbackRate = {rate};
            const p = a.play();
            if (p && p.catch) p.catch(() => {{}});
        }})();"
    )
}

/// Pause every clip except the element with `keep_id`.
pub(super) fn stop_other_clips_script(keep_id: &str) -> String {
    format!(
        r#"(function() {{
            const keep = {keep_id:?};
            const stop = (a) => {{
                if (a.id === keep) return;
                a.pause();
                a.currentTime = 0;
            }};
            document.querySelectorAll("audio.turn-clip").forEach(stop);
            Object.entries(window.__questClips || {{}}).forEach(([id, a]) => {{
                if (id !== keep) stop(a);
            }});
        }})();"#
    )
}

#[must_use]
pub fn scroll_to_end_script(anchor_id: &str) -> String {
    format!(
        r#"(function() {{
            const el = document.getElementById({anchor_id:?});
            if (el) el.scrollIntoView({{ behavior: "smooth" }});
        }})();"#
    )
}
