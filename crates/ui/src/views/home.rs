use dioxus::prelude::*;
use dioxus_router::Link;

use crate::context::AppContext;
use crate::routes::Route;

#[component]
pub fn HomeView() -> Element {
    let ctx = use_context::<AppContext>();

    rsx! {
        div { class: "screen home-screen",
            h1 { class: "brand", "QUEST K" }
            p { class: "home-line", "Theme: {ctx.theme_id()}" }
            p { class: "home-line", "Learner: {ctx.username()}" }
            Link { class: "btn-start", to: Route::Chat {}, "Start talking" }
        }
    }
}
