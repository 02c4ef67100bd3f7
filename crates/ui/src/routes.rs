use dioxus::prelude::*;
use dioxus_router::{Outlet, Routable};

use crate::views::{ChatView, HomeView};

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
pub enum Route {
    #[layout(Layout)]
        #[route("/", HomeView)] Home {},
        #[route("/chat", ChatView)] Chat {},
}

#[component]
fn Layout() -> Element {
    rsx! {
        main { class: "app",
            Outlet::<Route> {}
        }
    }
}
