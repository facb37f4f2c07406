use dioxus::prelude::*;

use crate::Route;

#[component]
pub fn NotFound(slug: String) -> Element {
    rsx! {
        div {
            class: "not-found",
            style: "min-height: 100vh; display: flex; align-items: center; justify-content: center; font-family: system-ui;",
            div { style: "max-width: 420px; text-align: center;",
                div { style: "font-size: 32px; font-weight: bold; color: #dc2626;", "404" }
                h1 { style: "font-size: 22px;", "No such page" }
                p { style: "color: #475569;", "Nothing is published at \"{slug}\"." }
                Link { to: Route::PublicPage { segments: Vec::new(), query: Default::default() }, "Back to the home page" }
            }
        }
    }
}
