use tracing::{info, Level};
use dioxus::prelude::*;

mod backend;
mod block;
mod clock;
mod config;
mod error;
mod persistence;
mod views;
mod visual_editor;

use backend::PocketBase;
use config::AppConfig;
use views::{Admin, AdminLogin, PageQuery, PublicPage};

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
pub enum Route {
    #[route("/admin")]
    Admin {},
    #[route("/admin/login")]
    AdminLogin {},
    #[route("/:..segments?:..query")]
    PublicPage { segments: Vec<String>, query: PageQuery },
}

fn main() {
    if let Err(e) = dioxus::logger::init(Level::INFO) {
        eprintln!("logger already initialised: {e}");
    }
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    let config = use_context_provider(AppConfig::from_build_env);
    use_context_provider(|| {
        info!(backend = %config.backend_url, lang = %config.default_lang, "starting");
        PocketBase::new(config.backend_url.clone())
    });

    rsx! {
        Router::<Route> {}
    }
}
