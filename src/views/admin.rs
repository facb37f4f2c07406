use dioxus::prelude::*;
use tracing::info;

use crate::backend::PocketBase;
use crate::visual_editor::{reset_editor, EditorContext, VisualEditor};
use crate::Route;

/// Editor dashboard. Only superusers get past the guard.
#[component]
pub fn Admin() -> Element {
    let pb = use_context::<PocketBase>();
    let nav = navigator();
    let allowed = pb.auth_state().is_superuser();

    use_effect(move || {
        if allowed {
            reset_editor(&EditorContext::Admin, Vec::new());
        } else {
            nav.replace(Route::AdminLogin {});
        }
    });

    if !allowed {
        return rsx! {
            p { style: "padding: 24px; font-family: system-ui;", "Redirecting to sign in…" }
        };
    }

    let email = pb
        .auth_state()
        .record
        .map(|r| r.email)
        .unwrap_or_default();
    let sign_out = move |_: MouseEvent| {
        pb.sign_out();
        info!("signed out");
        nav.replace(Route::AdminLogin {});
    };

    rsx! {
        div {
            div {
                class: "admin-header",
                style: "display: flex; justify-content: flex-end; gap: 12px; align-items: center; padding: 4px 16px; font-size: 12px; font-family: system-ui;",
                span { "{email}" }
                button { onclick: sign_out, "Sign out" }
            }
            VisualEditor { context: EditorContext::Admin }
        }
    }
}
