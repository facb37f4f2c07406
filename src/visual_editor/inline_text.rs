//! Text elements edited in place on the canvas.
//!
//! Clicking one puts it in editing mode; the floating toolbar saves or
//! cancels. Markup typed so far lives in [`ACTIVE_DRAFT`] until saved, so
//! cancelling or clicking elsewhere leaves the element as it was.

use dioxus::prelude::*;
use tracing::{debug, warn};

#[cfg(target_arch = "wasm32")]
use super::caret;
use super::component::{press_element, update_and_persist, EditorContext, EDITOR_STATE, EDIT_SESSIONS};
use super::markup;
use crate::backend::{PocketBase, TextStore};
use crate::block::BlockPatch;
use crate::config::AppConfig;

/// Markup of the element being edited, as last read from the DOM.
pub static ACTIVE_DRAFT: GlobalSignal<Option<String>> = Signal::global(|| None);

pub const PLACEHOLDER: &str = r#"<span style="color: #999;">Click to edit text</span>"#;

#[cfg(target_arch = "wasm32")]
type SelectionClosure = wasm_bindgen::closure::Closure<dyn FnMut(web_sys::Event)>;

pub fn region_id(element_id: &str) -> String {
    format!("inline-{element_id}")
}

/// What the editable region shows: the draft while editing, otherwise the
/// stored markup, or a placeholder when there is nothing to show.
pub fn display_markup(editing: bool, draft: Option<&str>, content: Option<&str>) -> String {
    if editing {
        if let Some(draft) = draft {
            return draft.to_string();
        }
    }
    match content.map(markup::sanitize) {
        Some(html) if !markup::plain_text(&html).trim().is_empty() => html,
        _ if editing => String::new(),
        _ => PLACEHOLDER.to_string(),
    }
}

#[component]
pub fn InlineText(element_id: String) -> Element {
    let pb = use_context::<PocketBase>();
    let config = use_context::<AppConfig>();
    let mut hovered = use_signal(|| false);

    let record_key = EDITOR_STATE.read().get(&element_id).and_then(|b| b.record_key.clone());
    let load_id = element_id.clone();
    let _stored = use_resource(use_reactive!(|(record_key)| {
        let pb = pb.clone();
        let id = load_id.clone();
        let lang = config.default_lang.clone();
        async move { load_stored_text(pb, id, record_key, lang).await }
    }));

    let state = EDITOR_STATE.read();
    let Some(element) = state.get(&element_id) else {
        return rsx! {};
    };
    let editing = EDIT_SESSIONS.read().is_editing(&element_id);
    let selected = state.selected_id.as_deref() == Some(element_id.as_str());
    let frame = element.frame_style();
    let style = element.content_style();
    let draft = ACTIVE_DRAFT.read().clone();
    let html = display_markup(editing, draft.as_deref(), element.content.as_deref());
    let region = region_id(&element_id);
    let border = if editing {
        "2px solid #2563eb"
    } else if hovered() || selected {
        "1px dashed #2563eb"
    } else {
        "1px dashed transparent"
    };
    let badge = if editing { "Editing" } else { "Text" };

    let press_id = element_id.clone();
    let edit_id = element_id.clone();
    let input_region = region.clone();

    rsx! {
        div {
            class: "inline-text",
            style: "{frame} border: {border}; box-sizing: border-box;",
            onmouseenter: move |_| hovered.set(true),
            onmouseleave: move |_| hovered.set(false),
            onmousedown: move |e| {
                e.stop_propagation();
                if !EDIT_SESSIONS.read().is_editing(&press_id) {
                    press_element(&press_id, e.page_coordinates().x, e.page_coordinates().y);
                }
            },
            onclick: move |e| e.stop_propagation(),

            if hovered() || editing {
                span {
                    style: "position: absolute; top: -18px; left: 0; font-size: 10px; \
                            background: #2563eb; color: white; padding: 1px 4px; border-radius: 2px;",
                    "{badge}"
                }
            }

            div {
                id: "{region}",
                contenteditable: "{editing}",
                style: "width: 100%; height: 100%; padding: 8px; box-sizing: border-box; outline: none; \
                        cursor: text; overflow: hidden; {style}",
                dangerous_inner_html: "{html}",
                onclick: move |e| {
                    e.stop_propagation();
                    begin_edit(&edit_id);
                },
                oninput: move |_| capture_input(&input_region),
            }
        }
    }
}

#[component]
pub fn BubbleToolbar(element_id: String) -> Element {
    let context = use_context::<EditorContext>();
    let pb = use_context::<PocketBase>();
    let config = use_context::<AppConfig>();
    let anchor = use_signal(initial_anchor);

    #[cfg(target_arch = "wasm32")]
    {
        let mut listener: Signal<Option<SelectionClosure>> = use_signal(|| None);

        use_effect(move || {
            use wasm_bindgen::JsCast;
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let mut anchor = anchor;
            let closure = SelectionClosure::new(move |_: web_sys::Event| {
                if let Some(position) = caret::dom::toolbar_position() {
                    anchor.set(Some(position));
                }
            });
            let _ = document
                .add_event_listener_with_callback("selectionchange", closure.as_ref().unchecked_ref());
            listener.set(Some(closure));
        });

        use_drop(move || {
            use wasm_bindgen::JsCast;
            if let Some(closure) = listener.peek().as_ref() {
                if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                    let _ = document.remove_event_listener_with_callback(
                        "selectionchange",
                        closure.as_ref().unchecked_ref(),
                    );
                }
            }
        });
    }

    let Some((top, left)) = anchor() else {
        return rsx! {};
    };
    let save_id = element_id.clone();

    rsx! {
        div {
            class: "bubble-toolbar",
            style: "position: absolute; top: {top}px; left: {left}px; z-index: 1000; display: flex; gap: 4px; \
                    background: white; border: 1px solid #ddd; border-radius: 4px; padding: 4px; \
                    box-shadow: 0 2px 6px rgba(0,0,0,0.15);",
            // keep the selection in the editable region
            onmousedown: move |e| {
                e.stop_propagation();
                e.prevent_default();
            },
            button {
                onclick: move |_| save_active(&save_id, &context, &pb, &config),
                "💾 Save"
            }
            button {
                onclick: move |_| cancel_active(),
                "❌ Cancel"
            }
        }
    }
}

fn initial_anchor() -> Option<(f64, f64)> {
    #[cfg(target_arch = "wasm32")]
    {
        caret::dom::toolbar_position()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        None
    }
}

fn begin_edit(id: &str) {
    if EDIT_SESSIONS.read().is_editing(id) {
        return;
    }
    if let Some(previous) = EDIT_SESSIONS.write().request_edit(id) {
        debug!(previous = %previous, id = %id, "inline editor handed over");
    }
    *ACTIVE_DRAFT.write() = None;
    EDITOR_STATE.write().select(id);
}

/// Take the region's markup as the draft and put the caret back where it
/// was once the re-render has replaced the region's children.
#[cfg(target_arch = "wasm32")]
fn capture_input(region_id: &str) {
    let Some(region) = caret::dom::element(region_id) else {
        return;
    };
    let position = caret::dom::save(&region);
    *ACTIVE_DRAFT.write() = Some(region.inner_html());
    let Some(position) = position else {
        return;
    };
    let region_id = region_id.to_string();
    spawn(async move {
        crate::clock::sleep(std::time::Duration::ZERO).await;
        let restored = caret::dom::element(&region_id).and_then(|r| caret::dom::restore(&r, position));
        if restored.is_none() {
            debug!(region = %region_id, position, "caret could not be restored");
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn capture_input(_region_id: &str) {}

#[cfg(target_arch = "wasm32")]
fn dom_markup(id: &str) -> Option<String> {
    caret::dom::inner_html(&region_id(id))
}

#[cfg(not(target_arch = "wasm32"))]
fn dom_markup(_id: &str) -> Option<String> {
    None
}

fn current_markup(id: &str) -> String {
    dom_markup(id)
        .or_else(|| ACTIVE_DRAFT.read().clone())
        .or_else(|| EDITOR_STATE.read().get(id).and_then(|b| b.content.clone()))
        .unwrap_or_default()
}

/// Commit the cleaned markup of `id` and leave editing mode. Elements with a
/// record key also get their text stored for the configured language.
fn save_active(id: &str, context: &EditorContext, pb: &PocketBase, config: &AppConfig) {
    if !EDIT_SESSIONS.read().is_editing(id) {
        return;
    }
    let content = markup::cleanup(&current_markup(id));
    update_and_persist(
        context,
        id,
        BlockPatch {
            content: Some(content.clone()),
            ..Default::default()
        },
    );

    let record_key = EDITOR_STATE.read().get(id).and_then(|b| b.record_key.clone());
    if let Some(key) = record_key {
        let pb = pb.clone();
        let lang = config.default_lang.clone();
        spawn(async move {
            match pb.save_text(&key, &lang, &content).await {
                Ok(record) => debug!(key = %key, record = %record.id, "text saved"),
                Err(e) => warn!(key = %key, "saving text failed: {e}"),
            }
        });
    }

    EDIT_SESSIONS.write().release(id);
    *ACTIVE_DRAFT.write() = None;
}

/// Leave editing mode without committing anything.
pub fn cancel_active() {
    if let Some(id) = EDIT_SESSIONS.write().release_all() {
        debug!(id = %id, "inline edit cancelled");
    }
    *ACTIVE_DRAFT.write() = None;
}

async fn load_stored_text(pb: PocketBase, id: String, key: Option<String>, lang: String) {
    let Some(key) = key else {
        return;
    };
    match pb.load_text(&key, &lang).await {
        Ok(Some(content)) => {
            if EDIT_SESSIONS.peek().is_editing(&id) {
                return;
            }
            let patch = BlockPatch {
                content: Some(content),
                ..Default::default()
            };
            EDITOR_STATE.write().update_element(&id, &patch);
        }
        Ok(None) => {}
        Err(e) => warn!(key = %key, lang = %lang, "loading text failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_is_shown_only_while_editing() {
        assert_eq!(display_markup(true, Some("<b>new</b>"), Some("old")), "<b>new</b>");
        assert_eq!(display_markup(false, Some("<b>new</b>"), Some("old")), "old");
    }

    #[test]
    fn empty_content_shows_the_placeholder_until_edited() {
        assert_eq!(display_markup(false, None, None), PLACEHOLDER);
        assert_eq!(display_markup(false, None, Some("<p> </p>")), PLACEHOLDER);
        assert_eq!(display_markup(true, None, None), "");
    }

    #[test]
    fn stored_markup_is_sanitized() {
        assert_eq!(
            display_markup(false, None, Some("<p onclick=\"x()\">hi</p>")),
            "<p>hi</p>"
        );
    }

    #[test]
    fn region_ids_are_derived_from_the_element() {
        assert_eq!(region_id("block-1"), "inline-block-1");
    }
}
