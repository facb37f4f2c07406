use dioxus::prelude::*;
use tracing::{debug, warn};

use super::canvas::{EditorMode, EditorState, Tool};
use super::inline_text::{BubbleToolbar, InlineText};
use super::markup;
use super::session::EditorSessions;
use super::styles_editor::StyleInput;
use crate::backend::PocketBase;
use crate::block::{Block, BlockKind, BlockPatch};
use crate::config::AppConfig;
use crate::error::CmsError;
use crate::persistence::{Flush, PatchBridge};

pub static EDITOR_STATE: GlobalSignal<EditorState> = Signal::global(EditorState::default);
pub static EDIT_SESSIONS: GlobalSignal<EditorSessions> = Signal::global(EditorSessions::default);
pub static SAVE_STATUS: GlobalSignal<SaveStatus> = Signal::global(SaveStatus::default);

const PALETTE: [BlockKind; 7] = [
    BlockKind::Text,
    BlockKind::InlineText,
    BlockKind::Heading,
    BlockKind::Paragraph,
    BlockKind::Image,
    BlockKind::Shape,
    BlockKind::Bookmark,
];

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed(String),
    /// Someone else wrote the page; reloading is the only way forward.
    Conflict,
}

/// Where the editor is mounted.
#[derive(Clone)]
pub enum EditorContext {
    /// Scratch canvas in the admin dashboard. Only inline texts are stored.
    Admin,
    /// A stored page opened with `?edit`.
    Page {
        slug: String,
        bridge: PatchBridge<PocketBase>,
    },
}

impl PartialEq for EditorContext {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EditorContext::Admin, EditorContext::Admin) => true,
            (
                EditorContext::Page { slug: a, bridge: x },
                EditorContext::Page { slug: b, bridge: y },
            ) => a == b && x.page_id() == y.page_id(),
            _ => false,
        }
    }
}

impl EditorContext {
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EditorContext::Admin => "element",
            EditorContext::Page { .. } => "block",
        }
    }

    /// Identity of the mount: switching to another page gives a new key, so
    /// the editor and its provided context are rebuilt.
    pub fn mount_key(&self) -> String {
        match self {
            EditorContext::Admin => "admin".to_string(),
            EditorContext::Page { bridge, .. } => format!("page-{}", bridge.page_id()),
        }
    }

    /// Queue `patch` for saving; a no-op on the admin scratch canvas.
    pub fn persist(&self, id: &str, patch: BlockPatch) {
        let EditorContext::Page { bridge, .. } = self else {
            return;
        };
        let pending = bridge.submit(id, patch);
        spawn(async move {
            match pending.await {
                Flush::Sent { .. } => *SAVE_STATUS.write() = SaveStatus::Saved,
                Flush::Failed(CmsError::Conflict { .. }) => {
                    *SAVE_STATUS.write() = SaveStatus::Conflict
                }
                Flush::Failed(e) => *SAVE_STATUS.write() = SaveStatus::Failed(e.to_string()),
                Flush::Superseded => {}
            }
        });
    }
}

#[component]
pub fn VisualEditor(context: EditorContext) -> Element {
    use_context_provider(|| context.clone());
    let state = EDITOR_STATE.read();
    let editor_bg = if state.mode == EditorMode::Editor { "var(--color-primary)" } else { "var(--color-secondary)" };
    let preview_bg = if state.mode == EditorMode::Preview { "var(--color-primary)" } else { "var(--color-secondary)" };
    let active_editor = EDIT_SESSIONS.read().active().map(str::to_string);

    rsx! {
        div {
            class: "visual-editor",
            style: "display: flex; flex-direction: column; height: 100vh; font-family: system-ui;",
            onmousedown: move |_| end_inline_sessions(),

            TopBar { context: context.clone() }
            SaveBanner {}

            div {
                style: "display: flex; flex: 1; min-height: 0;",

                div {
                    class: "toolbox",
                    h2 { style: "margin: 0 0 16px 0; font-size: 18px;", "Add Elements" }

                    div {
                        class: "mode-toggle",
                        style: "margin-bottom: 16px; display: flex; gap: 8px;",
                        button {
                            onclick: move |_| set_mode(EditorMode::Editor),
                            style: "background: {editor_bg};",
                            "Editor"
                        }
                        button {
                            onclick: move |_| set_mode(EditorMode::Preview),
                            style: "background: {preview_bg};",
                            "Preview"
                        }
                    }

                    if state.mode == EditorMode::Editor {
                        div {
                            class: "component-buttons",
                            style: "display: flex; flex-direction: column; gap: 8px;",
                            {PALETTE.iter().map(|kind| {
                                let name = kind.as_str();
                                let label = kind.label();
                                let kind = kind.clone();
                                rsx! {
                                    button {
                                        key: "{name}",
                                        onclick: move |_| add_element(kind.clone()),
                                        "{label}"
                                    }
                                }
                            })}
                        }

                        div { style: "margin-top: 24px;",
                            h3 { style: "margin: 0 0 8px 0; font-size: 14px;", "Instructions" }
                            p { style: "font-size: 12px; color: #666; line-height: 1.4;",
                                "Click elements to select"
                                br {}
                                "Drag elements to move"
                                br {}
                                "Click inline text to edit it in place"
                            }
                        }
                    }
                }

                div {
                    class: "canvas-wrapper",
                    style: "flex: 1; background: #f0f0f0; overflow: auto; position: relative;",

                    if state.mode == EditorMode::Editor {
                        Canvas {}
                    } else {
                        PreviewCanvas {}
                    }
                }

                if state.mode == EditorMode::Editor {
                    div {
                        class: "properties",
                        PropertiesPanel {}
                    }
                }
            }

            if let Some(id) = active_editor {
                BubbleToolbar { element_id: id }
            }
        }
    }
}

#[component]
fn TopBar(context: EditorContext) -> Element {
    let state = EDITOR_STATE.read();
    let zoom = state.zoom;
    let dirty = state.dirty;
    let current_tool = state.tool;
    let nav = navigator();
    let back_label = match &context {
        EditorContext::Admin => "Back to site",
        EditorContext::Page { .. } => "Back to page",
    };
    let back = {
        let context = context.clone();
        move |_: MouseEvent| match &context {
            EditorContext::Admin => {
                nav.push(crate::Route::PublicPage {
                    segments: Vec::new(),
                    query: Default::default(),
                });
            }
            EditorContext::Page { slug, .. } => {
                nav.push(crate::Route::PublicPage {
                    segments: slug.split('/').map(str::to_string).collect(),
                    query: Default::default(),
                });
            }
        }
    };
    let save_context = context.clone();

    rsx! {
        div {
            class: "top-bar",
            style: "height: 56px; border-bottom: 1px solid #ddd; display: flex; align-items: center; justify-content: space-between; padding: 0 16px;",

            button { onclick: back, "← {back_label}" }

            div { style: "display: flex; gap: 4px; align-items: center;",
                {Tool::ALL.into_iter().map(|tool| {
                    let label = tool.label();
                    let weight = if tool == current_tool { "bold" } else { "normal" };
                    rsx! {
                        button {
                            key: "{label}",
                            style: "font-weight: {weight};",
                            onclick: move |_| EDITOR_STATE.write().set_tool(tool),
                            "{label}"
                        }
                    }
                })}
                span { style: "width: 16px;" }
                button { onclick: move |_| EDITOR_STATE.write().toggle_grid(), "Grid" }
                button { onclick: move |_| EDITOR_STATE.write().zoom_out(), "−" }
                span { style: "width: 48px; text-align: center;", "{zoom}%" }
                button { onclick: move |_| EDITOR_STATE.write().zoom_in(), "+" }
            }

            if matches!(context, EditorContext::Page { .. }) {
                button {
                    disabled: !dirty,
                    onclick: move |_| save_structure(save_context.clone()),
                    "Save"
                }
            } else {
                span {}
            }
        }
    }
}

#[component]
fn SaveBanner() -> Element {
    let message = match &*SAVE_STATUS.read() {
        SaveStatus::Idle | SaveStatus::Saved => return rsx! {},
        SaveStatus::Saving => "Saving…".to_string(),
        SaveStatus::Failed(e) => format!("Saving failed: {e}"),
        SaveStatus::Conflict => {
            "This page was changed elsewhere. Reload it before editing further.".to_string()
        }
    };
    rsx! {
        div {
            class: "save-banner",
            style: "padding: 6px 16px; background: #fff3cd; color: #664d03; font-size: 13px;",
            "{message}"
        }
    }
}

#[component]
fn Canvas() -> Element {
    let state = EDITOR_STATE.read();
    let config = use_context::<AppConfig>();
    let context = use_context::<EditorContext>();
    let scale = state.scale();
    let width = config.canvas_width;
    let height = config.canvas_height;
    let grid = config.grid_size;
    let background = if state.show_grid {
        format!(
            "background-image: linear-gradient(#e5e5e5 1px, transparent 1px), \
             linear-gradient(90deg, #e5e5e5 1px, transparent 1px); \
             background-size: {grid}px {grid}px;"
        )
    } else {
        String::new()
    };
    let ids: Vec<(String, BlockKind)> = state
        .paint_order()
        .into_iter()
        .map(|e| (e.id.clone(), e.kind.clone()))
        .collect();
    let (viewport_w, viewport_h) = (width * scale, height * scale);

    rsx! {
        div {
            class: "canvas-viewport",
            style: "width: {viewport_w}px; height: {viewport_h}px; position: relative;",
            onmouseup: move |_| stop_dragging(),
            onmouseleave: move |_| stop_dragging(),
            onmousemove: move |e| handle_drag(&context, e.page_coordinates().x, e.page_coordinates().y),

            div {
                class: "canvas",
                style: "width: {width}px; height: {height}px; position: absolute; top: 0; left: 0; \
                        background-color: white; transform: scale({scale}); transform-origin: 0 0; {background}",
                // offsets on the scaled canvas are already in canvas units
                onclick: move |e| {
                    let point = e.element_coordinates();
                    EDITOR_STATE.write().canvas_click(point.x, point.y);
                },

                {ids.into_iter().map(|(id, kind)| {
                    if kind == BlockKind::InlineText {
                        rsx! { InlineText { key: "{id}", element_id: id.clone() } }
                    } else {
                        rsx! { ElementBox { key: "{id}", element_id: id.clone() } }
                    }
                })}
            }
        }
    }
}

#[component]
fn ElementBox(element_id: String) -> Element {
    let state = EDITOR_STATE.read();
    let Some(element) = state.get(&element_id) else {
        return rsx! {};
    };
    let is_selected = state.selected_id.as_deref() == Some(element_id.as_str());
    let frame = element.frame_style();
    let ring = if is_selected { "outline: 2px solid #2563eb;" } else { "" };
    let body = element_body(element);

    let press_id = element_id.clone();
    rsx! {
        div {
            class: "element-box",
            style: "{frame} {ring} cursor: grab; user-select: none;",
            onmousedown: move |e| {
                e.stop_propagation();
                press_element(&press_id, e.page_coordinates().x, e.page_coordinates().y);
            },
            onclick: move |e| e.stop_propagation(),
            {body}
        }
    }
}

/// Inner markup of a non-inline element.
fn element_body(element: &Block) -> Element {
    let style = element.content_style();
    let content = markup::sanitize(element.content.as_deref().unwrap_or_default());
    match &element.kind {
        BlockKind::Heading | BlockKind::Paragraph | BlockKind::Text => rsx! {
            div {
                style: "width: 100%; height: 100%; display: flex; align-items: center; padding: 8px; box-sizing: border-box; {style}",
                dangerous_inner_html: "{content}",
            }
        },
        BlockKind::Image => {
            let src = element.src.clone().unwrap_or_else(|| "/placeholder.svg".to_string());
            let alt = element.alt.clone().unwrap_or_default();
            let radius = element.border_radius.unwrap_or(0.0);
            rsx! {
                img {
                    src: "{src}",
                    alt: "{alt}",
                    draggable: "false",
                    style: "width: 100%; height: 100%; object-fit: cover; border-radius: {radius}px;",
                }
            }
        }
        BlockKind::Shape => rsx! {
            div { style: "width: 100%; height: 100%; {style}" }
        },
        BlockKind::Bookmark => {
            let label = markup::plain_text(&content);
            rsx! {
                div {
                    style: "width: 100%; height: 100%; display: flex; align-items: center; justify-content: center; border: 1px dashed #999; {style}",
                    "🔖 {label}"
                }
            }
        }
        BlockKind::InlineText | BlockKind::Other(_) => {
            let label = element.kind.label();
            rsx! {
                div {
                    style: "width: 100%; height: 100%; border: 1px dashed #ccc; font-size: 11px; color: #999;",
                    "{label}"
                }
            }
        }
    }
}

#[component]
fn PropertiesPanel() -> Element {
    let state = EDITOR_STATE.read();
    let context = use_context::<EditorContext>();

    let Some(element) = state.selected() else {
        return rsx! {
            div {
                style: "color: slate; text-align: center; padding: 32px;",
                "Select an element"
            }
        };
    };
    let selected_id = element.id.clone();
    let kind = element.kind.clone();
    let title = kind.label().to_string();
    let content = element.content.clone().unwrap_or_default();
    let src = element.src.clone().unwrap_or_default();

    let (content_ctx, src_ctx, front_ctx, back_ctx) =
        (context.clone(), context.clone(), context.clone(), context.clone());
    let (content_id, src_id, front_id, back_id, dup_id, del_id) = (
        selected_id.clone(),
        selected_id.clone(),
        selected_id.clone(),
        selected_id.clone(),
        selected_id.clone(),
        selected_id.clone(),
    );

    rsx! {
        div { class: "properties-panel",
            h1 { style: "color:slate;text-align:center; margin: 24px 0 12px 0; font-size: 18px;", "{title}" }

            if kind.is_textual() && kind != BlockKind::InlineText {
                div {
                    style: "display:flex;flex-direction:column;padding-inline:12px;",
                    label { "Content" }
                    input {
                        r#type: "text",
                        value: "{content}",
                        oninput: move |e| update_and_persist(&content_ctx, &content_id, BlockPatch {
                            content: Some(e.value()),
                            ..Default::default()
                        }),
                    }
                }
            }

            if kind == BlockKind::Image {
                div {
                    style: "display:flex;flex-direction:column;padding-inline:12px;",
                    label { "Image URL" }
                    input {
                        r#type: "text",
                        value: "{src}",
                        onchange: move |e| update_and_persist(&src_ctx, &src_id, BlockPatch {
                            src: Some(e.value()),
                            ..Default::default()
                        }),
                    }
                }
            }

            h1 { style: "color:slate;text-align:center; margin: 24px 0 12px 0; font-size: 18px;", "Styles" }

            StyleInput { key: "{selected_id}", element_id: selected_id.clone() }

            div { style: "margin-top: 24px; padding-inline: 12px; display: flex; flex-direction: column; gap: 8px;",
                div { style: "display: flex; gap: 8px;",
                    button {
                        onclick: move |_| {
                            let patch = EDITOR_STATE.write().bring_to_front(&front_id);
                            if let Some(patch) = patch {
                                front_ctx.persist(&front_id, patch);
                            }
                        },
                        "Bring to front"
                    }
                    button {
                        onclick: move |_| {
                            let patch = EDITOR_STATE.write().send_to_back(&back_id);
                            if let Some(patch) = patch {
                                back_ctx.persist(&back_id, patch);
                            }
                        },
                        "Send to back"
                    }
                }
                button {
                    onclick: move |_| {
                        EDITOR_STATE.write().duplicate_element(&dup_id);
                    },
                    "Duplicate"
                }
                button {
                    onclick: move |_| delete_element(&del_id),
                    style: "width: 100%; padding: 8px; cursor: pointer;
                            background: #f44336; color: white; border: none; border-radius: 4px;",
                    "Delete Element"
                }
            }
        }
    }
}

#[component]
fn PreviewCanvas() -> Element {
    let state = EDITOR_STATE.read();
    let config = use_context::<AppConfig>();
    let (width, height) = (config.canvas_width, config.canvas_height);

    let frames = state.paint_order().into_iter().map(|element| {
        let id = element.id.clone();
        let frame = element.frame_style();
        let body = if element.kind == BlockKind::InlineText {
            let style = element.content_style();
            let html = markup::sanitize(element.content.as_deref().unwrap_or_default());
            rsx! {
                div {
                    style: "width: 100%; height: 100%; padding: 8px; box-sizing: border-box; {style}",
                    dangerous_inner_html: "{html}",
                }
            }
        } else {
            element_body(element)
        };
        rsx! {
            div { key: "{id}", style: "{frame}", {body} }
        }
    });

    rsx! {
        div {
            style: "width: {width}px; height: {height}px; position: relative; background: white;",
            {frames}
        }
    }
}

/// Apply `patch` locally and hand it to the save queue.
pub(super) fn update_and_persist(context: &EditorContext, id: &str, patch: BlockPatch) {
    let applied = EDITOR_STATE.write().update_element(id, &patch);
    if applied {
        context.persist(id, patch);
    }
}

fn add_element(kind: BlockKind) {
    EDITOR_STATE.write().add_element(kind);
}

pub(super) fn press_element(id: &str, mouse_x: f64, mouse_y: f64) {
    if EDIT_SESSIONS.read().active().is_some_and(|active| active != id) {
        end_inline_sessions();
    }
    EDITOR_STATE.write().begin_drag(id, mouse_x, mouse_y);
}

fn handle_drag(context: &EditorContext, mouse_x: f64, mouse_y: f64) {
    if !EDITOR_STATE.read().is_dragging() {
        return;
    }
    let moved = EDITOR_STATE.write().drag_to(mouse_x, mouse_y);
    if let Some((id, patch)) = moved {
        context.persist(&id, patch);
    }
}

fn stop_dragging() {
    if let Some(id) = EDITOR_STATE.write().end_drag() {
        debug!(id = %id, "drag finished");
    }
}

fn delete_element(id: &str) {
    EDIT_SESSIONS.write().release(id);
    EDITOR_STATE.write().delete_element(id);
}

fn set_mode(mode: EditorMode) {
    end_inline_sessions();
    EDITOR_STATE.write().mode = mode;
}

pub(super) fn end_inline_sessions() {
    if EDIT_SESSIONS.read().active().is_some() {
        super::inline_text::cancel_active();
    }
}

fn save_structure(context: EditorContext) {
    let EditorContext::Page { bridge, .. } = context else {
        return;
    };
    let blocks = EDITOR_STATE.read().elements.clone();
    *SAVE_STATUS.write() = SaveStatus::Saving;
    spawn(async move {
        match bridge.save_structure(&blocks).await {
            Ok(page) => {
                debug!(page = %page.id, revision = page.revision, "structure saved");
                EDITOR_STATE.write().dirty = false;
                *SAVE_STATUS.write() = SaveStatus::Saved;
            }
            Err(CmsError::Conflict { .. }) => {
                *SAVE_STATUS.write() = SaveStatus::Conflict;
            }
            Err(e) => {
                warn!("saving page structure failed: {e}");
                *SAVE_STATUS.write() = SaveStatus::Failed(e.to_string());
            }
        }
    });
}

/// Fresh editor state for `context`, loaded with `structure`.
pub fn reset_editor(context: &EditorContext, structure: Vec<Block>) {
    let mut state = EditorState::new(context.id_prefix());
    state.load(structure);
    *EDITOR_STATE.write() = state;
    EDIT_SESSIONS.write().release_all();
    *SAVE_STATUS.write() = SaveStatus::Idle;
}
