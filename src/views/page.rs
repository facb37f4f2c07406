//! Public pages: stored blocks in reading order, or the canvas editor when
//! an admin opens the page with `?edit`.

use dioxus::prelude::*;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error};

use super::NotFound;
use crate::backend::{PageStore, PocketBase};
use crate::block::{Block, BlockKind, Page};
use crate::config::AppConfig;
use crate::error::CmsError;
use crate::persistence::PatchBridge;
use crate::visual_editor::markup;
use crate::visual_editor::{reset_editor, EditorContext, VisualEditor};
use crate::Route;

pub const HOME_SLUG: &str = "home";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageQuery {
    pub edit: bool,
}

impl PageQuery {
    /// `edit` counts as present with or without a value.
    pub fn parse(query: &str) -> Self {
        let edit = query
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split('=').next())
            .any(|key| key == "edit");
        Self { edit }
    }
}

impl FromQuery for PageQuery {
    fn from_query(query: &str) -> Self {
        Self::parse(query)
    }
}

impl fmt::Display for PageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.edit {
            write!(f, "edit")?;
        }
        Ok(())
    }
}

pub fn slug_for(segments: &[String]) -> String {
    let path: Vec<&str> = segments
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    if path.is_empty() {
        HOME_SLUG.to_string()
    } else {
        path.join("/")
    }
}

#[derive(Clone)]
enum Loaded {
    View(Page),
    Edit(EditorContext),
}

async fn load(pb: PocketBase, config: AppConfig, slug: String, edit: bool) -> Result<Loaded, CmsError> {
    let page = match pb.fetch_page_by_slug(&slug).await {
        Ok(page) => page,
        Err(e) => {
            if !e.is_not_found() {
                error!(slug = %slug, "loading page failed: {e}");
            }
            return Err(e);
        }
    };
    debug!(slug = %slug, page = %page.id, blocks = page.structure.len(), edit, "page loaded");
    if !edit {
        return Ok(Loaded::View(page));
    }
    let bridge = PatchBridge::new(Rc::new(pb), &page, config.save_quiet_period(), config.coalesce);
    let context = EditorContext::Page { slug, bridge };
    reset_editor(&context, page.structure);
    Ok(Loaded::Edit(context))
}

#[component]
pub fn PublicPage(segments: Vec<String>, query: PageQuery) -> Element {
    let pb = use_context::<PocketBase>();
    let config = use_context::<AppConfig>();
    let nav = navigator();
    let slug = slug_for(&segments);
    let wants_edit = query.edit;
    let admin = pb.auth_state().is_superuser();
    let may_edit = wants_edit && admin;

    use_effect(use_reactive!(|(wants_edit, may_edit)| {
        if wants_edit && !may_edit {
            nav.replace(Route::AdminLogin {});
        }
    }));

    let page = use_resource(use_reactive!(|(slug, may_edit)| {
        let pb = pb.clone();
        let config = config.clone();
        async move { load(pb, config, slug, may_edit).await }
    }));

    let result = page.read_unchecked();
    match &*result {
        None => rsx! {
            div { aria_busy: "true", style: "padding: 24px; font-family: system-ui;", "Loading…" }
        },
        Some(Err(CmsError::PageNotFound { slug })) => rsx! {
            NotFound { slug: slug.clone() }
        },
        Some(Err(e)) => rsx! {
            div { style: "padding: 24px; font-family: system-ui;", "Error: {e}" }
        },
        // keyed so that opening another page remounts the editor with a new context
        Some(Ok(Loaded::Edit(context))) => rsx! {
            {std::iter::once(context.clone()).map(|context| {
                let key = context.mount_key();
                rsx! { VisualEditor { key: "{key}", context } }
            })}
        },
        Some(Ok(Loaded::View(page))) => {
            let slug = page.slug.clone();
            rsx! {
                main {
                    class: "page",
                    style: "max-width: 960px; margin: 0 auto; padding: 24px; font-family: system-ui;",
                    {page.structure.iter().map(public_block)}
                    if admin {
                        div { style: "position: fixed; bottom: 16px; right: 16px;",
                            Link {
                                to: Route::PublicPage {
                                    segments: slug.split('/').map(str::to_string).collect(),
                                    query: PageQuery { edit: true },
                                },
                                "Edit page"
                            }
                        }
                    }
                }
            }
        }
    }
}

/// HTML tag for a heading block; levels outside 1..=6 fall back to `h1`.
pub fn heading_level(level: Option<u8>) -> u8 {
    match level {
        Some(n @ 1..=6) => n,
        _ => 1,
    }
}

fn public_block(block: &Block) -> Element {
    let id = block.id.clone();
    let html = markup::sanitize(block.content.as_deref().unwrap_or_default());
    match &block.kind {
        BlockKind::Heading => match heading_level(block.level) {
            1 => rsx! { h1 { key: "{id}", dangerous_inner_html: "{html}" } },
            2 => rsx! { h2 { key: "{id}", dangerous_inner_html: "{html}" } },
            3 => rsx! { h3 { key: "{id}", dangerous_inner_html: "{html}" } },
            4 => rsx! { h4 { key: "{id}", dangerous_inner_html: "{html}" } },
            5 => rsx! { h5 { key: "{id}", dangerous_inner_html: "{html}" } },
            _ => rsx! { h6 { key: "{id}", dangerous_inner_html: "{html}" } },
        },
        BlockKind::Paragraph | BlockKind::Text | BlockKind::InlineText => rsx! {
            div { key: "{id}", style: "margin-bottom: 24px;", dangerous_inner_html: "{html}" }
        },
        BlockKind::Image => {
            let src = block.src.clone().unwrap_or_default();
            let alt = block.alt.clone().unwrap_or_default();
            rsx! {
                div { key: "{id}", style: "margin-bottom: 24px;",
                    img {
                        src: "{src}",
                        alt: "{alt}",
                        loading: "lazy",
                        decoding: "async",
                        style: "width: 100%; height: auto;",
                    }
                }
            }
        }
        BlockKind::Shape | BlockKind::Bookmark | BlockKind::Other(_) => rsx! {},
    }
}
